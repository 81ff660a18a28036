//! Transport that replays a script instead of talking to the network.

use async_trait::async_trait;
use concierge_client::{NoResponse, RawResponse, RequestDescriptor, Transport, TransportOutcome};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted reaction.
#[derive(Debug, Clone)]
pub enum Step {
    /// Return this outcome
    Reply(TransportOutcome),
    /// Panic inside the transport
    Panic(&'static str),
}

impl Step {
    /// Response with `status` and `body`.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Step::Reply(Ok(RawResponse::new(status, body)))
    }

    /// Response carrying a `Retry-After` hint.
    pub fn retry_after(status: u16, after: Duration) -> Self {
        Step::Reply(Ok(RawResponse::new(status, "").with_retry_after(after)))
    }

    /// No response at all.
    pub fn no_response() -> Self {
        Step::Reply(Err(NoResponse::network("connection reset")))
    }
}

/// Transport mock.
///
/// Replays `script` in order, then repeats `fallback` forever. Tracks calls,
/// requested endpoints and the peak number of concurrent sends.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    endpoints: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Always reply with `status` and `body`.
    pub fn always(status: u16, body: impl Into<String>) -> Self {
        Self::sequence(Vec::new(), Step::status(status, body))
    }

    /// Replay `steps`, then `fallback`.
    pub fn sequence(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    /// Take `latency` to answer every request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Endpoints requested, in order.
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> TransportOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints
            .lock()
            .unwrap()
            .push(request.endpoint().clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match step {
            Step::Reply(outcome) => outcome,
            Step::Panic(message) => panic!("{}", message),
        }
    }
}
