//! Test utilities for the booking client.
//!
//! Provides a scripted transport and helpers for building clients on top of it.

#![allow(dead_code)]

pub mod scripted_transport;

pub use scripted_transport::{ScriptedTransport, Step};

use concierge_client::{BookingClient, ClientConfig, UpstreamConfig};
use serde_json::{Value, json};
use std::sync::Arc;

/// Company id used by every test client.
pub const COMPANY_ID: u64 = 42;

/// Default configuration pointed at the test company.
pub fn test_config() -> ClientConfig {
    ClientConfig::default().with_upstream(
        UpstreamConfig::default()
            .with_partner_token("partner")
            .with_company_id(COMPANY_ID),
    )
}

/// Client backed by `transport` with the default test configuration.
pub fn client_with(transport: &Arc<ScriptedTransport>) -> BookingClient {
    BookingClient::with_transport(test_config(), transport.clone())
        .expect("test configuration is valid")
}

/// Client backed by `transport` with a custom configuration.
pub fn client_with_config(config: ClientConfig, transport: &Arc<ScriptedTransport>) -> BookingClient {
    BookingClient::with_transport(config, transport.clone()).expect("test configuration is valid")
}

/// Upstream success envelope around `data`.
pub fn envelope(data: Value) -> String {
    json!({"success": true, "data": data, "meta": []}).to_string()
}
