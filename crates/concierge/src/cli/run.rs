//! Command handlers.

use crate::cli::Commands;
use concierge_client::models::BookingQuery;
use concierge_client::{ApiResponse, BookingClient, ClientConfig, MetricsCollector};
use concierge_error::{ConciergeResult, JsonError};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Load configuration from `path`, or from the layered defaults when absent.
pub fn load_config(path: Option<&Path>) -> ConciergeResult<ClientConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration file");
            ClientConfig::from_file(path)
        }
        None => ClientConfig::load(),
    }
}

/// Run one subcommand and print its result as JSON.
///
/// Returns whether the upstream call succeeded.
pub async fn run_command(client: &BookingClient, command: Commands) -> ConciergeResult<bool> {
    match command {
        Commands::Company => print_response(&client.company().await),
        Commands::Services => print_response(&client.services().await),
        Commands::Staff { service } => print_response(&client.staff(service).await),
        Commands::Dates { staff, service } => {
            print_response(&client.available_dates(staff, service).await)
        }
        Commands::Slots {
            staff,
            date,
            service,
        } => print_response(&client.available_times(staff, &date, service).await),
        Commands::Bookings {
            start,
            end,
            staff,
            page,
        } => {
            let mut query = BookingQuery::default();
            if let Some(start) = start {
                query = query.with_start_date(start);
            }
            if let Some(end) = end {
                query = query.with_end_date(end);
            }
            if let Some(staff) = staff {
                query = query.with_staff_id(staff);
            }
            if let Some(page) = page {
                query = query.with_page(page);
            }
            print_response(&client.list_bookings(&query).await)
        }
        Commands::Clients { phone, name } => print_response(
            &client
                .search_clients(phone.as_deref(), name.as_deref())
                .await,
        ),
        Commands::Stats { probes } => run_stats(client, probes).await,
    }
}

async fn run_stats(client: &BookingClient, probes: u32) -> ConciergeResult<bool> {
    let mut all_ok = true;
    for _ in 0..probes {
        all_ok &= *client.company().await.success();
    }

    let stats = client.metrics().snapshot();
    let alarms = MetricsCollector::evaluate(&stats, client.metrics().config());
    for alarm in &alarms {
        warn!(%alarm, "Health threshold crossed");
    }

    print_json(&stats)?;
    Ok(all_ok && alarms.is_empty())
}

fn print_response<T: Serialize>(response: &ApiResponse<T>) -> ConciergeResult<bool> {
    print_json(response)?;
    Ok(*response.success())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> ConciergeResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| JsonError::new(format!("Failed to render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
