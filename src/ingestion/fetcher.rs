use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::hyperliquid::{ClearinghouseState, InfoClient, InfoClientError};

use super::retry::RetryPolicy;

/// Knobs for one fetch batch.
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    /// Upper bound on requests in flight.
    pub max_workers: usize,
    /// Pause before each address's first request.
    pub inter_request_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_workers: 10,
            inter_request_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
        }
    }
}

impl From<&AppConfig> for FetchSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            inter_request_delay: config.inter_request_delay,
            retry: RetryPolicy::new(config.max_retries, config.backoff_base),
        }
    }
}

/// Result of fetching a single address.
#[derive(Debug)]
pub struct FetchOutcome {
    pub address: String,
    pub result: Result<ClearinghouseState, InfoClientError>,
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Fetch the clearinghouse state of every address with at most
/// `max_workers` requests in flight.
///
/// Each address is an independent unit: rate limits are retried with
/// backoff, any other failure is logged and recorded in its outcome. The
/// batch always runs to completion. Outcomes arrive in completion order,
/// one per input address.
pub async fn fetch_all(
    client: &InfoClient,
    addresses: &[String],
    settings: &FetchSettings,
) -> Vec<FetchOutcome> {
    let total = addresses.len();
    if total == 0 {
        tracing::info!("No addresses to fetch");
        return Vec::new();
    }

    let workers = settings.max_workers.max(1);
    tracing::info!(total, workers, "Fetching positions");

    let mut in_flight = stream::iter(addresses.iter().cloned())
        .map(|address| fetch_one(client, address, settings))
        .buffer_unordered(workers);

    let mut outcomes = Vec::with_capacity(total);
    let mut processed = 0usize;

    while let Some(outcome) = in_flight.next().await {
        processed += 1;
        metrics::counter!("addresses_processed_total").increment(1);
        tracing::debug!(processed, total, address = %outcome.address, "Address processed");
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    tracing::info!(total, failed, "Fetch batch complete");

    outcomes
}

async fn fetch_one(client: &InfoClient, address: String, settings: &FetchSettings) -> FetchOutcome {
    if !settings.inter_request_delay.is_zero() {
        sleep(settings.inter_request_delay).await;
    }

    let result = settings
        .retry
        .run(|_attempt| client.clearinghouse_state(&address))
        .await;

    if let Err(e) = &result {
        metrics::counter!("addresses_failed_total").increment(1);
        match e {
            InfoClientError::RateLimited => tracing::warn!(
                address = %short_address(&address),
                attempts = settings.retry.max_attempts,
                "Rate limit retries exhausted, no data this cycle"
            ),
            _ => tracing::warn!(
                address = %short_address(&address),
                error = %e,
                "Failed to fetch positions"
            ),
        }
    }

    FetchOutcome { address, result }
}

/// `0x1234...abcd` for log lines.
pub fn short_address(address: &str) -> String {
    if address.len() > 10 && address.is_ascii() {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}
