use std::sync::Arc;
use std::time::Instant;

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::AppConfig;
use crate::hyperliquid::{InfoClient, PriceSource};

use super::cycle::{run_cycle_from_file, LatestReport};

/// Run one cycle per `poll_interval_secs`, publishing each completed report.
///
/// Cycles never overlap: the next tick waits until the current cycle,
/// including any rate-limit backoff, has finished. A failed cycle keeps the
/// previous report and is retried on the next tick.
pub async fn run_position_poller<P>(
    client: InfoClient,
    price_source: P,
    config: Arc<AppConfig>,
    latest: LatestReport,
) where
    P: PriceSource,
{
    let mut ticker = interval(Duration::from_secs(config.poll_interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = config.poll_interval_secs,
        profile = %config.profile,
        min_position_value = %config.min_position_value,
        "Position poller started"
    );

    loop {
        ticker.tick().await;

        let started = Instant::now();
        match run_cycle_from_file(&client, &price_source, &config).await {
            Ok(report) => {
                metrics::counter!("cycles_total").increment(1);
                *latest.write().await = Some(Arc::new(report));
            }
            Err(e) => {
                metrics::counter!("cycles_failed_total").increment(1);
                tracing::error!(error = %e, "Position cycle failed");
            }
        }

        metrics::histogram!("cycle_duration_seconds").record(started.elapsed().as_secs_f64());
    }
}
