use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("info_requests_total").absolute(0);
    counter!("info_rate_limited_total").absolute(0);
    counter!("addresses_processed_total").absolute(0);
    counter!("addresses_failed_total").absolute(0);
    counter!("positions_skipped_total").absolute(0);
    counter!("direction_corrections_total").absolute(0);
    counter!("cycles_total").absolute(0);
    counter!("cycles_failed_total").absolute(0);

    gauge!("tracked_addresses").set(0.0);
    gauge!("normalized_positions").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("cycle_duration_seconds").record(0.0);

    Ok(handle)
}
