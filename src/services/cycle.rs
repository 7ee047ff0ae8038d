use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::sleep;

use crate::analytics::{aggregate_buckets, coin_impacts, rank_by_liquidation_distance, sweep_thresholds, top_by_value};
use crate::config::AppConfig;
use crate::hyperliquid::{InfoClient, PriceSource};
use crate::ingestion::fetcher::short_address;
use crate::ingestion::{
    fetch_all, load_addresses, normalize_payload, reconcile_directions, FetchSettings, NormalizeStats,
};
use crate::models::{AggregatedBucket, FundingRate, ImpactSummary, Position, PriceMap, RiskReport, ThresholdRow};

/// Most recent completed cycle, shared with the HTTP layer.
pub type LatestReport = Arc<RwLock<Option<Arc<CycleReport>>>>;

/// Everything derived from one polling cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub addresses_total: usize,
    pub addresses_failed: Vec<String>,
    pub normalize: NormalizeStats,
    pub direction_corrections: usize,
    pub prices: PriceMap,
    /// Funding for tracked coins, empty when the price source has none.
    pub funding: Vec<FundingRate>,
    pub positions: Vec<Position>,
    #[serde(flatten)]
    pub analysis: SnapshotAnalysis,
}

impl CycleReport {
    /// No positions survived; outputs are empty but the cycle succeeded.
    pub fn is_noop(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Read-only views over one frozen position snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAnalysis {
    pub buckets: Vec<AggregatedBucket>,
    pub top_longs: Vec<Position>,
    pub top_shorts: Vec<Position>,
    pub risk: RiskReport,
    pub cascade: Vec<ThresholdRow>,
    pub impact: ImpactSummary,
}

/// Derive grouping, rankings and the threshold sweep. Pure: the same
/// snapshot and prices always produce the same analysis.
pub fn analyze_snapshot(positions: &[Position], prices: &PriceMap, config: &AppConfig) -> SnapshotAnalysis {
    let (top_longs, top_shorts) = top_by_value(positions, config.top_n);

    SnapshotAnalysis {
        buckets: aggregate_buckets(positions),
        top_longs,
        top_shorts,
        risk: rank_by_liquidation_distance(positions, prices, config),
        cascade: sweep_thresholds(positions, prices, &config.threshold_sweep, &config.tracked_coins),
        impact: coin_impacts(
            positions,
            prices,
            config.impact_threshold_pct,
            &config.tracked_coins,
            config.impact_significance_floor,
        ),
    }
}

/// Fetch, normalize and analyze positions for `addresses`.
///
/// Per-address, per-position and per-coin failures are absorbed; this
/// never fails. An empty address list yields an empty report.
pub async fn run_cycle<P>(
    client: &InfoClient,
    price_source: &P,
    addresses: &[String],
    config: &AppConfig,
) -> CycleReport
where
    P: PriceSource,
{
    let started_at = Utc::now();

    let outcomes = fetch_all(client, addresses, &FetchSettings::from(config)).await;

    let observed_at = Utc::now();
    let mut stats = NormalizeStats::default();
    let mut positions = Vec::new();
    let mut addresses_failed = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(state) => positions.extend(normalize_payload(
                &state,
                &outcome.address,
                config.min_position_value,
                observed_at,
                &mut stats,
            )),
            Err(_) => addresses_failed.push(outcome.address),
        }
    }
    addresses_failed.sort();

    metrics::counter!("positions_skipped_total").increment((stats.below_min + stats.malformed) as u64);

    let direction_corrections = reconcile_directions(&mut positions);

    if let Some(coin) = &config.coin_filter {
        positions.retain(|p| p.coin == *coin);
        tracing::info!(coin = %coin, remaining = positions.len(), "Applied coin filter");
    }

    // Stable order so reports compare equal regardless of completion order.
    positions.sort_by(|a, b| {
        a.address
            .cmp(&b.address)
            .then_with(|| a.coin.cmp(&b.coin))
    });

    metrics::gauge!("normalized_positions").set(positions.len() as f64);

    let (prices, funding) = if positions.is_empty() {
        (PriceMap::new(), Vec::new())
    } else {
        let wanted: Vec<String> = positions
            .iter()
            .map(|p| p.coin.as_str())
            .filter(|c| config.is_tracked(c))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        (
            price_source.current_prices(&wanted).await,
            price_source.funding_rates(&config.tracked_coins).await,
        )
    };

    let mut analysis = analyze_snapshot(&positions, &prices, config);
    let settings = FetchSettings::from(config);
    attach_spot_balances(client, &mut analysis.risk, config.highlight_per_side, &settings).await;

    let report = CycleReport {
        started_at,
        finished_at: Utc::now(),
        addresses_total: addresses.len(),
        addresses_failed,
        normalize: stats,
        direction_corrections,
        prices,
        funding,
        positions,
        analysis,
    };

    if report.is_noop() {
        tracing::info!(addresses = addresses.len(), "Cycle produced no positions");
    } else {
        tracing::info!(
            addresses = report.addresses_total,
            failed = report.addresses_failed.len(),
            positions = report.positions.len(),
            buckets = report.analysis.buckets.len(),
            corrections = report.direction_corrections,
            "Cycle complete"
        );
    }

    report
}

/// Look up spot USDC for the owners of the nearest `per_side` rows on each
/// side and of every highlighted row, and attach it to all of their rows.
/// A failed lookup leaves the balance unset. Returns the number of
/// addresses resolved.
pub async fn attach_spot_balances(
    client: &InfoClient,
    risk: &mut RiskReport,
    per_side: usize,
    settings: &FetchSettings,
) -> usize {
    let addresses: BTreeSet<String> = risk
        .longs
        .iter()
        .take(per_side)
        .chain(risk.shorts.iter().take(per_side))
        .chain(&risk.highlighted_longs)
        .chain(&risk.highlighted_shorts)
        .map(|r| r.position.address.clone())
        .collect();

    let mut balances: HashMap<String, Decimal> = HashMap::new();
    for address in addresses {
        if !settings.inter_request_delay.is_zero() {
            sleep(settings.inter_request_delay).await;
        }
        match settings.retry.run(|_| client.spot_usdc_balance(&address)).await {
            Ok(balance) => {
                balances.insert(address, balance);
            }
            Err(e) => tracing::warn!(
                address = %short_address(&address),
                error = %e,
                "Failed to fetch spot balance"
            ),
        }
    }

    for row in risk
        .longs
        .iter_mut()
        .chain(risk.shorts.iter_mut())
        .chain(risk.highlighted_longs.iter_mut())
        .chain(risk.highlighted_shorts.iter_mut())
    {
        row.spot_usdc = balances.get(&row.position.address).copied();
    }

    balances.len()
}

/// Load the address list from disk and run one cycle. Only an unreadable
/// address list fails the cycle.
pub async fn run_cycle_from_file<P>(
    client: &InfoClient,
    price_source: &P,
    config: &AppConfig,
) -> anyhow::Result<CycleReport>
where
    P: PriceSource,
{
    let addresses = load_addresses(&config.addresses_file).await?;
    metrics::gauge!("tracked_addresses").set(addresses.len() as f64);
    Ok(run_cycle(client, price_source, &addresses, config).await)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
