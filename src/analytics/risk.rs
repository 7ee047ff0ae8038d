use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::config::AppConfig;
use crate::models::{AggregatedBucket, Direction, Position, PriceMap, RiskBand, RiskReport, RiskRow};

/// Percentage gap between the current price and the liquidation price.
/// `None` without a known liquidation price, a usable current price, or a
/// representable result.
pub fn distance_to_liquidation_pct(position: &Position, current_price: Decimal) -> Option<Decimal> {
    let liq = position.liquidation_price?;
    if current_price <= Decimal::ZERO {
        return None;
    }
    let gap = if position.is_long {
        current_price.checked_sub(liq)?
    } else {
        liq.checked_sub(current_price)?
    };
    gap.abs()
        .checked_div(current_price)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

/// Risk rows for every tracked position with a known liquidation price and
/// a priced coin, nearest to liquidation first.
pub fn risk_rows(positions: &[Position], prices: &PriceMap, tracked_coins: &[String]) -> Vec<RiskRow> {
    let mut rows: Vec<RiskRow> = positions
        .iter()
        .filter(|p| tracked_coins.iter().any(|c| *c == p.coin))
        .filter_map(|p| {
            let current_price = *prices.get(&p.coin)?;
            let distance = distance_to_liquidation_pct(p, current_price)?;
            Some(RiskRow {
                position: p.clone(),
                current_price,
                distance_to_liquidation_pct: distance,
                spot_usdc: None,
            })
        })
        .collect();

    rows.sort_by(compare_risk);
    rows
}

fn compare_risk(a: &RiskRow, b: &RiskRow) -> Ordering {
    a.distance_to_liquidation_pct
        .cmp(&b.distance_to_liquidation_pct)
        .then_with(|| b.position.position_value.cmp(&a.position.position_value))
        .then_with(|| a.position.address.cmp(&b.position.address))
        .then_with(|| a.position.coin.cmp(&b.position.coin))
}

/// Top-N positions closest to liquidation on each side, with cumulative
/// distance bands and the largest positions flagged for attention.
pub fn rank_by_liquidation_distance(
    positions: &[Position],
    prices: &PriceMap,
    config: &AppConfig,
) -> RiskReport {
    let rows = risk_rows(positions, prices, &config.tracked_coins);
    let (all_longs, all_shorts): (Vec<RiskRow>, Vec<RiskRow>) =
        rows.into_iter().partition(|r| r.position.is_long);

    let highlight = |rows: &[RiskRow]| -> Vec<RiskRow> {
        rows.iter()
            .filter(|r| r.position.position_value > config.highlight_min_value)
            .take(config.highlight_per_side)
            .cloned()
            .collect()
    };
    let highlighted_longs = highlight(&all_longs);
    let highlighted_shorts = highlight(&all_shorts);

    let longs: Vec<RiskRow> = all_longs.into_iter().take(config.top_n).collect();
    let shorts: Vec<RiskRow> = all_shorts.into_iter().take(config.top_n).collect();

    RiskReport {
        long_bands: liquidation_bands(&longs, config.risk_band_width_pct),
        short_bands: liquidation_bands(&shorts, config.risk_band_width_pct),
        longs,
        shorts,
        highlighted_longs,
        highlighted_shorts,
    }
}

/// Cumulative notional within `0-w%`, `0-2w%`, ... of liquidation. Only
/// bands that gain at least one row are emitted, so a far-out position adds
/// one band rather than every empty step before it. `rows` must be sorted by
/// distance.
pub fn liquidation_bands(rows: &[RiskRow], width_pct: Decimal) -> Vec<RiskBand> {
    if width_pct <= Decimal::ZERO {
        return Vec::new();
    }

    let mut bands: Vec<RiskBand> = Vec::new();
    let mut count = 0;
    let mut cumulative = Decimal::ZERO;

    for row in rows {
        let Some(upper) = band_upper(row.distance_to_liquidation_pct, width_pct) else {
            break;
        };
        count += 1;
        cumulative = cumulative.saturating_add(row.position.position_value);

        match bands.last_mut() {
            Some(last) if last.upper_pct == upper => {
                last.position_count = count;
                last.cumulative_value = cumulative;
            }
            _ => bands.push(RiskBand {
                upper_pct: upper,
                position_count: count,
                cumulative_value: cumulative,
            }),
        }
    }

    bands
}

/// Smallest multiple of `width_pct` (at least one) covering `distance_pct`.
fn band_upper(distance_pct: Decimal, width_pct: Decimal) -> Option<Decimal> {
    let steps = distance_pct.checked_div(width_pct)?.ceil().max(Decimal::ONE);
    steps.checked_mul(width_pct)
}

/// Largest positions by notional on each side, `n` per side.
pub fn top_by_value(positions: &[Position], n: usize) -> (Vec<Position>, Vec<Position>) {
    let mut sorted: Vec<&Position> = positions.iter().collect();
    sorted.sort_by(|a, b| {
        b.position_value
            .cmp(&a.position_value)
            .then_with(|| a.address.cmp(&b.address))
            .then_with(|| a.coin.cmp(&b.coin))
    });

    let longs = sorted.iter().filter(|p| p.is_long).take(n).map(|p| (*p).clone()).collect();
    let shorts = sorted.iter().filter(|p| !p.is_long).take(n).map(|p| (*p).clone()).collect();
    (longs, shorts)
}

/// Partition positions by (coin, direction) and total each group. Buckets
/// are ordered by total value, largest first.
pub fn aggregate_buckets(positions: &[Position]) -> Vec<AggregatedBucket> {
    let mut groups: BTreeMap<(&str, Direction), Vec<&Position>> = BTreeMap::new();
    for p in positions {
        groups.entry((p.coin.as_str(), p.direction())).or_default().push(p);
    }

    let mut buckets: Vec<AggregatedBucket> = groups
        .into_iter()
        .map(|((coin, direction), members)| {
            let count = Decimal::from(members.len() as u64);
            let total_value: Decimal = members.iter().map(|p| p.position_value).sum();
            let total_pnl: Decimal = members.iter().map(|p| p.unrealized_pnl).sum();
            let avg_leverage = members.iter().map(|p| p.leverage).sum::<Decimal>() / count;

            let known_liq: Vec<Decimal> = members.iter().filter_map(|p| p.liquidation_price).collect();
            let avg_liquidation_price = if known_liq.is_empty() {
                None
            } else {
                Some(known_liq.iter().copied().sum::<Decimal>() / Decimal::from(known_liq.len() as u64))
            };

            let trader_count = members
                .iter()
                .map(|p| p.address.as_str())
                .collect::<BTreeSet<_>>()
                .len();

            AggregatedBucket {
                coin: coin.to_string(),
                direction,
                total_value,
                total_pnl,
                position_count: members.len(),
                trader_count,
                avg_leverage,
                avg_liquidation_price,
                avg_value_per_trader: total_value / Decimal::from(trader_count as u64),
            }
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.coin.cmp(&b.coin))
            .then_with(|| a.direction.cmp(&b.direction))
    });
    buckets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
