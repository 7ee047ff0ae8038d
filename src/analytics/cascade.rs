use rust_decimal::Decimal;

use crate::models::{CascadeDirection, CoinImpact, ImpactSummary, Position, PriceMap, ThresholdRow};

/// Imbalance below this many percent is labelled `Neutral`.
const NEUTRAL_BAND_PCT: i64 = 5;

/// Price band for a move of `threshold_pct` around `price`: `(down, up)`.
/// `None` when the band does not fit in a `Decimal`.
pub fn price_band(price: Decimal, threshold_pct: Decimal) -> Option<(Decimal, Decimal)> {
    let move_frac = threshold_pct.checked_div(Decimal::ONE_HUNDRED)?;
    let down = price.checked_mul(Decimal::ONE.checked_sub(move_frac)?)?;
    let up = price.checked_mul(Decimal::ONE.checked_add(move_frac)?)?;
    Some((down, up))
}

/// Notional that would be liquidated by a move of `threshold_pct` from
/// `price`: longs liquidating in `[down, price]`, shorts in `[price, up]`.
/// Positions must all belong to the coin `price` refers to.
///
/// `None` if the band or either total overflows.
pub fn exposure_at<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    price: Decimal,
    threshold_pct: Decimal,
) -> Option<(Decimal, Decimal)> {
    let (down, up) = price_band(price, threshold_pct)?;
    let mut long_value = Decimal::ZERO;
    let mut short_value = Decimal::ZERO;

    for p in positions {
        let Some(liq) = p.liquidation_price else {
            continue;
        };
        if p.is_long {
            if liq >= down && liq <= price {
                long_value = long_value.checked_add(p.position_value)?;
            }
        } else if liq >= price && liq <= up {
            short_value = short_value.checked_add(p.position_value)?;
        }
    }

    Some((long_value, short_value))
}

/// `(long - short) / total * 100`, zero when nothing is exposed.
pub fn imbalance_pct(long_value: Decimal, short_value: Decimal) -> Decimal {
    let total = long_value.saturating_add(short_value);
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (long_value - short_value) / total * Decimal::ONE_HUNDRED
}

/// Label for an imbalance; `None` when the total exposure is zero.
pub fn classify_imbalance(total_value: Decimal, imbalance_pct: Decimal) -> Option<CascadeDirection> {
    if total_value <= Decimal::ZERO {
        None
    } else if imbalance_pct.abs() < Decimal::from(NEUTRAL_BAND_PCT) {
        Some(CascadeDirection::Neutral)
    } else if imbalance_pct > Decimal::ZERO {
        Some(CascadeDirection::Short)
    } else {
        Some(CascadeDirection::Long)
    }
}

/// Tracked coins that have a price, paired with their positions.
fn priced_coins<'a>(
    positions: &'a [Position],
    prices: &PriceMap,
    tracked_coins: &'a [String],
) -> Vec<(&'a str, Decimal, Vec<&'a Position>)> {
    tracked_coins
        .iter()
        .filter_map(|coin| {
            let Some(price) = prices.get(coin).copied() else {
                tracing::debug!(coin = %coin, "No current price, skipping coin");
                return None;
            };
            let members: Vec<&Position> = positions.iter().filter(|p| p.coin == *coin).collect();
            Some((coin.as_str(), price, members))
        })
        .collect()
}

/// One row per threshold, each computed independently from the snapshot.
/// A threshold whose exposure cannot be represented is left out.
pub fn sweep_thresholds(
    positions: &[Position],
    prices: &PriceMap,
    thresholds: &[Decimal],
    tracked_coins: &[String],
) -> Vec<ThresholdRow> {
    let coins = priced_coins(positions, prices, tracked_coins);

    thresholds
        .iter()
        .filter_map(|&threshold_pct| {
            let exposure = coins.iter().try_fold(
                (Decimal::ZERO, Decimal::ZERO),
                |(long_acc, short_acc), (_, price, members)| {
                    let (l, s) = exposure_at(members.iter().copied(), *price, threshold_pct)?;
                    Some((long_acc.checked_add(l)?, short_acc.checked_add(s)?))
                },
            );
            let Some((long_value, short_value)) = exposure else {
                tracing::warn!(threshold_pct = %threshold_pct, "Liquidation exposure overflows, skipping threshold");
                return None;
            };

            let total = long_value.checked_add(short_value)?;
            let imbalance = imbalance_pct(long_value, short_value);

            Some(ThresholdRow {
                threshold_pct,
                long_liquidation_value: long_value,
                short_liquidation_value: short_value,
                total_liquidation_value: total,
                imbalance_pct: imbalance,
                direction: classify_imbalance(total, imbalance),
            })
        })
        .collect()
}

/// Per-coin exposure at a single threshold plus an overall market call.
///
/// A coin gets a direction only when either side reaches
/// `significance_floor`: `Short` if long exposure is larger, else `Long`.
/// The market direction applies the same rule to the totals and is `None`
/// when nothing is exposed.
pub fn coin_impacts(
    positions: &[Position],
    prices: &PriceMap,
    threshold_pct: Decimal,
    tracked_coins: &[String],
    significance_floor: Decimal,
) -> ImpactSummary {
    let mut coins: Vec<CoinImpact> = priced_coins(positions, prices, tracked_coins)
        .into_iter()
        .filter(|(_, _, members)| !members.is_empty())
        .filter_map(|(coin, price, members)| {
            let Some(((price_down, price_up), (long_value, short_value))) =
                price_band(price, threshold_pct).zip(exposure_at(members, price, threshold_pct))
            else {
                tracing::warn!(coin = %coin, "Impact band overflows, skipping coin");
                return None;
            };
            let significant = long_value >= significance_floor || short_value >= significance_floor;

            Some(CoinImpact {
                coin: coin.to_string(),
                current_price: price,
                price_down,
                price_up,
                long_liquidation_value: long_value,
                short_liquidation_value: short_value,
                direction: significant.then(|| lean(long_value, short_value)),
            })
        })
        .collect();

    coins.sort_by(|a, b| {
        let gap_a = (a.long_liquidation_value - a.short_liquidation_value).abs();
        let gap_b = (b.long_liquidation_value - b.short_liquidation_value).abs();
        gap_b.cmp(&gap_a).then_with(|| a.coin.cmp(&b.coin))
    });

    let total_long = coins
        .iter()
        .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.long_liquidation_value));
    let total_short = coins
        .iter()
        .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.short_liquidation_value));
    let market_direction = if total_long.saturating_add(total_short) > Decimal::ZERO {
        Some(lean(total_long, total_short))
    } else {
        None
    };

    ImpactSummary {
        threshold_pct,
        coins,
        total_long_liquidation_value: total_long,
        total_short_liquidation_value: total_short,
        market_direction,
    }
}

fn lean(long_value: Decimal, short_value: Decimal) -> CascadeDirection {
    if long_value > short_value {
        CascadeDirection::Short
    } else {
        CascadeDirection::Long
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::Utc;

    fn make_position(coin: &str, is_long: bool, value: i64, liq: Option<i64>) -> Position {
        Position {
            address: format!("0x{coin}{value}"),
            coin: coin.into(),
            entry_price: Decimal::from(100_000),
            position_value: Decimal::from(value),
            unrealized_pnl: Decimal::ZERO,
            liquidation_price: liq.map(Decimal::from),
            leverage: Decimal::from(20),
            is_long,
            observed_at: Utc::now(),
        }
    }

    fn prices() -> PriceMap {
        PriceMap::from([
            ("BTC".to_string(), Decimal::from(100_000)),
            ("ETH".to_string(), Decimal::from(4_000)),
        ])
    }

    fn coins(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_three_pct_band_for_longs() {
        let positions = vec![
            make_position("BTC", true, 10_000, Some(98_000)),
            make_position("BTC", true, 20_000, Some(95_000)),
        ];

        let rows = sweep_thresholds(&positions, &prices(), &[Decimal::from(3)], &coins(&["BTC"]));

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].long_liquidation_value, Decimal::from(10_000));
        assert_eq!(rows[0].short_liquidation_value, Decimal::ZERO);
        assert_eq!(rows[0].imbalance_pct, Decimal::ONE_HUNDRED);
        assert_eq!(rows[0].direction, Some(CascadeDirection::Short));
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let positions = vec![
            make_position("BTC", true, 1_000, Some(97_000)),
            make_position("BTC", true, 2_000, Some(100_000)),
            make_position("BTC", false, 4_000, Some(100_000)),
            make_position("BTC", false, 8_000, Some(103_000)),
        ];

        let (long_value, short_value) = exposure_at(&positions, Decimal::from(100_000), Decimal::from(3)).unwrap();

        assert_eq!(long_value, Decimal::from(3_000));
        assert_eq!(short_value, Decimal::from(12_000));
    }

    #[test]
    fn test_wrong_side_of_price_is_ignored() {
        let positions = vec![
            make_position("BTC", true, 1_000, Some(101_000)),
            make_position("BTC", false, 1_000, Some(99_000)),
        ];

        let (long_value, short_value) = exposure_at(&positions, Decimal::from(100_000), Decimal::from(10)).unwrap();

        assert_eq!(long_value, Decimal::ZERO);
        assert_eq!(short_value, Decimal::ZERO);
    }

    #[test]
    fn test_directions() {
        assert_eq!(classify_imbalance(Decimal::ZERO, Decimal::ZERO), None);
        assert_eq!(
            classify_imbalance(Decimal::from(100), Decimal::new(49, 1)),
            Some(CascadeDirection::Neutral)
        );
        assert_eq!(
            classify_imbalance(Decimal::from(100), Decimal::from(5)),
            Some(CascadeDirection::Short)
        );
        assert_eq!(
            classify_imbalance(Decimal::from(100), Decimal::from(-40)),
            Some(CascadeDirection::Long)
        );
    }

    #[test]
    fn test_imbalance_math() {
        assert_eq!(imbalance_pct(Decimal::from(300), Decimal::from(100)), Decimal::from(50));
        assert_eq!(imbalance_pct(Decimal::from(100), Decimal::from(300)), Decimal::from(-50));
        assert_eq!(imbalance_pct(Decimal::ZERO, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_sweep_is_monotonic() {
        let positions = vec![
            make_position("BTC", true, 10_000, Some(99_800)),
            make_position("BTC", true, 20_000, Some(98_000)),
            make_position("BTC", false, 15_000, Some(101_200)),
            make_position("BTC", false, 40_000, Some(106_000)),
            make_position("BTC", true, 70_000, Some(91_000)),
            make_position("ETH", false, 25_000, Some(4_150)),
            make_position("ETH", true, 5_000, None),
        ];
        let config = AppConfig::default();

        let rows = sweep_thresholds(&positions, &prices(), &config.threshold_sweep, &coins(&["BTC", "ETH"]));

        assert_eq!(rows.len(), config.threshold_sweep.len());
        for pair in rows.windows(2) {
            assert!(pair[0].total_liquidation_value <= pair[1].total_liquidation_value);
            assert!(pair[0].long_liquidation_value <= pair[1].long_liquidation_value);
            assert!(pair[0].short_liquidation_value <= pair[1].short_liquidation_value);
        }
        let last = rows.last().unwrap();
        assert_eq!(last.long_liquidation_value, Decimal::from(100_000));
        assert_eq!(last.short_liquidation_value, Decimal::from(80_000));
    }

    #[test]
    fn test_missing_price_contributes_nothing() {
        let positions = vec![
            make_position("BTC", true, 10_000, Some(99_000)),
            make_position("SOL", true, 99_000, Some(99)),
        ];

        let rows = sweep_thresholds(&positions, &prices(), &[Decimal::from(5)], &coins(&["BTC", "SOL"]));

        assert_eq!(rows[0].total_liquidation_value, Decimal::from(10_000));
    }

    #[test]
    fn test_empty_snapshot_rows_have_no_direction() {
        let rows = sweep_thresholds(&[], &prices(), &[Decimal::ONE, Decimal::TWO], &coins(&["BTC"]));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.direction.is_none() && r.imbalance_pct.is_zero()));
    }

    #[test]
    fn test_recompute_is_identical() {
        let positions = vec![
            make_position("BTC", true, 12_345, Some(99_123)),
            make_position("BTC", false, 67_890, Some(100_777)),
        ];
        let thresholds = AppConfig::default().threshold_sweep;

        let first = sweep_thresholds(&positions, &prices(), &thresholds, &coins(&["BTC"]));
        let second = sweep_thresholds(&positions, &prices(), &thresholds, &coins(&["BTC"]));

        assert_eq!(first, second);
    }

    #[test]
    fn test_coin_impacts_floor_and_order() {
        let positions = vec![
            make_position("BTC", true, 50_000, Some(98_000)),
            make_position("BTC", false, 10_000, Some(101_000)),
            make_position("ETH", false, 5_000, Some(4_050)),
        ];

        let summary = coin_impacts(
            &positions,
            &prices(),
            Decimal::from(3),
            &coins(&["BTC", "ETH"]),
            Decimal::from(10_000),
        );

        assert_eq!(summary.coins.len(), 2);
        assert_eq!(summary.coins[0].coin, "BTC");
        assert_eq!(summary.coins[0].direction, Some(CascadeDirection::Short));
        assert_eq!(summary.coins[0].price_down, Decimal::from(97_000));
        assert_eq!(summary.coins[1].coin, "ETH");
        assert_eq!(summary.coins[1].direction, None);
        assert_eq!(summary.total_long_liquidation_value, Decimal::from(50_000));
        assert_eq!(summary.total_short_liquidation_value, Decimal::from(15_000));
        assert_eq!(summary.market_direction, Some(CascadeDirection::Short));
    }

    #[test]
    fn test_unrepresentable_band_is_skipped() {
        let huge = PriceMap::from([("BTC".to_string(), Decimal::MAX)]);
        let positions = vec![make_position("BTC", true, 10_000, Some(99_000))];

        assert_eq!(price_band(Decimal::MAX, Decimal::from(50)), None);
        assert_eq!(exposure_at(&positions, Decimal::MAX, Decimal::ONE), None);

        let rows = sweep_thresholds(&positions, &huge, &[Decimal::ONE, Decimal::TWO], &coins(&["BTC"]));
        assert!(rows.is_empty());

        let summary = coin_impacts(&positions, &huge, Decimal::from(3), &coins(&["BTC"]), Decimal::ZERO);
        assert!(summary.coins.is_empty());
        assert_eq!(summary.market_direction, None);
    }

    #[test]
    fn test_label() {
        let row = ThresholdRow {
            threshold_pct: Decimal::new(250, 3),
            long_liquidation_value: Decimal::ZERO,
            short_liquidation_value: Decimal::ZERO,
            total_liquidation_value: Decimal::ZERO,
            imbalance_pct: Decimal::ZERO,
            direction: None,
        };
        assert_eq!(row.label(), "0-0.25%");
    }
}
