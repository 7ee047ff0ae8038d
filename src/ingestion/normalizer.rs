use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::hyperliquid::{ClearinghouseState, RawPosition};
use crate::models::Position;

/// Why a single raw position was skipped.
#[derive(Debug, Error, PartialEq)]
pub enum PositionParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Counters accumulated while normalizing a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub kept: usize,
    pub below_min: usize,
    pub malformed: usize,
}

/// Turn one address's payload into typed positions.
///
/// Entries that fail to parse are skipped on their own; positions with a
/// notional below `min_position_value` are dropped. Directions are taken
/// from the sign of `szi` and are not reconciled here, see
/// [`reconcile_directions`].
pub fn normalize_payload(
    state: &ClearinghouseState,
    address: &str,
    min_position_value: Decimal,
    observed_at: DateTime<Utc>,
    stats: &mut NormalizeStats,
) -> Vec<Position> {
    let mut positions = Vec::new();

    for entry in state.positions() {
        let raw = match entry {
            Ok(asset) => match asset.position {
                Some(raw) => raw,
                None => continue,
            },
            Err(e) => {
                tracing::debug!(address = %address, error = %e, "Skipping undecodable asset position");
                stats.malformed += 1;
                continue;
            }
        };

        let position = match parse_position(&raw, address, observed_at) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(
                    address = %address,
                    coin = raw.coin.as_deref().unwrap_or("?"),
                    error = %e,
                    "Skipping malformed position"
                );
                stats.malformed += 1;
                continue;
            }
        };

        if position.position_value < min_position_value {
            stats.below_min += 1;
            continue;
        }

        stats.kept += 1;
        positions.push(position);
    }

    positions
}

/// Parse one raw position. `szi`, `positionValue`, `entryPx` and `coin` are
/// required; `unrealizedPnl` and `leverage` default to zero; a missing or
/// non-positive `liquidationPx` means no liquidation price is known.
pub fn parse_position(
    raw: &RawPosition,
    address: &str,
    observed_at: DateTime<Utc>,
) -> Result<Position, PositionParseError> {
    let coin = raw
        .coin
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(PositionParseError::MissingField("coin"))?
        .to_uppercase();

    let size = required_decimal("szi", raw.szi.as_deref())?;
    let position_value = required_decimal("positionValue", raw.position_value.as_deref())?.abs();
    let entry_price = required_decimal("entryPx", raw.entry_px.as_deref())?;

    let unrealized_pnl = optional_decimal("unrealizedPnl", raw.unrealized_pnl.as_deref())?
        .unwrap_or(Decimal::ZERO);

    let liquidation_price = optional_decimal("liquidationPx", raw.liquidation_px.as_deref())?
        .filter(|px| *px > Decimal::ZERO);

    let leverage = match raw.leverage.as_ref().and_then(|l| l.value.as_ref()) {
        Some(value) => leverage_value(value)?,
        None => Decimal::ZERO,
    };

    Ok(Position {
        address: address.to_string(),
        coin,
        entry_price,
        position_value,
        unrealized_pnl,
        liquidation_price,
        leverage,
        is_long: size > Decimal::ZERO,
        observed_at,
    })
}

/// Repair reported directions against liquidation prices.
///
/// If any position with a known liquidation price is inconsistent (a long
/// liquidating above entry, or a short below), every position with a known
/// liquidation price is re-derived as `long = liquidation < entry`.
/// Positions without a liquidation price keep their reported side.
///
/// Returns the number of positions whose direction changed.
pub fn reconcile_directions(positions: &mut [Position]) -> usize {
    let inconsistent = positions
        .iter()
        .filter(|p| p.direction_consistent() == Some(false))
        .count();

    if inconsistent == 0 {
        return 0;
    }

    tracing::warn!(
        inconsistent,
        "Positions with inconsistent direction, re-deriving from liquidation prices"
    );

    let mut flipped = 0;
    for position in positions.iter_mut() {
        let Some(liq) = position.liquidation_price else {
            continue;
        };
        let corrected = liq < position.entry_price;
        if corrected != position.is_long {
            position.is_long = corrected;
            flipped += 1;
        }
    }

    metrics::counter!("direction_corrections_total").increment(flipped as u64);
    tracing::info!(flipped, "Position directions corrected");

    flipped
}

fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, PositionParseError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| PositionParseError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

fn required_decimal(field: &'static str, raw: Option<&str>) -> Result<Decimal, PositionParseError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_decimal(field, s),
        _ => Err(PositionParseError::MissingField(field)),
    }
}

fn optional_decimal(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<Decimal>, PositionParseError> {
    match raw {
        Some(s) if !s.trim().is_empty() => parse_decimal(field, s).map(Some),
        _ => Ok(None),
    }
}

fn leverage_value(value: &Value) -> Result<Decimal, PositionParseError> {
    match value {
        Value::Number(n) => parse_decimal("leverage", &n.to_string()),
        Value::String(s) => parse_decimal("leverage", s),
        Value::Null => Ok(Decimal::ZERO),
        other => Err(PositionParseError::InvalidNumber {
            field: "leverage",
            value: other.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
