use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// One open perpetual position held by one tracked address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub address: String,
    pub coin: String,
    pub entry_price: Decimal,
    /// Notional magnitude, never negative.
    pub position_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// `None` when the exchange reports no liquidation price (absent or zero).
    pub liquidation_price: Option<Decimal>,
    pub leverage: Decimal,
    pub is_long: bool,
    pub observed_at: DateTime<Utc>,
}

impl Position {
    pub fn direction(&self) -> Direction {
        Direction::from_is_long(self.is_long)
    }

    /// Whether the reported side agrees with where the position liquidates:
    /// longs below entry, shorts above. `None` without a liquidation price.
    pub fn direction_consistent(&self) -> Option<bool> {
        let liq = self.liquidation_price?;
        Some(if self.is_long {
            liq < self.entry_price
        } else {
            liq > self.entry_price
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Position: address={} coin={} side={} value={} entry={} liq={}",
            self.address.get(..10).unwrap_or(&self.address),
            self.coin,
            self.direction(),
            self.position_value,
            self.entry_price,
            self.liquidation_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "N/A".into()),
        )
    }
}
