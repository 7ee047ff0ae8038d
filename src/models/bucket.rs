use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Direction;

/// Totals for one (coin, direction) group of positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedBucket {
    pub coin: String,
    pub direction: Direction,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub position_count: usize,
    /// Distinct addresses in the group, always >= 1.
    pub trader_count: usize,
    pub avg_leverage: Decimal,
    /// Mean over positions with a known liquidation price only.
    pub avg_liquidation_price: Option<Decimal>,
    pub avg_value_per_trader: Decimal,
}
