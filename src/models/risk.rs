use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Position;

/// A position annotated with its distance from forced liquidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    #[serde(flatten)]
    pub position: Position,
    pub current_price: Decimal,
    pub distance_to_liquidation_pct: Decimal,
    /// USDC held in the owner's spot account. Looked up only for the
    /// nearest and the highlighted rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_usdc: Option<Decimal>,
}

/// Cumulative notional of ranked positions within `0..=upper_pct` distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBand {
    pub upper_pct: Decimal,
    pub position_count: usize,
    pub cumulative_value: Decimal,
}

/// Positions nearest to liquidation, split by side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub longs: Vec<RiskRow>,
    pub shorts: Vec<RiskRow>,
    pub long_bands: Vec<RiskBand>,
    pub short_bands: Vec<RiskBand>,
    pub highlighted_longs: Vec<RiskRow>,
    pub highlighted_shorts: Vec<RiskRow>,
}
