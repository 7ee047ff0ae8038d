use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal derived from a liquidation imbalance. More long exposure means
/// forced selling, hence `Short`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CascadeDirection {
    Long,
    Short,
    Neutral,
}

impl CascadeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeDirection::Long => "LONG",
            CascadeDirection::Short => "SHORT",
            CascadeDirection::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for CascadeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Liquidation exposure for one hypothetical price move of `threshold_pct`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRow {
    pub threshold_pct: Decimal,
    pub long_liquidation_value: Decimal,
    pub short_liquidation_value: Decimal,
    pub total_liquidation_value: Decimal,
    pub imbalance_pct: Decimal,
    /// `None` when nothing would be liquidated.
    pub direction: Option<CascadeDirection>,
}

impl ThresholdRow {
    /// Table label, e.g. `0-2.5%`.
    pub fn label(&self) -> String {
        format!("0-{}%", self.threshold_pct.normalize())
    }
}

/// Exposure for a single coin at the impact threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinImpact {
    pub coin: String,
    pub current_price: Decimal,
    pub price_down: Decimal,
    pub price_up: Decimal,
    pub long_liquidation_value: Decimal,
    pub short_liquidation_value: Decimal,
    /// `None` when neither side reaches the significance floor.
    pub direction: Option<CascadeDirection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub threshold_pct: Decimal,
    /// Ordered by absolute long/short difference, largest first.
    pub coins: Vec<CoinImpact>,
    pub total_long_liquidation_value: Decimal,
    pub total_short_liquidation_value: Decimal,
    pub market_direction: Option<CascadeDirection>,
}
