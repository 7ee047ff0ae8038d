pub mod bucket;
pub mod cascade;
pub mod market;
pub mod position;
pub mod risk;

pub use bucket::AggregatedBucket;
pub use cascade::{CascadeDirection, CoinImpact, ImpactSummary, ThresholdRow};
pub use market::FundingRate;
pub use position::Position;
pub use risk::{RiskBand, RiskReport, RiskRow};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Current price per coin symbol (uppercase).
pub type PriceMap = HashMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
