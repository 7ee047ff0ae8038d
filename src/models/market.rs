use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hours in a year, for annualizing hourly funding.
const HOURS_PER_YEAR: i64 = 24 * 365;

/// Perp funding for one coin as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingRate {
    pub coin: String,
    /// Rate charged per hour, as a fraction.
    pub hourly_rate: Decimal,
    /// `hourly_rate * 24 * 365 * 100`.
    pub annualized_pct: Decimal,
}

impl FundingRate {
    /// `None` if the annualized rate does not fit in a `Decimal`.
    pub fn from_hourly(coin: &str, hourly_rate: Decimal) -> Option<Self> {
        let annualized_pct = hourly_rate
            .checked_mul(Decimal::from(HOURS_PER_YEAR))?
            .checked_mul(Decimal::ONE_HUNDRED)?;
        Some(Self {
            coin: coin.to_string(),
            hourly_rate,
            annualized_pct,
        })
    }
}
