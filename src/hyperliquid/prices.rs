use std::future::Future;

use crate::models::{FundingRate, PriceMap};

use super::InfoClient;

/// Resolves current prices for a set of coins. Coins without a price are
/// simply absent from the returned map.
pub trait PriceSource {
    fn current_prices(&self, coins: &[String]) -> impl Future<Output = PriceMap> + Send;

    /// Funding per coin, in `coins` order. Sources without funding data
    /// report none.
    fn funding_rates(&self, _coins: &[String]) -> impl Future<Output = Vec<FundingRate>> + Send {
        async { Vec::new() }
    }
}

impl PriceSource for InfoClient {
    async fn current_prices(&self, coins: &[String]) -> PriceMap {
        let marks = match self.mark_prices().await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch mark prices");
                return PriceMap::new();
            }
        };

        coins
            .iter()
            .filter_map(|coin| match marks.get(coin) {
                Some(px) => Some((coin.clone(), *px)),
                None => {
                    tracing::warn!(coin = %coin, "No mark price for coin");
                    None
                }
            })
            .collect()
    }

    async fn funding_rates(&self, coins: &[String]) -> Vec<FundingRate> {
        let rates = match self.hourly_funding().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch funding rates");
                return Vec::new();
            }
        };

        coins
            .iter()
            .filter_map(|coin| FundingRate::from_hourly(coin, *rates.get(coin)?))
            .collect()
    }
}

/// Fixed prices, for offline runs and tests.
impl PriceSource for PriceMap {
    async fn current_prices(&self, coins: &[String]) -> PriceMap {
        coins
            .iter()
            .filter_map(|coin| self.get(coin).map(|px| (coin.clone(), *px)))
            .collect()
    }
}
