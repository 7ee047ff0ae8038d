use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use super::types::{AssetCtx, ClearinghouseState, InfoRequest, MetaAndAssetCtxs, SpotClearinghouseState};
use crate::ingestion::retry::Retryable;

const HYPERLIQUID_API_BASE: &str = "https://api.hyperliquid.xyz";

#[derive(Debug, Error)]
pub enum InfoClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("unexpected status: {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Retryable for InfoClientError {
    fn is_retryable(&self) -> bool {
        matches!(self, InfoClientError::RateLimited)
    }
}

/// Client for the exchange's public `POST /info` endpoint.
#[derive(Debug, Clone)]
pub struct InfoClient {
    http: Client,
    base_url: String,
}

impl Default for InfoClient {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl InfoClient {
    pub fn new(http: Client) -> Self {
        Self::with_base_url(http, HYPERLIQUID_API_BASE)
    }

    pub fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch open perp positions for one address. A 429 maps to
    /// [`InfoClientError::RateLimited`] so callers can back off.
    pub async fn clearinghouse_state(
        &self,
        address: &str,
    ) -> Result<ClearinghouseState, InfoClientError> {
        self.post(&InfoRequest::clearinghouse_state(address)).await
    }

    /// USDC total in the address's spot account; zero when it holds none.
    pub async fn spot_usdc_balance(&self, address: &str) -> Result<Decimal, InfoClientError> {
        let state: SpotClearinghouseState = self
            .post(&InfoRequest::spot_clearinghouse_state(address))
            .await?;

        Ok(state
            .balances
            .iter()
            .find(|b| b.coin == "USDC")
            .and_then(|b| b.total.as_deref())
            .and_then(|t| Decimal::from_str(t.trim()).ok())
            .unwrap_or(Decimal::ZERO))
    }

    /// Mark price per perp coin, read from `metaAndAssetCtxs`.
    pub async fn mark_prices(&self) -> Result<HashMap<String, Decimal>, InfoClientError> {
        self.asset_field(|ctx| ctx.mark_px.as_deref()).await
    }

    /// Hourly funding rate per perp coin, read from `metaAndAssetCtxs`.
    pub async fn hourly_funding(&self) -> Result<HashMap<String, Decimal>, InfoClientError> {
        self.asset_field(|ctx| ctx.funding.as_deref()).await
    }

    /// One decimal field of every asset context, keyed by uppercase coin.
    /// Contexts pair with `universe` entries by index.
    async fn asset_field<F>(&self, field: F) -> Result<HashMap<String, Decimal>, InfoClientError>
    where
        F: Fn(&AssetCtx) -> Option<&str>,
    {
        let (meta, ctxs): MetaAndAssetCtxs = self.post(&InfoRequest::meta_and_asset_ctxs()).await?;

        let values = meta
            .universe
            .iter()
            .zip(ctxs.iter())
            .filter_map(|(asset, ctx)| {
                let raw = field(ctx)?;
                let value = Decimal::from_str(raw).ok()?;
                Some((asset.name.to_uppercase(), value))
            })
            .collect();

        Ok(values)
    }

    async fn post<T>(&self, body: &InfoRequest) -> Result<T, InfoClientError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}/info", self.base_url);
        metrics::counter!("info_requests_total").increment(1);

        let resp = self.http.post(&url).json(body).send().await?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            metrics::counter!("info_rate_limited_total").increment(1);
            return Err(InfoClientError::RateLimited);
        }
        if !status.is_success() {
            return Err(InfoClientError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
