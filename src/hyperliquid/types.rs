use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Request body for POST /info
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest {
    #[serde(rename = "type")]
    pub request_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl InfoRequest {
    /// `{"type": "clearinghouseState", "user": <address>}`
    pub fn clearinghouse_state(address: &str) -> Self {
        Self {
            request_type: "clearinghouseState".into(),
            user: Some(address.to_string()),
        }
    }

    /// `{"type": "spotClearinghouseState", "user": <address>}`
    pub fn spot_clearinghouse_state(address: &str) -> Self {
        Self {
            request_type: "spotClearinghouseState".into(),
            user: Some(address.to_string()),
        }
    }

    /// `{"type": "metaAndAssetCtxs"}`
    pub fn meta_and_asset_ctxs() -> Self {
        Self {
            request_type: "metaAndAssetCtxs".into(),
            user: None,
        }
    }
}

// ---------------------------------------------------------------------------
// clearinghouseState response
// ---------------------------------------------------------------------------

/// Per-address perp account state. Entries of `assetPositions` are kept as
/// raw JSON so that one malformed entry does not reject the whole payload;
/// see [`ClearinghouseState::positions`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    #[serde(default)]
    pub asset_positions: Vec<Value>,
}

impl ClearinghouseState {
    /// Decode each asset position independently, yielding `Err` for entries
    /// that do not match the schema.
    pub fn positions(&self) -> impl Iterator<Item = Result<AssetPosition, serde_json::Error>> + '_ {
        self.asset_positions
            .iter()
            .map(|v| AssetPosition::deserialize(v))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetPosition {
    #[serde(default)]
    pub position: Option<RawPosition>,
}

/// Numeric fields arrive as decimal strings, e.g. `"szi": "-0.5"`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPosition {
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default)]
    pub szi: Option<String>,
    #[serde(default)]
    pub position_value: Option<String>,
    #[serde(default)]
    pub entry_px: Option<String>,
    #[serde(default)]
    pub unrealized_pnl: Option<String>,
    /// `null` for positions the exchange cannot liquidate.
    #[serde(default)]
    pub liquidation_px: Option<String>,
    #[serde(default)]
    pub leverage: Option<RawLeverage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawLeverage {
    /// Integer on the wire, occasionally a string.
    #[serde(default)]
    pub value: Option<Value>,
}

// ---------------------------------------------------------------------------
// metaAndAssetCtxs response: `[ { "universe": [...] }, [ ctx, ... ] ]`
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerpMeta {
    #[serde(default)]
    pub universe: Vec<PerpAsset>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerpAsset {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCtx {
    #[serde(default)]
    pub mark_px: Option<String>,
    #[serde(default)]
    pub funding: Option<String>,
}

pub type MetaAndAssetCtxs = (PerpMeta, Vec<AssetCtx>);

// ---------------------------------------------------------------------------
// spotClearinghouseState response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotClearinghouseState {
    #[serde(default)]
    pub balances: Vec<SpotBalance>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpotBalance {
    pub coin: String,
    /// Decimal string including amounts on hold.
    #[serde(default)]
    pub total: Option<String>,
}
