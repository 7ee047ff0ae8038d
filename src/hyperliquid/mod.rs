pub mod info_client;
pub mod prices;
pub mod types;

pub use info_client::{InfoClient, InfoClientError};
pub use prices::PriceSource;
pub use types::{AssetPosition, ClearinghouseState, InfoRequest, RawPosition, SpotClearinghouseState};
