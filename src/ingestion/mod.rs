pub mod addresses;
pub mod fetcher;
pub mod normalizer;
pub mod retry;

pub use addresses::{load_addresses, parse_addresses};
pub use fetcher::{fetch_all, FetchOutcome, FetchSettings};
pub use normalizer::{normalize_payload, reconcile_directions, NormalizeStats};
pub use retry::{RetryPolicy, Retryable};
