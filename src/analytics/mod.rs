pub mod cascade;
pub mod risk;

pub use cascade::{coin_impacts, sweep_thresholds};
pub use risk::{aggregate_buckets, distance_to_liquidation_pct, rank_by_liquidation_distance, top_by_value};
