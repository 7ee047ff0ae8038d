pub mod cycle;
pub mod poller;

pub use cycle::{analyze_snapshot, run_cycle, run_cycle_from_file, CycleReport, LatestReport, SnapshotAnalysis};
pub use poller::run_position_poller;
