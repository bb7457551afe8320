pub mod collector;
pub mod commands;
pub mod history;
pub mod platform;
pub mod process;
pub mod procfs;
pub mod snapshot;

pub use collector::{CollectOptions, Collector, Profile};
pub use history::SnapshotStore;
pub use snapshot::{Sample, Snapshot, Unavailable};
