//! Chart snapshot access and streak computation

pub mod source;
pub mod streaks;

pub use source::{ChartSnapshotSource, RequestSnapshotCache, SnapshotFetch};
pub use streaks::top5_streak;
