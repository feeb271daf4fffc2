//! Joins a day's resolved tables into feature rows.
//!
//! schedule + odds -> [`join::JoinedGame`] -> [`stats::StatsRow`] -> [`features::FeatureRow`]

pub mod features;
pub mod join;
pub mod report;
pub mod stats;

pub use features::{build_batch, build_row, FeatureRow, RangeWeights};
pub use join::{join, JoinedGame};
pub use report::DataQualityReport;
pub use stats::{attach_stats, Role, SplitSelection, StatsRow};
