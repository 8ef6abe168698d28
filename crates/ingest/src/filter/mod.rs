//! Filter/Group engine: pure, deterministic passes over a record sequence.

pub mod engine;
pub mod group;
pub mod plan;
pub mod regex;

pub use engine::{ExclusionFilter, FilterCounts, SeveritySet};
pub use group::{group, summarize};
pub use plan::FilterPlan;
