//! Parser: turns raw source lines into normalized [`Record`](crate::record::Record)s.
//!
//! - `ansi`: escape-code stripping
//! - `timestamp`: leading timestamp and `host process[pid]:` header
//! - `structured`: level hints from JSON / logfmt payloads
//! - `severity`: ordered pattern rules
//! - `volatile`: placeholder substitution for the grouping key
//! - `normalize`: the pipeline stage tying them together

pub mod ansi;
pub mod normalize;
pub mod severity;
pub mod structured;
pub mod timestamp;
pub mod volatile;

pub use normalize::Normalizer;
pub use severity::{SeverityRule, SeverityRules};
pub use volatile::VolatileStripper;
