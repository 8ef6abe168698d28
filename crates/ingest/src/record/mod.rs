//! Record model: the canonical in-memory log entry shared by every source
//! and consumer.

pub mod model;
pub mod window;

pub use model::{LineFormat, RawLine, Record, Severity, SourceKind, SourceTag};
pub use window::{Window, WindowError};
