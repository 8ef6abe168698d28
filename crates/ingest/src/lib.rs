// Domain-driven module structure for the ingestion pipeline.

// Core model
pub mod deadline;
pub mod error;
pub mod record;

// Docker access
pub mod client;
pub mod docker;

// Pipeline stages
pub mod collect;
pub mod conf;
pub mod filter;
pub mod parser;
pub mod source;
