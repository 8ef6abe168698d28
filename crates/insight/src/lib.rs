// Domain-driven module structure for the analysis front end.

// Providers and analysis
pub mod analysis;
pub mod provider;

// Run plumbing
pub mod app;
pub mod cli;
pub mod config;
pub mod render;
