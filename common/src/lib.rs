//! Shared plumbing for the volatility index workspace.

pub mod logger;
