pub mod client;
pub mod types;

pub use client::DeribitClient;
pub use types::*;
