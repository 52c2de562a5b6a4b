pub mod config;
pub mod db;
pub mod instruments;
pub mod metrics;
pub mod readings;
pub mod snapshot;
pub mod venues;
pub mod worker;

pub mod error;
pub mod time;
