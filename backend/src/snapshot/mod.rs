pub mod builder;
pub mod normalize;

pub use builder::{SnapshotBuilder, SnapshotConfig};
