use engine::IndexError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid base asset: {0:?}")]
    InvalidBaseAsset(String),

    #[error("invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}
