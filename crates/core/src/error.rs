use std::result::Result as StdResult;

use thiserror::Error;

/// Errors that can occur in mirai-sync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sync lease is held by another run: {0}")]
    LeaseHeld(String),

    #[error("Watermark error: {0}")]
    Watermark(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),
}

pub type Result<T> = StdResult<T, SyncError>;
