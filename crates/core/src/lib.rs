//! Core types for mirai-sync
//!
//! This crate contains the declarative table→collection mapping, the
//! environment-driven configuration and the error type shared by the
//! migrator, the syncer and the backfill scripts.

mod config;
mod error;
mod mapping;

pub use config::*;
pub use error::*;
pub use mapping::*;
