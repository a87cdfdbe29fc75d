/// Core Module for liteorm
///
/// This module contains the mapping engine and the error type shared by
/// every layer of the crate.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{OrmError, Result};
