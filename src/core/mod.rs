//! Core system types and foundations
//!
//! This module contains the fundamental building blocks shared by every layer:
//! error handling and configuration.

pub mod error;
pub mod config;

// Re-export commonly used items
pub use error::{DecodeError, Error, Result, ValueError};
pub use config::Config;
