//! Study Delta - delta-encoded study metadata mementos
//!
//! A study memento records every instance of a study as a list of differences
//! against a per-series base profile: the attribute values the first two
//! instances of the series share. Loaded mementos decode lazily, so reading a
//! handful of low keys from thousands of instances never materializes the
//! rest of their attributes.
#![warn(missing_docs)]

// Core foundational modules
pub mod core;

// Attribute model and tree format
pub mod types;
pub mod format;

// Codec and record hierarchy
pub mod delta;
pub mod storage;

// Re-export commonly used items for convenience
pub use crate::core::{Config, Error, Result};
pub use crate::core::config::LoggingConfig;
pub use delta::{InstanceMetadata, InstanceRecord, OutputSettings, TagInclusion};
pub use format::Compression;
pub use storage::{SeriesRecord, StudyRecord};
pub use types::{tags, Attribute, Dataset, Tag, Value, Vr};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize tracing. `RUST_LOG` takes precedence over the configured level.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match logging.format.as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };
    installed.map_err(|e| Error::config(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!("Initializing {} v{}", NAME, VERSION);
    Ok(())
}
