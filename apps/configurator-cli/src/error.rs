//! # CLI Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CLI Error Categories                              │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Files       │  │      Catalog            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Io             │  │  Catalog (CoreError)    │ │
//! │  │  MissingFxTable │  │  Json           │  │                         │ │
//! │  │  ConfigNotFound │  │  Toml           │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use configurator_core::CoreError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configurator configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No `[fx]` table configured.
    ///
    /// The pricing context requires a rate table even when it is empty, so
    /// the config has to say so explicitly.
    #[error("FX rate table not configured. Add an [fx] section to configurator.toml")]
    MissingFxTable,

    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    // =========================================================================
    // File Errors
    // =========================================================================
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Writing an emission or snapshot failed.
    #[error("Failed to write output: {0}")]
    Output(#[source] std::io::Error),

    // =========================================================================
    // Catalog Errors
    // =========================================================================
    #[error(transparent)]
    Catalog(#[from] CoreError),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CliError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CliError::Json {
            path: path.into(),
            source,
        }
    }
}
