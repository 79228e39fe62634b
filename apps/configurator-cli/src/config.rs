//! # Configurator Configuration
//!
//! Host settings the engine itself never reads from disk: the hosting
//! channel, the FX rate table and the log filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority)                              │
//! │     --channel admin                                                    │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     CONFIGURATOR_CHANNEL=storefront                                    │
//! │     CONFIGURATOR_LOG=debug                                             │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/configurator/configurator.toml (Linux)                   │
//! │     ~/Library/Application Support/com.configurator.configurator/...    │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! │     no channel, "info,configurator=debug" filter, NO fx table          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # configurator.toml
//! [storefront]
//! active_channel = "storefront"
//!
//! [fx.rates.USD]
//! EUR = "0.92"
//! GBP = "0.79"
//!
//! [fx.rates.EUR]
//! USD = "1.09"
//!
//! [logging]
//! filter = "info,configurator=debug"
//! ```
//!
//! The `[fx]` section is mandatory. Declare `[fx.rates]` with no rows to run
//! without conversion; cross-currency margins then stay idle.

use std::path::PathBuf;

use configurator_core::{is_currency_code, FxTable, PricingContext};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

// =============================================================================
// Sections
// =============================================================================

/// Where the configurator is being hosted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorefrontSettings {
    /// Channel used for override rules and channel-scoped field visibility.
    #[serde(default)]
    pub active_channel: Option<String>,
}

/// Currency conversion rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxSettings {
    #[serde(default)]
    pub rates: FxTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` still wins.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,configurator=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguratorConfig {
    #[serde(default)]
    pub storefront: StorefrontSettings,

    /// `None` until a config file declares `[fx]`; [`validate`] rejects that.
    ///
    /// [`validate`]: ConfiguratorConfig::validate
    #[serde(default)]
    pub fx: Option<FxSettings>,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// File the configuration was read from. Logged by the caller once
    /// tracing is up.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl ConfiguratorConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (configurator.toml)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` that does not exist is an error; a missing
    /// file at the default location is not.
    pub fn load(config_path: Option<PathBuf>) -> CliResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                let contents =
                    std::fs::read_to_string(&path).map_err(|e| CliError::io(&path, e))?;
                config = Self::from_toml_str(&contents)?;
                config.source = Some(path);
            } else if explicit {
                return Err(CliError::ConfigNotFound(path));
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> CliResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CliResult<()> {
        let fx = self.fx.as_ref().ok_or(CliError::MissingFxTable)?;

        for (from, to, rate) in fx.rates.iter() {
            for code in [from, to] {
                if !is_currency_code(code) {
                    return Err(CliError::InvalidConfig(format!(
                        "'{code}' in the FX table is not a currency code"
                    )));
                }
            }
            if rate <= Decimal::ZERO {
                return Err(CliError::InvalidConfig(format!(
                    "FX rate {from}→{to} must be positive, got {rate}"
                )));
            }
        }

        if let Some(channel) = &self.storefront.active_channel {
            if channel.trim().is_empty() {
                return Err(CliError::InvalidConfig(
                    "active_channel must not be blank".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment overrides read through `var`.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(channel) = var("CONFIGURATOR_CHANNEL") {
            self.storefront.active_channel = Some(channel);
        }

        if let Some(filter) = var("CONFIGURATOR_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "configurator", "configurator")
            .map(|dirs| dirs.config_dir().join("configurator.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Builds the engine's pricing context. `channel` overrides the
    /// configured one.
    pub fn pricing_context(&self, channel: Option<String>) -> PricingContext {
        PricingContext {
            fx_rates: self
                .fx
                .as_ref()
                .map(|fx| fx.rates.clone())
                .unwrap_or_default(),
            active_channel: channel.or_else(|| self.storefront.active_channel.clone()),
        }
    }
}
