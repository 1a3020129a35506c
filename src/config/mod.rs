//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - JSON loading with per-field defaults
//! - Environment overrides for credentials and mode switches
//! - Validation of the values the retry engine depends on

pub mod settings;

pub use settings::{
    ConfigError, NetworkSettings, OutputSettings, RetrySettings, ScraperConfig, ScraperSettings,
    TargetSettings, TorSettings,
};
