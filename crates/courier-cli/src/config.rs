//! Daemon configuration
//!
//! Layered loading with figment: defaults, then an optional TOML file, then
//! `COURIER_*` environment variables, then command-line overrides on top.
//! Priority: CLI args > env vars > config file > defaults.

use std::path::Path;

use courier_core::RelayConfig;
use courier_ws::WsConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::Result;

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relay core limits and channel sizing.
    pub relay: RelayConfig,

    /// WebSocket listener settings.
    pub ws: WsConfig,
}

impl AppConfig {
    /// Load configuration with the full layering applied.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }
        let config = figment
            .merge(Env::prefixed("COURIER_").split("__"))
            .extract()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.ws.bind_addr = bind.clone();
        }
    }
}
