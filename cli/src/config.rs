//! Configuration loading: config file, env vars, CLI flags.
//!
//! Later sources win: file, then environment, then flags.

use anyhow::{Context, Result};
use ether_swapper_core::Address;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub const ENV_RPC_URL: &str = "SWAPPER_RPC_URL";
pub const ENV_DEPLOYER: &str = "SWAPPER_DEPLOYER";
pub const ENV_MARKET: &str = "SWAPPER_MARKET";
pub const ENV_LOG_LEVEL: &str = "SWAPPER_LOG_LEVEL";

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapperConfig {
    /// Network endpoint; recorded for deployments, never dialed
    pub rpc_url: Option<String>,
    /// Account that deploys and administers the proxy
    pub deployer: Option<Address>,
    /// Market (router) the proxy must be initialized against
    pub market: Option<Address>,
    pub log_level: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub rpc_url: Option<String>,
    pub deployer: Option<String>,
    pub market: Option<String>,
    pub log_level: Option<String>,
}

impl Default for SwapperConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            deployer: None,
            market: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl SwapperConfig {
    /// File (if any), then process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            config.apply_file(toml::from_str(&raw).context("Failed to parse config file")?)?;
        }
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(rpc_url) = file.rpc_url {
            self.rpc_url = Some(rpc_url);
        }
        if let Some(deployer) = file.deployer {
            self.deployer = Some(parse_field("deployer", &deployer)?);
        }
        if let Some(market) = file.market {
            self.market = Some(parse_field("market", &market)?);
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        Ok(())
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rpc_url) = lookup(ENV_RPC_URL) {
            self.rpc_url = Some(rpc_url);
        }
        if let Some(deployer) = lookup(ENV_DEPLOYER) {
            self.deployer = Some(parse_field(ENV_DEPLOYER, &deployer)?);
        }
        if let Some(market) = lookup(ENV_MARKET) {
            self.market = Some(parse_field(ENV_MARKET, &market)?);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Log what the host is configured with
    pub fn log_summary(&self) {
        match &self.rpc_url {
            Some(url) => info!(rpc_url = %url, "configured network endpoint"),
            None => info!("no network endpoint configured; running against the scenario file only"),
        }
        if let Some(market) = self.market {
            info!(%market, "expecting market");
        }
    }
}

fn parse_field(name: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).with_context(|| format!("Invalid address for {}: {}", name, value))
}
