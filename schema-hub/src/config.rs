//! Server configuration: environment variables first, command-line flags
//! on top.

use anyhow::{Context, Result};
use clap::Parser;
use schema_hub_core::CorruptRegistryPolicy;
use std::path::PathBuf;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";

#[derive(Parser, Debug, Default)]
#[command(name = "schema-hub")]
#[command(about = "HTTP store for named JSON schemas")]
pub struct Cli {
    /// Listen address (env SCHEMA_HUB_ADDR)
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Directory under which `schemas/` is kept (env SCHEMA_HUB_DATA_DIR)
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Allowed CORS origin, repeatable; none means any origin
    /// (env SCHEMA_HUB_CORS_ORIGINS, comma separated)
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// What to do with an unreadable registry file: refuse or quarantine
    /// (env SCHEMA_HUB_CORRUPT_REGISTRY)
    #[arg(long)]
    pub corrupt_registry: Option<CorruptRegistryPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: String,
    pub data_dir: PathBuf,
    pub cors_origins: Vec<String>,
    pub corrupt_registry: CorruptRegistryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            data_dir: PathBuf::from("."),
            cors_origins: Vec::new(),
            corrupt_registry: CorruptRegistryPolicy::default(),
        }
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<ServerConfig> {
    ServerConfig::from_lookup(|key| std::env::var(key).ok())
}

impl ServerConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let corrupt_registry = match lookup("SCHEMA_HUB_CORRUPT_REGISTRY") {
            Some(value) => value
                .parse::<CorruptRegistryPolicy>()
                .map_err(anyhow::Error::msg)
                .context("SCHEMA_HUB_CORRUPT_REGISTRY")?,
            None => defaults.corrupt_registry,
        };
        Ok(Self {
            addr: lookup("SCHEMA_HUB_ADDR").unwrap_or(defaults.addr),
            data_dir: lookup("SCHEMA_HUB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            cors_origins: lookup("SCHEMA_HUB_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(|s| s.to_string())
                        .collect()
                })
                .unwrap_or_default(),
            corrupt_registry,
        })
    }

    /// Command-line flags take precedence over the environment.
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(addr) = cli.addr {
            self.addr = addr;
        }
        if let Some(dir) = cli.data_dir {
            self.data_dir = dir;
        }
        if !cli.cors_origins.is_empty() {
            self.cors_origins = cli.cors_origins;
        }
        if let Some(policy) = cli.corrupt_registry {
            self.corrupt_registry = policy;
        }
        self
    }
}
