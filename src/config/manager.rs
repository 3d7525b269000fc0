//! Configuration Manager

use super::{Config, IdentitySource};
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file.
    ///
    /// Not validated here: CLI overrides are merged first and the caller
    /// validates the final result.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            tracing::info!("Configuration loaded successfully");
            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using environment and defaults",
                path.display()
            );
            Self::load_from_env()
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_addr) = std::env::var("IFSOCKS_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid IFSOCKS_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(secret) = std::env::var("IFSOCKS_SECRET") {
            config.auth.secret = secret;
        }

        if let Ok(identities) = std::env::var("IFSOCKS_IDENTITIES") {
            config.auth.identities = parse_identity_list(&identities);
            config.auth.identity_source = IdentitySource::Static;
        }

        if let Ok(log_level) = std::env::var("IFSOCKS_LOG_LEVEL") {
            config.monitoring.log_level = log_level;
        }

        if let Ok(log_stream) = std::env::var("IFSOCKS_LOG_STREAM") {
            config.monitoring.log_stream = log_stream
                .parse::<bool>()
                .with_context(|| format!("Invalid IFSOCKS_LOG_STREAM: {}", log_stream))?;
        }

        Ok(config)
    }
}

/// Split a comma-separated identity list, dropping blanks
pub fn parse_identity_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a shared secret before it is installed
pub fn validate_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        bail!("secret must not be empty");
    }
    if secret.len() > 255 {
        bail!("secret exceeds 255 bytes");
    }
    Ok(())
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub secret: Option<String>,
    pub identities: Vec<String>,
    pub connect_timeout: Option<Duration>,
    pub log_level: Option<String>,
    pub log_stream: bool,
    pub no_bind_interface: bool,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_auth_config()
            .with_context(|| "Authentication configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    fn validate_server_config(&self) -> Result<()> {
        if self.server.connect_timeout.is_zero() {
            bail!("connect_timeout must be greater than 0");
        }

        if self.server.connect_timeout > Duration::from_secs(3600) {
            bail!("connect_timeout cannot exceed 1 hour");
        }

        if self.server.bind_interface && !cfg!(target_os = "linux") {
            bail!("bind_interface is only supported on Linux");
        }

        Ok(())
    }

    fn validate_auth_config(&self) -> Result<()> {
        validate_secret(&self.auth.secret)?;

        if self.auth.identity_source == IdentitySource::Static && self.auth.identities.is_empty() {
            bail!("identity_source 'static' requires at least one identity");
        }

        for (i, identity) in self.auth.identities.iter().enumerate() {
            if identity.is_empty() {
                bail!("Identity {} is empty", i);
            }
            if identity.len() > 255 {
                bail!("Identity {} exceeds 255 bytes", i);
            }
        }

        Ok(())
    }

    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(&mut self, overrides: &CliOverrides) -> Result<()> {
        if let Some(bind) = &overrides.bind {
            self.server.bind_addr = bind
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid bind address: {}", bind))?;
            tracing::info!("CLI override: bind address set to {}", self.server.bind_addr);
        }

        if let Some(port) = overrides.port {
            self.server.bind_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(secret) = &overrides.secret {
            self.auth.secret = secret.clone();
            tracing::info!("CLI override: shared secret set");
        }

        if !overrides.identities.is_empty() {
            self.auth.identities = overrides.identities.clone();
            self.auth.identity_source = IdentitySource::Static;
            tracing::info!(
                "CLI override: static identities set to {}",
                self.auth.identities.join(", ")
            );
        }

        if let Some(timeout) = overrides.connect_timeout {
            self.server.connect_timeout = timeout;
            tracing::info!(
                "CLI override: connect timeout set to {}",
                humantime::format_duration(timeout)
            );
        }

        if let Some(level) = &overrides.log_level {
            self.monitoring.log_level = level.clone();
            tracing::info!("CLI override: log level set to {}", level);
        }

        if overrides.log_stream {
            self.monitoring.log_stream = true;
            tracing::info!("CLI override: connection log stream enabled");
        }

        if overrides.no_bind_interface {
            self.server.bind_interface = false;
            tracing::info!("CLI override: outbound interface binding disabled");
        }

        Ok(())
    }
}
