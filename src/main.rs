//! ifsocks - interface-authenticated SOCKS5 proxy
//!
//! Clients authenticate with the name of a local network interface as the
//! username and a shared secret as the password; their traffic then leaves
//! the host through that interface.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ifsocks::{
    config::{CliOverrides, Config, ConfigManager},
    management::ManagementServer,
    ConnectionManager, ControlState, ShutdownCoordinator,
};

/// CLI arguments for ifsocks
#[derive(Parser, Debug)]
#[command(name = "ifsocks")]
#[command(about = "SOCKS5 proxy that authenticates clients by network interface name")]
#[command(version)]
#[command(long_about = "
ifsocks - interface-authenticated SOCKS5 proxy

The SOCKS5 username must name a network interface that currently exists on
the host; the password must match the shared secret. Accepted connections
egress through the named interface.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  IFSOCKS_BIND_ADDR   - Bind address (e.g., 0.0.0.0:9011)
  IFSOCKS_SECRET      - Initial shared secret
  IFSOCKS_IDENTITIES  - Comma-separated static identity list
  IFSOCKS_LOG_LEVEL   - Log level (trace, debug, info, warn, error)
  IFSOCKS_LOG_STREAM  - Start with the connection log stream on (true/false)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", help = "Path to configuration file")]
    pub config: PathBuf,

    /// Bind address (overrides config file)
    #[arg(short, long, help = "Bind address (e.g., 0.0.0.0:9011)")]
    pub bind: Option<String>,

    /// Port to bind to (overrides config file)
    #[arg(short, long, help = "Port to bind to")]
    pub port: Option<u16>,

    /// Initial shared secret
    #[arg(long, help = "Initial shared secret")]
    pub secret: Option<String>,

    /// Accept these identities instead of the live interface list
    #[arg(long = "identity", help = "Static identity; may be repeated")]
    pub identities: Vec<String>,

    /// Outbound connect timeout
    #[arg(long, value_parser = humantime::parse_duration, help = "Outbound connect timeout (e.g., 10s)")]
    pub connect_timeout: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, help = "Log level")]
    pub log_level: Option<String>,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Start with the per-connection log stream enabled
    #[arg(long, help = "Log every new connection and successful CONNECT")]
    pub log_stream: bool,

    /// Do not bind outbound sockets to the client's interface
    #[arg(long, help = "Do not bind outbound sockets to the client's interface")]
    pub no_bind_interface: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,
}

impl CliArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            bind: self.bind.clone(),
            port: self.port,
            secret: self.secret.clone(),
            identities: self.identities.clone(),
            connect_timeout: self.connect_timeout,
            log_level: self.log_level.clone(),
            log_stream: self.log_stream,
            no_bind_interface: self.no_bind_interface,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        ConfigManager::load_from_env()?
    };
    config.merge_with_cli_args(&args.overrides())?;
    config
        .validate()
        .context("Final configuration validation failed")?;

    init_tracing(&args, &config)?;

    info!("Starting ifsocks v{}", env!("CARGO_PKG_VERSION"));

    if args.validate_config {
        info!("Configuration is valid");
        log_summary(&config);
        return Ok(());
    }
    log_summary(&config);

    let shutdown_coordinator = ShutdownCoordinator::new();
    let control = Arc::new(ControlState::new(
        config.auth.secret.clone(),
        config.monitoring.log_stream,
    ));
    let identities = config.identity_provider();

    let config = Arc::new(config);
    let mut connection_manager =
        ConnectionManager::new(Arc::clone(&config), Arc::clone(&identities), Arc::clone(&control));
    connection_manager
        .bind()
        .await
        .context("Failed to bind SOCKS5 listener")?;

    let management_handle = if config.monitoring.management_api.enabled {
        let management_server = ManagementServer::new(
            config.monitoring.management_api.bind_addr,
            Arc::clone(&control),
            Arc::clone(&identities),
            connection_manager.counters(),
            config.monitoring.management_api.auth.clone(),
        );
        let shutdown = shutdown_coordinator.signalled();

        Some(tokio::spawn(async move {
            if let Err(e) = management_server.start(shutdown).await {
                error!("Management API server error: {}", e);
            }
        }))
    } else {
        info!("Management API server disabled");
        None
    };

    let mut shutdown_rx = shutdown_coordinator.subscribe();
    let server_handle = tokio::spawn(async move {
        let mut manager = connection_manager;

        tokio::select! {
            result = manager.start() => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Server task received shutdown signal");
                if let Err(e) = manager.shutdown().await {
                    error!("Error during connection cleanup: {}", e);
                }
            }
        }
    });

    info!("Press Ctrl+C or send SIGTERM/SIGINT to shut down gracefully");

    if let Err(e) = shutdown_coordinator.listen_for_signals().await {
        error!("Error setting up signal handlers: {}", e);
        shutdown_coordinator.trigger();
    }

    if let Err(e) = server_handle.await {
        if !e.is_cancelled() {
            error!("Server task failed: {}", e);
        }
    }

    if let Some(handle) = management_handle {
        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(_) => info!("Management API server shutdown"),
            Err(_) => warn!("Management API server did not stop in time"),
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

fn log_summary(config: &Config) {
    info!("Bind address: {}", config.server.bind_addr);
    info!("Identity source: {:?}", config.auth.identity_source);
    info!(
        "Connect timeout: {}",
        humantime::format_duration(config.server.connect_timeout)
    );
    info!(
        "Interface binding: {}",
        if config.server.bind_interface { "enabled" } else { "disabled" }
    );
    info!(
        "Connection log stream: {}",
        if config.monitoring.log_stream { "enabled" } else { "disabled" }
    );
    if config.monitoring.log_stream
        && matches!(config.monitoring.log_level.as_str(), "warn" | "error")
    {
        warn!(
            "Connection log stream lines are logged at info and hidden by log level {}",
            config.monitoring.log_level
        );
    }
    if config.auth.secret == "password" {
        warn!("Using the default shared secret; set auth.secret or --secret");
    }
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs, config: &Config) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        config.monitoring.log_level.as_str()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
