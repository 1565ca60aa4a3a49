use super::types::QueryLimits;
use crate::analysis::AnalyzerSettings;
use crate::detection::RuleProfile;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration of the detection service.
///
/// Loaded from an optional TOML file, every field falling back to its default when absent,
/// then overridden by the command line (see `CliArgs`).
///
/// # Fields Overview
///
/// - `bind_address` / `port`: where the HTTP API listens
/// - `database_path`: SQLite file holding requests, detections, statistics and events
/// - `max_connections`: size of the database connection pool
/// - `stats_retry_attempts` / `stats_retry_backoff_ms`: retry policy of the daily statistics
///   update
/// - `default_query_limit` / `max_query_limit`: bounds of the `limit` query parameter
/// - `event_rule_profile`: rule profile used to classify security events
///
/// # Examples
///
/// ```toml
/// bind_address = "127.0.0.1"
/// port = 8001
/// database_path = "/var/lib/vigie/vigie.sqlite3"
/// event_rule_profile = "full"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_address: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub stats_retry_attempts: u32,
    pub stats_retry_backoff_ms: u64,
    pub default_query_limit: u64,
    pub max_query_limit: u64,
    pub event_rule_profile: RuleProfile,
}

impl Default for Config {
    fn default() -> Self {
        let limits = QueryLimits::default();
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8001,
            database_path: PathBuf::from("vigie.sqlite3"),
            max_connections: 5,
            stats_retry_attempts: 3,
            stats_retry_backoff_ms: 50,
            default_query_limit: limits.default,
            max_query_limit: limits.max,
            event_rule_profile: RuleProfile::default(),
        }
    }
}

/// Command-line arguments. Anything given here wins over the configuration file.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "vigie")]
#[command(version)]
#[command(about = "Signature-based attack detection service for sandboxed HTTP traffic")]
pub struct CliArgs {
    /// Optional TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Address the HTTP API binds to
    ///
    /// # Command Line
    /// Use `--bind-address <ADDRESS>` to set this value from the CLI
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Port the HTTP API listens on
    #[arg(long)]
    pub port: Option<u16>,

    /// SQLite database file
    ///
    /// # Command Line
    /// Use `--database-path <PATH>` or the `VIGIE_DB_PATH` environment variable
    #[arg(long, env = "VIGIE_DB_PATH")]
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Parses a TOML configuration file. Missing keys take their default value.
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        debug!("Configuration read from {}", path.display());
        Ok(config)
    }

    /// Builds the effective configuration: file (or defaults), then CLI overrides, validated.
    pub fn load(args: &CliArgs) -> Result<Config, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => Config::from_file(path)?,
            None => {
                info!("No configuration file given, using defaults");
                Config::default()
            }
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.bind_address = bind_address.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(database_path) = &args.database_path {
            self.database_path = database_path.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.port == 0 {
            return Err(ConfigError::NotInRange("port must be between 1 and 65535".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::NotInRange("max_connections must be at least 1".into()));
        }
        if self.stats_retry_attempts == 0 {
            return Err(ConfigError::NotInRange(
                "stats_retry_attempts must be at least 1".into(),
            ));
        }
        if self.max_query_limit == 0 {
            return Err(ConfigError::NotInRange("max_query_limit must be at least 1".into()));
        }
        if self.default_query_limit == 0 || self.default_query_limit > self.max_query_limit {
            return Err(ConfigError::NotInRange(format!(
                "default_query_limit must be between 1 and {}",
                self.max_query_limit
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::BadIPFormatting(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default: self.default_query_limit,
            max: self.max_query_limit,
        }
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            stats_retry_attempts: self.stats_retry_attempts,
            stats_retry_backoff: Duration::from_millis(self.stats_retry_backoff_ms),
            event_profile: self.event_rule_profile,
        }
    }
}
