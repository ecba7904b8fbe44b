use anyhow::{Context, Result};
use clap::Args;
use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::normalize_base_url;
use crate::auth::{AuthSettings, LoginCredentials, MemoryTokenStore, SqliteTokenStore, TokenStore};

/// Connection and logging options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Root URL of the task API
    #[arg(long, env = "TASKS_API_URL", default_value = "http://localhost:8000/api/")]
    pub api_url: String,

    /// Username for the token endpoint
    #[arg(short = 'u', long, env = "TASKS_USERNAME", default_value = "admin")]
    pub username: String,

    /// Password for the token endpoint
    #[arg(long, env = "TASKS_PASSWORD", default_value = "admin", hide_env_values = true)]
    pub password: String,

    /// SQLite file holding the token pair
    #[arg(long, env = "TASKS_TOKEN_DB")]
    pub token_db: Option<String>,

    /// Keep tokens in memory only
    #[arg(long, env = "TASKS_EPHEMERAL")]
    pub ephemeral: bool,

    /// Seconds between proactive token refreshes
    #[arg(long, env = "TOKEN_REFRESH_INTERVAL", default_value = "240")]
    pub refresh_interval: u64,

    /// HTTP connect timeout in seconds
    #[arg(long, env = "HTTP_CONNECT_TIMEOUT", default_value = "10")]
    pub connect_timeout: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // API
    pub api_url: Url,
    pub credentials: LoginCredentials,

    // Token storage; None keeps tokens in memory
    pub token_db: Option<PathBuf>,
    pub refresh_interval: Duration,

    // HTTP client
    pub connect_timeout: Duration,
    pub request_timeout: Duration,

    // Logging
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Build configuration from parsed arguments (CLI > ENV > defaults)
    pub fn from_args(args: &ConnectionArgs) -> Result<Self> {
        let api_url = Url::parse(&args.api_url)
            .with_context(|| format!("TASKS_API_URL is not a valid URL: {}", args.api_url))?;

        let token_db = if args.ephemeral {
            None
        } else {
            Some(
                args.token_db
                    .as_deref()
                    .map(expand_tilde)
                    .unwrap_or_else(default_token_db_path),
            )
        };

        Ok(Config {
            api_url: normalize_base_url(api_url),
            credentials: LoginCredentials {
                username: args.username.clone(),
                password: args.password.clone(),
            },
            token_db,
            refresh_interval: Duration::from_secs(args.refresh_interval),
            connect_timeout: Duration::from_secs(args.connect_timeout),
            request_timeout: Duration::from_secs(args.request_timeout),
            log_level: args.log_level.clone(),
            log_format: parse_log_format(&args.log_format),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.api_url.scheme(), "http" | "https") {
            anyhow::bail!("TASKS_API_URL must be http or https: {}", self.api_url);
        }

        if self.credentials.username.is_empty() {
            anyhow::bail!("TASKS_USERNAME cannot be empty");
        }

        if self.credentials.password.is_empty() {
            anyhow::bail!("TASKS_PASSWORD cannot be empty");
        }

        if self.refresh_interval.is_zero() {
            anyhow::bail!("TOKEN_REFRESH_INTERVAL must be greater than zero");
        }

        Ok(())
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            base_url: self.api_url.clone(),
            credentials: self.credentials.clone(),
            refresh_interval: self.refresh_interval,
        }
    }

    /// Open the configured token store
    pub fn open_token_store(&self) -> Result<Arc<dyn TokenStore>> {
        match &self.token_db {
            Some(path) => Ok(Arc::new(SqliteTokenStore::open(path)?)),
            None => Ok(Arc::new(MemoryTokenStore::new())),
        }
    }
}

/// Default token database under the user's data directory
fn default_token_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("tasks-client").join("tokens.sqlite3"))
        .unwrap_or_else(|| PathBuf::from("tokens.sqlite3"))
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Parse log format from string
fn parse_log_format(s: &str) -> LogFormat {
    match s.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}
