//! Process configuration: TOML file plus environment overrides.
//!
//! The token signing secret is required and has no default. It may come
//! from the `MARKSTASH_TOKEN_SECRET` environment variable (preferred) or
//! from `[auth] token_secret` in the config file; the environment wins.

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config-file signing secret.
pub const TOKEN_SECRET_ENV: &str = "MARKSTASH_TOKEN_SECRET";

/// Default token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: u64 = 60;

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    /// Directory holding the SQLite database.
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Process-wide token signing secret. Loaded once, never mutated.
    pub token_secret: String,
    pub token_ttl_minutes: u64,
}

// ── Raw file shape ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    gateway: RawGateway,
    #[serde(default)]
    auth: RawAuth,
    #[serde(default)]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGateway {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for RawGateway {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAuth {
    #[serde(default)]
    token_secret: Option<String>,
    #[serde(default)]
    token_ttl_minutes: Option<u64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from `path`, or from the platform config dir
    /// when no path is given. A missing file is fine; a missing signing
    /// secret is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let raw = match path {
            Some(p) => Self::read_file(p)?,
            None => match Self::default_config_path() {
                Some(p) if p.exists() => Self::read_file(&p)?,
                _ => RawConfig::default(),
            },
        };
        Self::resolve(raw)
    }

    fn read_file(path: &Path) -> Result<RawConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("cannot parse config file {}", path.display()))
    }

    fn resolve(raw: RawConfig) -> Result<Self> {
        // Environment variable takes priority over the config file.
        let token_secret = std::env::var(TOKEN_SECRET_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or(raw.auth.token_secret)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let Some(token_secret) = token_secret else {
            bail!(
                "token signing secret is not configured — set {TOKEN_SECRET_ENV} \
                 or [auth] token_secret in the config file"
            );
        };

        let data_dir = match raw.data_dir {
            Some(dir) => dir,
            None => Self::default_data_dir()
                .context("cannot determine a data directory; set data_dir in the config file")?,
        };

        Ok(Self {
            gateway: GatewayConfig {
                host: raw.gateway.host,
                port: raw.gateway.port,
            },
            auth: AuthConfig {
                token_secret,
                token_ttl_minutes: raw
                    .auth
                    .token_ttl_minutes
                    .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES),
            },
            data_dir,
        })
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "markstash").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn default_data_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "markstash").map(|dirs| dirs.data_dir().to_path_buf())
    }
}
