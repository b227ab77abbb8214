use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};

pub const DEFAULT_PORT: u16 = 5000;
pub const HEALTH_PATH: &str = "/health";

/// Process configuration, read once at startup and shared through the
/// router state.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub webhook_path: String,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Bearer token used for artifact downloads.
    pub token: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Per-branch output directories live directly under this path.
    pub root: PathBuf,
    /// Where downloaded archives are staged. Defaults to the system temp dir.
    pub workspace_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> { Self::from_lookup(|key| std::env::var(key).ok()) }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| anyhow!("Environment variable {key} is required"))
        };
        let webhook_secret = required("GITHUB_WEBHOOK_SECRET")?;
        let root = PathBuf::from(required("OUTPUT_ROOT")?);
        let webhook_path = required("WEBHOOK_PATH")?;
        let token = required("GITHUB_TOKEN")?;
        if !webhook_path.starts_with('/') {
            bail!("WEBHOOK_PATH must start with '/', got {webhook_path:?}");
        }
        if webhook_path == HEALTH_PATH {
            bail!("WEBHOOK_PATH conflicts with the health check route {HEALTH_PATH}");
        }
        let port = match lookup("PORT") {
            Some(port) => port.parse().map_err(|_| anyhow!("PORT is not a valid port: {port:?}"))?,
            None => DEFAULT_PORT,
        };
        let workspace_dir = lookup("WORKSPACE_DIR").filter(|v| !v.is_empty()).map(PathBuf::from);
        Ok(Config {
            server: ServerConfig { port, webhook_path },
            github: GitHubConfig { token, webhook_secret },
            output: OutputConfig { root, workspace_dir },
        })
    }
}
