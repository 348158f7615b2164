use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::client::DEFAULT_API_URL;

pub const CONFIG_FILE: &str = ".github-fame.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .github-fame.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub exclude: ExcludeConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// API root, for GitHub Enterprise (e.g., "https://ghe.example.com/api/v3")
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
    /// Extra globs, added to the ones given with --exclude-glob
    #[serde(default)]
    pub globs: Vec<String>,
    /// PR numbers, added to the ones given with --exclude-pr
    #[serde(default)]
    pub prs: Vec<u64>,
    /// Same as --disable-default-exclude-globs
    #[serde(default)]
    pub disable_default_globs: bool,
}

impl Config {
    /// Load configuration from .github-fame.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: the command-line value wins, then the config
    /// file, then the GITHUB_TOKEN env var.
    pub fn github_token(&self, cli_token: Option<&str>) -> Option<String> {
        cli_token
            .map(str::to_string)
            .or_else(|| self.github.token.clone())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }

    pub fn api_url(&self) -> &str {
        self.github.api_url.as_deref().unwrap_or(DEFAULT_API_URL)
    }
}
