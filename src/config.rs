// ⚙️ Configuration - env > cashback.toml > defaults

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_WEBAPP_URL: &str = "https://roman.github.io/cashback/webapp/index.html";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Address the API server binds to
    pub bind_addr: String,
    /// HTTPS URL of the Mini App page
    pub webapp_url: String,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("cashback.db"),
            bind_addr: "0.0.0.0:3000".to_string(),
            webapp_url: DEFAULT_WEBAPP_URL.to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Every key is optional in the file
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    db_path: Option<PathBuf>,
    bind_addr: Option<String>,
    webapp_url: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Load configuration: env vars -> file -> defaults
    pub fn load() -> Result<Self> {
        let path = std::env::var("CASHBACK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("cashback.toml"));

        let file = load_file_config(&path)?;
        Ok(Self::resolve(file, |key| std::env::var(key).ok()))
    }

    fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        Config {
            db_path: env("CASHBACK_DB")
                .map(PathBuf::from)
                .or(file.db_path)
                .unwrap_or(defaults.db_path),
            bind_addr: env("CASHBACK_BIND")
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            webapp_url: env("CASHBACK_WEBAPP_URL")
                .or(file.webapp_url)
                .unwrap_or(defaults.webapp_url),
            log_level: env("CASHBACK_LOG")
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
        }
    }
}

/// A missing file is fine, a broken one is not
fn load_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}
