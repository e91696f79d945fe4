//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/tv5.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//! admin = false
//! retry_after_secs = 5
//!
//! [search]
//! worker = true
//! ```
//!
//! Setting the environment variable `ADMIN_INSTANCE=true` turns on
//! `server.admin` regardless of the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Register the text and stopword mutation endpoints.
    #[serde(default)]
    pub admin: bool,
    /// `Retry-After` sent with pending search results.
    #[serde(default = "default_retry_after_secs")]
    pub retry_after_secs: u64,
}

fn default_retry_after_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Run submitted searches in-process. When off, tickets stay pending
    /// until another process completes them in the shared database.
    #[serde(default = "default_worker")]
    pub worker: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            worker: default_worker(),
        }
    }
}

fn default_worker() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }
    if config.server.retry_after_secs == 0 {
        anyhow::bail!("server.retry_after_secs must be >= 1");
    }

    if std::env::var("ADMIN_INSTANCE").is_ok_and(|v| v == "true") {
        config.server.admin = true;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let file = write_config(
            r#"
[db]
path = "/tmp/tv5.sqlite"

[server]
bind = "127.0.0.1:5000"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.retry_after_secs, 5);
        assert!(config.search.worker);
    }

    #[test]
    fn test_zero_retry_after_is_rejected() {
        let file = write_config(
            r#"
[db]
path = "/tmp/tv5.sqlite"

[server]
bind = "127.0.0.1:5000"
retry_after_secs = 0
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("retry_after_secs"));
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let file = write_config("[db]\npath = \"/tmp/tv5.sqlite\"\n");
        assert!(load_config(file.path()).is_err());
    }
}
