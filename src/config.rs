use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen_addr: String,
    /// Seconds a connection may sit idle before it is closed
    pub timeout_secs: u64,
    pub content_root: PathBuf,
    /// Seconds in-flight connections get to finish on shutdown
    pub shutdown_grace_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8001".to_string(),
            timeout_secs: 15,
            content_root: PathBuf::from("content"),
            shutdown_grace_secs: 5,
        }
    }
}

impl Config {
    /// Reads a YAML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Applies environment overrides using `lookup` to read variables.
    ///
    /// A `TIMEOUT` that is not a whole number of seconds is ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("LISTEN") {
            self.listen_addr = addr;
        }
        if let Some(timeout) = lookup("TIMEOUT") {
            match timeout.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid TIMEOUT"),
            }
        }
        if let Some(root) = lookup("CONTENT_ROOT") {
            self.content_root = PathBuf::from(root);
        }
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
