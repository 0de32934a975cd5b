//! Engine configuration loading and defaults

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Tunables for the stream engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Per-request response timeout in milliseconds; 0 disables the bound
    /// and restores the legacy wait-forever behavior
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    2500
}

impl EngineOptions {
    /// Timeout applied around each awaited response, if any
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_timeout_ms))
        }
    }
}

/// Load engine options from a TOML file, falling back to defaults when
/// the file does not exist
pub fn load_options(path: &Path) -> Result<EngineOptions> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let options: EngineOptions = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded engine options");
        Ok(options)
    } else {
        info!(
            path = %path.display(),
            "Options file not found, using defaults"
        );
        Ok(EngineOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.request_timeout_ms, 2500);
        assert_eq!(
            options.request_timeout(),
            Some(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_zero_disables_timeout() {
        let options = EngineOptions {
            request_timeout_ms: 0,
        };
        assert_eq!(options.request_timeout(), None);
    }

    #[test]
    fn test_parse_toml() {
        let options: EngineOptions = toml::from_str("request_timeout_ms = 100").unwrap();
        assert_eq!(options.request_timeout_ms, 100);

        // missing fields fall back to defaults
        let options: EngineOptions = toml::from_str("").unwrap();
        assert_eq!(options.request_timeout_ms, 2500);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "request_timeout_ms = 750").unwrap();

        let options = load_options(&path).unwrap();
        assert_eq!(options.request_timeout_ms, 750);

        // missing file yields defaults
        let options = load_options(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(options.request_timeout_ms, 2500);
    }
}
