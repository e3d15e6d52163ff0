//! The `~/.venturer/config.json` settings file.
//!
//! Environment variables take precedence over the file:
//! - `VT_LLM_ENDPOINT` - chat completions base URL (default: `https://api.openai.com/v1`)
//! - `VT_LLM_MODEL` - model name (default: `gpt-4o-mini`)
//! - `VT_LLM_API_KEY` - bearer key sent to the endpoint
//! - `VT_LLM_TIMEOUT` - request timeout in seconds (default: 60)
//! - `VT_BIND` - server bind address (default: `127.0.0.1:8787`)

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transfer::file::atomic_write;

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND: &str = "127.0.0.1:8787";

/// Chat model connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl LlmSettings {
    #[must_use]
    pub fn endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string())
    }

    #[must_use]
    pub fn model(&self) -> String {
        self.model.clone().unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string())
    }

    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

impl ServerSettings {
    /// Parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the address doesn't parse.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let raw = self.bind.as_deref().unwrap_or(DEFAULT_BIND);
        raw.parse()
            .map_err(|e| Error::Config(format!("Invalid bind address '{raw}': {e}")))
    }
}

/// Everything in `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VtConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Keys accepted by `vt config set`.
pub const SETTABLE_KEYS: &[&str] = &[
    "default_user",
    "llm.endpoint",
    "llm.model",
    "llm.api_key",
    "llm.timeout_secs",
    "server.bind",
];

impl VtConfig {
    /// Set one dotted key. An empty value clears it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` for unknown keys or bad numbers.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let text = (!value.is_empty()).then(|| value.to_string());
        match key {
            "default_user" => self.default_user = text.map(|v| v.to_lowercase()),
            "llm.endpoint" => self.llm.endpoint = text,
            "llm.model" => self.llm.model = text,
            "llm.api_key" => self.llm.api_key = text,
            "llm.timeout_secs" => {
                self.llm.timeout_secs = text
                    .map(|v| {
                        v.parse::<u64>().map_err(|_| {
                            Error::InvalidArgument(format!("llm.timeout_secs must be a number, got '{v}'"))
                        })
                    })
                    .transpose()?;
            }
            "server.bind" => {
                if let Some(v) = &text {
                    v.parse::<SocketAddr>().map_err(|e| {
                        Error::InvalidArgument(format!("server.bind must be host:port ({e})"))
                    })?;
                }
                self.server.bind = text;
            }
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Unknown config key '{other}' (expected one of: {})",
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Apply environment overrides on top of the file values.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        if let Some(v) = var("VT_LLM_ENDPOINT") {
            self.llm.endpoint = Some(v);
        }
        if let Some(v) = var("VT_LLM_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = var("VT_LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = var("VT_LLM_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = Some(v);
        }
        if let Some(v) = var("VT_BIND") {
            self.server.bind = Some(v);
        }
        self
    }

    /// Copy safe to print: the API key is masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if let Some(key) = &copy.llm.api_key {
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            copy.llm.api_key = Some(format!("****{tail}"));
        }
        copy
    }
}

/// Path of the settings file.
///
/// # Errors
///
/// Returns `Error::Config` if the home directory can't be determined.
pub fn config_path() -> Result<PathBuf> {
    super::venturer_home()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Read settings from `path`; a missing file gives defaults.
///
/// # Errors
///
/// Returns `Error::Config` if the file exists but can't be read or parsed.
pub fn load_from(path: &Path) -> Result<VtConfig> {
    if !path.exists() {
        return Ok(VtConfig::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Write settings to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_to(path: &Path, config: &VtConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    atomic_write(path, &content)
}

/// File settings with environment overrides applied.
///
/// # Errors
///
/// Returns `Error::Config` if the file is unreadable.
pub fn load_config() -> Result<VtConfig> {
    Ok(load_from(&config_path()?)?.with_env())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_from(&temp.path().join("config.json")).unwrap();
        assert_eq!(config, VtConfig::default());
        assert_eq!(config.llm.model(), DEFAULT_LLM_MODEL);
        assert_eq!(config.server.bind_addr().unwrap().port(), 8787);
    }

    #[test]
    fn test_set_save_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");

        let mut config = VtConfig::default();
        config.set("default_user", "Ana@Acme.io").unwrap();
        config.set("llm.timeout_secs", "15").unwrap();
        config.set("server.bind", "0.0.0.0:9000").unwrap();
        save_to(&path, &config).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.default_user.as_deref(), Some("ana@acme.io"));
        assert_eq!(loaded.llm.timeout_secs(), 15);

        let mut cleared = loaded;
        cleared.set("default_user", "").unwrap();
        assert!(cleared.default_user.is_none());
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = VtConfig::default();
        assert!(config.set("llm.colour", "x").is_err());
        assert!(config.set("llm.timeout_secs", "soon").is_err());
        assert!(config.set("server.bind", "localhost").is_err());
    }

    #[test]
    fn test_redacted_masks_key() {
        let mut config = VtConfig::default();
        config.set("llm.api_key", "sk-123456789").unwrap();
        assert_eq!(config.redacted().llm.api_key.as_deref(), Some("****6789"));
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_from(&path), Err(Error::Config(_))));
    }
}
