//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Largest file accepted by `/attach` unless configured otherwise (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Configuration for signbot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Assistant to chat with
    pub assistant_id: Option<String>,
    /// API key (prefer OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Platform base URL, e.g. a proxy
    pub base_url: Option<String>,
    /// Wall-clock limit for one reply, tool calls included
    pub run_timeout_secs: Option<u64>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Largest file accepted by `/attach`
    pub max_upload_bytes: Option<u64>,
    /// Where logs go in TUI mode
    pub log_file: Option<String>,
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Local function settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Offer `get_location` to the assistant
    pub location: Option<bool>,
    /// IP geolocation endpoint used by `get_location`
    pub location_endpoint: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("signbot")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SIGNBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Default log file location for TUI mode
    pub fn default_log_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("signbot")
            .join("signbot.log")
    }

    /// Parse config file contents
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            tui: Some(true),
            run_timeout_secs: Some(300),
            max_upload_bytes: Some(DEFAULT_MAX_UPLOAD_BYTES),
            tools: ToolsConfig {
                location: Some(false),
                location_endpoint: None,
            },
            ..Default::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// API key: flag, then `OPENAI_API_KEY`, then this file
    pub fn resolve_api_key(&self, flag: Option<String>) -> Option<String> {
        pick(flag, env_var("OPENAI_API_KEY"), self.api_key.clone())
    }

    /// Assistant id: flag, then `SIGNBOT_ASSISTANT_ID`, then this file
    pub fn resolve_assistant_id(&self, flag: Option<String>) -> Option<String> {
        pick(flag, env_var("SIGNBOT_ASSISTANT_ID"), self.assistant_id.clone())
    }

    /// Base URL: flag, then `OPENAI_BASE_URL`, then this file
    pub fn resolve_base_url(&self, flag: Option<String>) -> Option<String> {
        pick(flag, env_var("OPENAI_BASE_URL"), self.base_url.clone())
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Endpoint for `get_location`, or `None` when the tool is off
    pub fn location_endpoint(&self) -> Option<&str> {
        if !self.tools.location.unwrap_or(false) {
            return None;
        }
        Some(
            self.tools
                .location_endpoint
                .as_deref()
                .unwrap_or(signbot_core::tools::DEFAULT_LOCATION_ENDPOINT),
        )
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// First present value, in precedence order
fn pick(flag: Option<String>, env: Option<String>, file: Option<String>) -> Option<String> {
    flag.or(env).or(file)
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# signbot configuration file
# Place at ~/.config/signbot/config.toml (Linux) or set SIGNBOT_CONFIG_PATH

# Assistant to chat with (or SIGNBOT_ASSISTANT_ID)
# assistant_id = "asst_..."

# API key (optional - OPENAI_API_KEY is preferred)
# api_key = "sk-..."

# Platform base URL (or OPENAI_BASE_URL)
# base_url = "https://api.openai.com/v1"

# Seconds to wait for one reply, tool calls included
run_timeout_secs = 300

# Whether to use TUI mode by default (true by default)
# Set to false for simple stdin/stdout mode
tui = true

# Largest file accepted by /attach, in bytes
max_upload_bytes = 20971520

# Log file for TUI mode
# log_file = "~/.local/share/signbot/signbot.log"

[tools]
# Let the assistant look up the device's approximate location by IP
location = false
# location_endpoint = "http://ip-api.com/json"
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(example_config()).unwrap();
        assert_eq!(config.run_timeout_secs, Some(300));
        assert_eq!(config.tui, Some(true));
        assert_eq!(config.max_upload_bytes(), DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.location_endpoint().is_none());
    }

    #[test]
    fn test_missing_keys_default() {
        let config = Config::parse("assistant_id = \"asst_1\"").unwrap();
        assert_eq!(config.assistant_id.as_deref(), Some("asst_1"));
        assert!(config.api_key.is_none());
        assert_eq!(config.max_upload_bytes(), DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_location_tool_endpoint() {
        let config = Config::parse("[tools]\nlocation = true\n").unwrap();
        assert_eq!(
            config.location_endpoint(),
            Some(signbot_core::tools::DEFAULT_LOCATION_ENDPOINT)
        );

        let config =
            Config::parse("[tools]\nlocation = true\nlocation_endpoint = \"http://geo.local\"\n")
                .unwrap();
        assert_eq!(config.location_endpoint(), Some("http://geo.local"));
    }

    #[test]
    fn test_precedence() {
        let from = |s: &str| Some(s.to_string());
        assert_eq!(pick(from("flag"), from("env"), from("file")), from("flag"));
        assert_eq!(pick(None, from("env"), from("file")), from("env"));
        assert_eq!(pick(None, None, from("file")), from("file"));
        assert_eq!(pick(None, None, None), None);
    }
}
