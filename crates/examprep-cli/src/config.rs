//! Configuration file support

use examprep_agent::ResearchMode;
use examprep_search::SearchMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the deployment secrets file, relative to the working directory
pub const DEFAULT_SECRETS_FILE: &str = ".examprep/secrets.toml";

/// Configuration for examprep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini model id
    pub model: Option<String>,
    /// How research reaches the model (prefetch, tool, off)
    pub research: Option<ResearchMode>,
    /// Search answer style (results, answer)
    pub search_mode: Option<SearchMode>,
    /// Title/snippet pairs per search (3-5)
    pub max_results: Option<usize>,
    /// Tool-call rounds allowed per turn in tool mode
    pub max_tool_rounds: Option<u32>,
    /// Deployment secrets file
    pub secrets_file: Option<String>,
    /// API keys (lowest-priority credential source)
    #[serde(default)]
    pub api_keys: ApiKeys,
}

/// API key configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub gemini: Option<String>,
    pub tavily: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examprep")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("EXAMPREP_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default path
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`; a missing or malformed file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
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

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
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

        Self::starter().save_to(&path)?;
        Ok(path)
    }

    fn starter() -> Self {
        Config {
            model: Some(examprep_ai::models::DEFAULT_MODEL_ID.to_string()),
            research: Some(ResearchMode::default()),
            search_mode: Some(SearchMode::default()),
            max_results: Some(examprep_search::MIN_RESULTS),
            max_tool_rounds: Some(examprep_agent::session::DEFAULT_MAX_TOOL_ROUNDS),
            secrets_file: None,
            api_keys: ApiKeys::default(),
        }
    }

    /// Secrets file to read, CLI override first
    pub fn secrets_path(&self, cli_override: Option<&str>) -> PathBuf {
        PathBuf::from(
            cli_override
                .or(self.secrets_file.as_deref())
                .unwrap_or(DEFAULT_SECRETS_FILE),
        )
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# examprep configuration file
# Place at ~/.config/examprep/config.toml (Linux), ~/Library/Application Support/examprep/config.toml (Mac)
# or %APPDATA%\examprep\config.toml (Windows). EXAMPREP_CONFIG_PATH overrides the location.

# Gemini model to use
model = "gemini-2.0-flash"

# How web research reaches the model:
#   prefetch - search the topic first and put the results in the prompt
#   tool     - let the model call search_web itself
#   off      - no search; answers come from the model's own knowledge
research = "prefetch"

# Search answer style: "results" (title/snippet list) or "answer" (one short answer)
search_mode = "results"

# Title/snippet pairs per search (3-5)
max_results = 3

# Tool-call rounds allowed per turn when research = "tool"
max_tool_rounds = 8

# Deployment secrets file (flat TOML: GEMINI_API_KEY = "...", TAVILY_API_KEY = "...")
# secrets_file = ".examprep/secrets.toml"

# API keys (optional, checked after the secrets file and the environment)
[api_keys]
# gemini = "..."
# tavily = "tvly-..."
"#
}
