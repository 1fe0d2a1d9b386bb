//! Credential resolution.
//!
//! Each place a secret can live is a [`SecretSource`]. A [`CredentialResolver`]
//! asks its sources in order and keeps the first non-empty, trimmed value.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ApiKeys;

/// A named secret and the keys it may be stored under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialSpec {
    /// Human-readable name
    pub name: &'static str,
    /// Keys accepted in the secrets file and environment, preferred first
    pub keys: &'static [&'static str],
    /// Field in the config file's `[api_keys]` table
    pub config_field: &'static str,
}

/// Key for the hosted model (Gemini)
pub const MODEL_KEY: CredentialSpec = CredentialSpec {
    name: "model API key",
    keys: &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
    config_field: "gemini",
};

/// Key for the web search provider (Tavily)
pub const SEARCH_KEY: CredentialSpec = CredentialSpec {
    name: "search API key",
    keys: &["TAVILY_API_KEY"],
    config_field: "tavily",
};

/// A resolved secret. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    name: &'static str,
    value: String,
}

impl Credential {
    /// The secret itself
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Credential resolution errors
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Missing {name}: no value for {keys} found in {searched}\n\nSuggestion: {suggestion}")]
    Missing {
        name: &'static str,
        keys: String,
        searched: String,
        suggestion: String,
    },
}

impl CredentialError {
    fn missing(spec: &CredentialSpec, searched: Vec<String>) -> Self {
        let primary = spec.keys.first().copied().unwrap_or(spec.name);
        CredentialError::Missing {
            name: spec.name,
            keys: spec.keys.join(" or "),
            searched: searched.join(", "),
            suggestion: format!(
                "add {} = \"...\" to the secrets file, export {}=your-key, or set [api_keys] {} in the config file (examprep --init-config)",
                primary, primary, spec.config_field
            ),
        }
    }
}

/// One place a secret may live
pub trait SecretSource {
    /// Where this source reads from, for error messages
    fn describe(&self) -> String;

    /// Raw value for `spec`, if this source has one
    fn lookup(&self, spec: &CredentialSpec) -> Option<String>;
}

/// Flat TOML table of deployment secrets
pub struct SecretsFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl SecretsFile {
    /// Read `path`. A missing file is an empty source; a malformed one is
    /// reported and treated as empty.
    pub fn load(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(content) => parse_secrets(&content).unwrap_or_else(|e| {
                eprintln!(
                    "Warning: Failed to parse secrets file {}: {}",
                    path.display(),
                    e
                );
                HashMap::new()
            }),
            Err(e) => {
                tracing::debug!("No secrets file at {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            path: path.to_path_buf(),
            values,
        }
    }
}

fn parse_secrets(content: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let table: HashMap<String, toml::Value> = toml::from_str(content)?;
    Ok(table
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect())
}

impl SecretSource for SecretsFile {
    fn describe(&self) -> String {
        format!("secrets file {}", self.path.display())
    }

    fn lookup(&self, spec: &CredentialSpec) -> Option<String> {
        spec.keys.iter().find_map(|k| self.values.get(*k).cloned())
    }
}

/// Environment variables, read through an injectable lookup
pub struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

/// The real process environment
pub fn process_env() -> EnvSource<fn(&str) -> Option<String>> {
    EnvSource::new(env_var as fn(&str) -> Option<String>)
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

impl<F> SecretSource for EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn describe(&self) -> String {
        "environment".to_string()
    }

    fn lookup(&self, spec: &CredentialSpec) -> Option<String> {
        spec.keys
            .iter()
            .filter_map(|k| (self.lookup)(k))
            .find(|v| !v.trim().is_empty())
    }
}

/// The config file's `[api_keys]` table
pub struct ConfigKeys {
    keys: ApiKeys,
}

impl ConfigKeys {
    pub fn new(keys: &ApiKeys) -> Self {
        Self { keys: keys.clone() }
    }
}

impl SecretSource for ConfigKeys {
    fn describe(&self) -> String {
        "config file [api_keys]".to_string()
    }

    fn lookup(&self, spec: &CredentialSpec) -> Option<String> {
        match spec.config_field {
            "gemini" => self.keys.gemini.clone(),
            "tavily" => self.keys.tavily.clone(),
            _ => None,
        }
    }
}

/// Ordered list of secret sources
#[derive(Default)]
pub struct CredentialResolver {
    sources: Vec<Box<dyn SecretSource>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority source
    pub fn with(mut self, source: impl SecretSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    /// First non-empty, trimmed value across all sources
    pub fn resolve(&self, spec: &CredentialSpec) -> Option<Credential> {
        self.sources.iter().find_map(|source| {
            let value = source.lookup(spec)?;
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            tracing::debug!("Resolved {} from {}", spec.name, source.describe());
            Some(Credential {
                name: spec.name,
                value: value.to_string(),
            })
        })
    }

    /// Like [`resolve`](Self::resolve), but absence is an error naming every
    /// place searched
    pub fn require(&self, spec: &CredentialSpec) -> Result<Credential, CredentialError> {
        self.resolve(spec).ok_or_else(|| {
            CredentialError::missing(spec, self.sources.iter().map(|s| s.describe()).collect())
        })
    }
}
