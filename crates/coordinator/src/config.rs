//! Coordinator configuration.
//!
//! Loaded from TOML. On Unix the file permissions are validated before
//! parsing since the file may carry API keys.

use quorum_llm::{ModelConfig, RetryConfig};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Display name for status reports.
    #[serde(default = "default_name")]
    pub name: String,

    /// Registry capacity.
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,

    /// Whether `add_task` attempts generative routing before the keyword
    /// fallback. Per-task overrides can still disable it.
    #[serde(default = "default_true")]
    pub smart_routing: bool,

    /// Turn bound for team round-robin sessions.
    #[serde(default = "default_max_team_turns")]
    pub max_team_turns: usize,

    pub model: ModelConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub access_token: String,
}

fn default_name() -> String {
    "quorum".into()
}

fn default_max_agents() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_team_turns() -> usize {
    6
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_agents: default_max_agents(),
            smart_routing: true,
            max_team_turns: default_max_team_turns(),
            model: ModelConfig {
                provider: "openai".into(),
                model: "gpt-4o".into(),
                api_key: None,
                api_url: None,
                temperature: Some(0.2),
                max_tokens: None,
                timeout_ms: 30_000,
                retry: RetryConfig::default(),
            },
            search: None,
            mail: None,
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from a TOML file, validating permissions on Unix.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        #[cfg(unix)]
        validate_config_file_permissions(path)?;

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        if config.model.api_key.is_some() {
            warn!(
                "API key found in config file '{}'. Prefer environment variables \
                 (OPENAI_API_KEY, GEMINI_API_KEY).",
                path.display()
            );
        }

        Ok(config)
    }

    /// Load without permission checks, for tests and pre-validated paths.
    pub fn from_file_unchecked(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Model config with the API key resolved from the environment when the
    /// file did not carry one.
    pub fn resolved_model(&self) -> ModelConfig {
        let mut model = self.model.clone();
        if model.api_key.as_deref().map_or(true, str::is_empty) {
            let env_var = match model.provider.as_str() {
                "openai" => Some("OPENAI_API_KEY"),
                "gemini" => Some("GEMINI_API_KEY"),
                _ => None,
            };
            if let Some(var) = env_var {
                model.api_key = std::env::var(var).ok();
            }
        }
        model
    }
}

/// Requirements: a regular file, not world-writable, and not world-readable
/// when it contains an API key.
#[cfg(unix)]
fn validate_config_file_permissions(path: &std::path::Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

    if !metadata.is_file() {
        anyhow::bail!(
            "Config path '{}' is not a regular file",
            path.display()
        );
    }

    let mode = metadata.permissions().mode();
    let permission_bits = mode & 0o777;

    if permission_bits & 0o002 != 0 {
        anyhow::bail!(
            "Config file '{}' is world-writable (mode {:04o}). Fix with: chmod o-w {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    let content = std::fs::read_to_string(path).unwrap_or_default();
    let has_api_key =
        content.contains("api_key") && (content.contains("sk-") || content.contains("key ="));

    if has_api_key && permission_bits & 0o004 != 0 {
        anyhow::bail!(
            "Config file '{}' contains an API key but is world-readable (mode {:04o}). \
             Fix with: chmod 600 {}",
            path.display(),
            permission_bits,
            path.display()
        );
    }

    if has_api_key && permission_bits & 0o040 != 0 {
        warn!(
            "Config file '{}' contains an API key and is group-readable (mode {:04o}).",
            path.display(),
            permission_bits
        );
    }

    Ok(())
}
