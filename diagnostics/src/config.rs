// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Diagnostics Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) for the
// diagnostics engine:
// - Fix memory capacity, lookup limit and storage file
// - Suggestion caps and confidences
// - Reflexion retry threshold, retrieval limit and storage file
// - Retry backoff for wrapped operations
// - Reflection retention

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::application::{ReflexionConfig, RetentionConfig, RetryPolicy, WorkspaceRef};
use crate::domain::SuggestionPolicy;
use crate::infrastructure::{DEFAULT_FIX_MEMORY_FILE, DEFAULT_REFLEXION_FILE};

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "DiagnosticsConfig";
pub const CONFIG_PATH_ENV: &str = "AEGIS_DIAGNOSTICS_CONFIG";

/// Upper bound for `spec.retention.max_age_days` (100 years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Top-level diagnostics configuration manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "DiagnosticsConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: DiagnosticsSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsSpec {
    #[serde(default)]
    pub fix_memory: FixMemorySettings,

    #[serde(default)]
    pub suggestions: SuggestionPolicy,

    #[serde(default)]
    pub reflexion: ReflexionSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixMemorySettings {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,

    /// Relative to the workspace root
    #[serde(default = "default_fix_memory_file")]
    pub file_name: PathBuf,
}

fn default_capacity() -> usize {
    1000
}

fn default_similar_limit() -> usize {
    5
}

fn default_fix_memory_file() -> PathBuf {
    PathBuf::from(DEFAULT_FIX_MEMORY_FILE)
}

impl Default for FixMemorySettings {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            similar_limit: default_similar_limit(),
            file_name: default_fix_memory_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflexionSettings {
    #[serde(flatten)]
    pub loop_config: ReflexionConfig,

    /// Relative to the workspace root
    #[serde(default = "default_reflexion_file")]
    pub file_name: PathBuf,
}

fn default_reflexion_file() -> PathBuf {
    PathBuf::from(DEFAULT_REFLEXION_FILE)
}

impl Default for ReflexionSettings {
    fn default() -> Self {
        Self {
            loop_config: ReflexionConfig::default(),
            file_name: default_reflexion_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_factor() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            factor: default_factor(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            factor: self.factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "aegis-diagnostics".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: DiagnosticsSpec::default(),
        }
    }
}

impl DiagnosticsConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. AEGIS_DIAGNOSTICS_CONFIG environment variable
    /// 2. ./aegis-diagnostics.yaml (working directory)
    /// 3. ~/.aegis/diagnostics.yaml (user home)
    /// 4. /etc/aegis/diagnostics.yaml (system, Unix) or C:\ProgramData\Aegis\diagnostics.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./aegis-diagnostics.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".aegis").join("diagnostics.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/aegis/diagnostics.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Aegis\\diagnostics.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            return Self::load_from(&path);
        }

        match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::load_from(&config_path)
            }
            None => {
                tracing::debug!("No configuration file found in standard locations. Using defaults.");
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }

    /// Load one file and apply environment overrides; errors name the path
    fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::from_yaml_file(path)
            .with_context(|| format!("Failed to load config at {:?}", path))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_from(&lookup, "AEGIS_FIX_MEMORY_CAPACITY", &mut self.spec.fix_memory.capacity);
        override_from(
            &lookup,
            "AEGIS_REFLEXION_MAX_ATTEMPTS",
            &mut self.spec.reflexion.loop_config.max_attempts,
        );
        override_from(&lookup, "AEGIS_RETRY_MAX_ATTEMPTS", &mut self.spec.retry.max_attempts);
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let fix_memory = &self.spec.fix_memory;
        if fix_memory.capacity == 0 {
            anyhow::bail!("spec.fix_memory.capacity must be greater than 0");
        }
        if fix_memory.similar_limit == 0 {
            anyhow::bail!("spec.fix_memory.similar_limit must be greater than 0");
        }
        if fix_memory.file_name.as_os_str().is_empty() {
            anyhow::bail!("spec.fix_memory.file_name cannot be empty");
        }

        let suggestions = &self.spec.suggestions;
        for (field, value) in [
            ("verified_confidence", suggestions.verified_confidence),
            ("unverified_confidence", suggestions.unverified_confidence),
        ] {
            if value > 100 {
                anyhow::bail!("spec.suggestions.{} must be between 0 and 100, got {}", field, value);
            }
        }

        let reflexion = &self.spec.reflexion;
        if reflexion.loop_config.max_attempts == 0 {
            anyhow::bail!("spec.reflexion.max_attempts must be greater than 0");
        }
        if !(0.0..=1.0).contains(&reflexion.loop_config.effectiveness_threshold) {
            anyhow::bail!(
                "spec.reflexion.effectiveness_threshold must be within [0, 1], got {}",
                reflexion.loop_config.effectiveness_threshold
            );
        }
        if reflexion.file_name.as_os_str().is_empty() {
            anyhow::bail!("spec.reflexion.file_name cannot be empty");
        }

        let retry = &self.spec.retry;
        if retry.max_attempts == 0 {
            anyhow::bail!("spec.retry.max_attempts must be greater than 0");
        }
        if retry.factor < 1.0 {
            anyhow::bail!("spec.retry.factor must be at least 1.0, got {}", retry.factor);
        }
        if retry.base_delay_ms > retry.max_delay_ms {
            anyhow::bail!(
                "spec.retry.base_delay_ms ({}) cannot exceed max_delay_ms ({})",
                retry.base_delay_ms,
                retry.max_delay_ms
            );
        }

        let retention = &self.spec.retention;
        if !(0.0..=1.0).contains(&retention.min_effectiveness) {
            anyhow::bail!(
                "spec.retention.min_effectiveness must be within [0, 1], got {}",
                retention.min_effectiveness
            );
        }
        if retention.max_age_days <= 0 || retention.max_age_days > MAX_RETENTION_DAYS {
            anyhow::bail!(
                "spec.retention.max_age_days must be between 1 and {}, got {}",
                MAX_RETENTION_DAYS,
                retention.max_age_days
            );
        }
        if retention.interval_seconds == 0 {
            anyhow::bail!("spec.retention.interval_seconds must be greater than 0");
        }

        Ok(())
    }

    pub fn fix_memory_path(&self, workspace: &WorkspaceRef) -> PathBuf {
        workspace.root().join(&self.spec.fix_memory.file_name)
    }

    pub fn reflexion_path(&self, workspace: &WorkspaceRef) -> PathBuf {
        workspace.root().join(&self.spec.reflexion.file_name)
    }
}

fn override_from<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T)
where
    T: FromStr,
    T::Err: Display,
{
    let Some(val) = lookup(name) else {
        return;
    };
    match val.trim().parse::<T>() {
        Ok(parsed) => {
            tracing::info!("Environment override: {}={}", name, val.trim());
            *target = parsed;
        }
        Err(e) => {
            tracing::warn!("Invalid value for {}: '{}' ({}). Ignoring.", name, val, e);
        }
    }
}
