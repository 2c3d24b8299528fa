use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Default value functions for serde
fn default_regex_size_limit() -> usize {
    10 * (1 << 20)
}

fn default_max_file_size_bytes() -> u64 {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodemaskConfig {
    /// Where the rule list is persisted (defaults to the platform data dir)
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub folder: FolderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for a compiled regex rule, in bytes.
    /// Regex rules that exceed it are reported as invalid and skipped;
    /// literal rules are never subject to it.
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regex_size_limit: default_regex_size_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Visit dot-files and dot-directories
    #[serde(default)]
    pub include_hidden: bool,
    /// Files larger than this are skipped
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            max_file_size_bytes: default_max_file_size_bytes(),
            follow_symlinks: false,
        }
    }
}

impl CodemaskConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CodemaskConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {p}: {e}");
                eprintln!("⚠️  Failed to load config from {}, using defaults", p);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
