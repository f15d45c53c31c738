//! Configuration for the wordlink engine.
//!
//! Maps directly to `wordlink.toml`. Every field has a default, so an empty
//! file is a valid configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordlinkConfig {
    /// Where the content document lives.
    #[serde(default)]
    pub content: ContentConfig,
    /// Unlock rules.
    #[serde(default)]
    pub progression: ProgressionConfig,
    /// Save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl WordlinkConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `WordlinkError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::WordlinkError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Content source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Path to the JSON content document.
    #[serde(default = "default_content_path")]
    pub path: PathBuf,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
        }
    }
}

/// Unlock rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Only the first level starts open; each first completion opens the next.
    #[serde(default = "default_true")]
    pub sequential_levels: bool,
    /// Accept placements into slots of locked sections.
    #[serde(default)]
    pub allow_locked_targets: bool,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            sequential_levels: true,
            allow_locked_targets: false,
        }
    }
}

/// Storage backend for saved progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `SQLite` database, one row per profile.
    Sqlite,
    /// A single JSON file, written atomically.
    Json,
    /// Process memory only; nothing survives exit.
    Memory,
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Which backend stores progress.
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    /// Database or file path.
    #[serde(default = "default_save_path")]
    pub path: PathBuf,
    /// Save slot name inside the backend.
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Use WAL mode for the `SQLite` backend.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Number of rotating backups taken before a full reset.
    #[serde(default = "default_3")]
    pub backup_count: u32,
    /// Save after every mutating command. When off, callers `flush()`.
    #[serde(default = "default_true")]
    pub autosave: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Sqlite,
            path: default_save_path(),
            profile: default_profile(),
            wal_mode: true,
            checksum_enabled: true,
            backup_count: 3,
            autosave: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_3() -> u32 { 3 }
fn default_backend() -> BackendKind { BackendKind::Sqlite }
fn default_content_path() -> PathBuf { PathBuf::from("content/levels.json") }
fn default_save_path() -> PathBuf { PathBuf::from("wordlink_progress.db") }
fn default_profile() -> String { "default".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = WordlinkConfig::from_toml("").expect("parse");
        assert!(config.progression.sequential_levels);
        assert!(!config.progression.allow_locked_targets);
        assert_eq!(config.persistence.backend, BackendKind::Sqlite);
        assert_eq!(config.persistence.profile, "default");
        assert!(config.persistence.autosave);
    }

    #[test]
    fn partial_sections_override_selected_fields() {
        let config = WordlinkConfig::from_toml(
            r#"
            [progression]
            sequential_levels = false

            [persistence]
            backend = "json"
            path = "save.json"
            autosave = false
            "#,
        )
        .expect("parse");
        assert!(!config.progression.sequential_levels);
        assert_eq!(config.persistence.backend, BackendKind::Json);
        assert_eq!(config.persistence.path, PathBuf::from("save.json"));
        assert!(!config.persistence.autosave);
        assert_eq!(config.persistence.backup_count, 3);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let err = WordlinkConfig::from_toml("[persistence]\nbackend = \"floppy\"").expect_err("bad");
        assert!(matches!(err, crate::WordlinkError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("wordlink.toml");
        std::fs::write(&path, "[content]\npath = \"levels.json\"\n").expect("write");
        let config = WordlinkConfig::from_file(&path).expect("load");
        assert_eq!(config.content.path, PathBuf::from("levels.json"));
    }
}
