use serde::{Deserialize, Serialize};

/// Engine configuration, usually read from `promptfill.toml`.
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub locale: LocaleConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undo entries kept per template
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    /// Typing edits closer together than this collapse into one undo step
    #[serde(default = "default_coalesce_ms")]
    pub coalesce_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            limit: default_history_limit(),
            coalesce_ms: default_coalesce_ms(),
        }
    }
}

fn default_history_limit() -> usize {
    500
}

fn default_coalesce_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Appended to the id of a backup copy of a system template
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
    /// Appended to the display name of a backup copy
    #[serde(default = "default_backup_label")]
    pub backup_label: String,
    /// Used to build `<key>_<rename_suffix>` when a system bank key collides
    /// with a user-created one
    #[serde(default = "default_rename_suffix")]
    pub rename_suffix: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            backup_suffix: default_backup_suffix(),
            backup_label: default_backup_label(),
            rename_suffix: default_rename_suffix(),
        }
    }
}

fn default_backup_suffix() -> String {
    "_backup".to_string()
}

fn default_backup_label() -> String {
    "(backup)".to_string()
}

fn default_rename_suffix() -> String {
    "system".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Language a new session edits and renders
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        LocaleConfig {
            language: default_language(),
        }
    }
}

fn default_language() -> String {
    "cn".to_string()
}
