use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::EngineConfig;

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Read an engine config file. A missing file is an error; an empty one
/// yields the defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse_config(&text)?;
    tracing::debug!(path = %path.display(), "loaded engine config");
    Ok(config)
}

pub fn parse_config(text: &str) -> Result<EngineConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("promptfill.toml");
        fs::write(&path, "").unwrap();
        assert_eq!(load_config(&path).unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"[history]
limit = 50

[reconcile]
backup_suffix = "_old"

[locale]
language = "en"
"#,
        )
        .unwrap();
        assert_eq!(config.history.limit, 50);
        assert_eq!(config.history.coalesce_ms, 1000);
        assert_eq!(config.reconcile.backup_suffix, "_old");
        assert_eq!(config.reconcile.backup_label, "(backup)");
        assert_eq!(config.reconcile.rename_suffix, "system");
        assert_eq!(config.locale.language, "en");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = parse_config("[history]\nlimit = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
