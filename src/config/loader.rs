//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ShutdownConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<ShutdownConfig, ConfigError> {
    let config: ShutdownConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ShutdownConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{ClosePolicy, SignalKind};
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
policy = "force-sync"
signals = ["interrupt"]
timeout_ms = 1500

[logging]
level = "graceful_shutdown=debug"
json = true
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.policy, ClosePolicy::ForceSync);
        assert_eq!(config.signals, vec![SignalKind::Interrupt]);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert!(config.logging.json);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.policy, ClosePolicy::Async);
        assert_eq!(config.signals, SignalKind::DEFAULT.to_vec());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_unknown_policy_is_parse_error() {
        assert!(matches!(
            parse_config(r#"policy = "later""#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config("signals = []").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("at least one signal"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
