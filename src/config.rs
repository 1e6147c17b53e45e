//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Unknown keys are rejected to catch typos early.

use crate::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MAX_READ_DEPTH, Error, INTERACTIVE_NAMESPACE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Filter directive for log output, e.g. `"warn"` or `"stackrpl=debug"`
    pub log_filter: String,
    pub display: DisplayOptions,
    pub limits: Limits,
    pub session: SessionOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_filter: "warn".to_owned(),
            display: DisplayOptions::default(),
            limits: Limits::default(),
            session: SessionOptions::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        toml::from_str(text).map_err(|e| Error::failed(format!("invalid configuration: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::failed(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// How many elements are shown before a rendering is elided with `...`.
/// `None` means no limit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayOptions {
    pub max_list_items: Option<usize>,
    pub max_program_items: Option<usize>,
}

impl DisplayOptions {
    /// The canonical, re-parseable rendering used for saving values
    pub const fn unlimited() -> Self {
        DisplayOptions {
            max_list_items: None,
            max_program_items: None,
        }
    }
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            max_list_items: Some(32),
            max_program_items: Some(24),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub max_call_depth: usize,
    pub max_read_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_read_depth: DEFAULT_MAX_READ_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionOptions {
    /// Namespace the session starts in
    pub namespace: String,
    pub history_file: Option<PathBuf>,
    /// Directories searched by `import`
    pub import_paths: Vec<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            namespace: INTERACTIVE_NAMESPACE.to_owned(),
            history_file: Some(PathBuf::from(".stackrpl_history")),
            import_paths: vec![PathBuf::from(".")],
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            log_filter = "stackrpl=debug"
            [display]
            max_list_items = 4
            [session]
            namespace = "work"
            import_paths = ["lib", "/usr/share/stackrpl"]
            "#,
        )
        .unwrap();

        assert_eq!(config.log_filter, "stackrpl=debug");
        assert_eq!(config.display.max_list_items, Some(4));
        assert_eq!(config.display.max_program_items, Some(24));
        assert_eq!(config.limits, Limits::default());
        assert_eq!(config.session.namespace, "work");
        assert_eq!(
            config.session.import_paths,
            vec![PathBuf::from("lib"), PathBuf::from("/usr/share/stackrpl")]
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Config::from_toml_str("[limits]\nmax_depth = 3\n").unwrap_err();
        assert!(err.to_string().contains("invalid configuration"), "{err}");
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Config::load(Path::new("/nonexistent/stackrpl.toml")).unwrap_err();
        assert!(matches!(err, Error::OperationFailed(_)));
    }
}
