use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Author, TrackerError};

/// Tracker configuration.
///
/// Front ends read this from a TOML file or from `--key=value` arguments,
/// then hand the resolved store path and author to the tracker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory holding the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file.
    /// Defaults to `{data_dir}/nodedb.sqlite` if not specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Author recorded in history entries.
    /// Defaults to `user@host` if not specified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl TrackerConfig {
    /// Load config from disk, or return default if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self, TrackerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Internal(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| TrackerError::Malformed(format!("config {}: {e}", path.display())))
    }

    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--data-dir=PATH`
    /// - `--db=PATH`
    /// - `--user=NAME`
    pub fn from_args(args: &[String]) -> Self {
        let mut config = TrackerConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--data-dir=") {
                config.data_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--db=") {
                config.db_path = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--user=") {
                config.author = Some(val.to_string());
            }
        }

        config
    }

    /// Values set in `other` win.
    pub fn merge(mut self, other: TrackerConfig) -> Self {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.db_path.is_some() {
            self.db_path = other.db_path;
        }
        if other.author.is_some() {
            self.author = other.author;
        }
        self
    }

    /// Resolve the SQLite database path, falling back to `{data_dir}/nodedb.sqlite`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            self.data_dir
                .as_ref()
                .map(|d| d.join("nodedb.sqlite"))
                .unwrap_or_else(|| PathBuf::from("nodedb.sqlite"))
        })
    }

    /// Configured author, or `user@host`.
    pub fn resolve_author(&self) -> Result<Author, TrackerError> {
        match &self.author {
            Some(name) => Author::new(name.clone()),
            None => Ok(Author::from_env()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--data-dir=/tmp/nodedb".to_string(),
            "--user=dvw".to_string(),
            "--ignored".to_string(),
        ];
        let config = TrackerConfig::from_args(&args);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/nodedb")));
        assert_eq!(config.author.as_deref(), Some("dvw"));
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn test_resolve_defaults() {
        let config = TrackerConfig {
            data_dir: Some(PathBuf::from("/data")),
            ..Default::default()
        };
        assert_eq!(config.resolve_db_path(), PathBuf::from("/data/nodedb.sqlite"));
        assert_eq!(TrackerConfig::default().resolve_db_path(), PathBuf::from("nodedb.sqlite"));

        let explicit = TrackerConfig {
            db_path: Some(PathBuf::from("/srv/hw.db")),
            ..config
        };
        assert_eq!(explicit.resolve_db_path(), PathBuf::from("/srv/hw.db"));
    }

    #[test]
    fn test_resolve_author() {
        let config = TrackerConfig {
            author: Some("ops@site".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_author().unwrap().as_str(), "ops@site");

        let bad = TrackerConfig {
            author: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(bad.resolve_author(), Err(TrackerError::Malformed(_))));
    }

    #[test]
    fn test_load_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodedb.toml");
        assert_eq!(TrackerConfig::load(&path).unwrap(), TrackerConfig::default());

        std::fs::write(&path, "data_dir = \"/var/lib/nodedb\"\nauthor = \"file@host\"\n").unwrap();
        let file = TrackerConfig::load(&path).unwrap();
        assert_eq!(file.data_dir, Some(PathBuf::from("/var/lib/nodedb")));

        let merged = file.merge(TrackerConfig::from_args(&["--user=cli@host".to_string()]));
        assert_eq!(merged.author.as_deref(), Some("cli@host"));
        assert_eq!(merged.data_dir, Some(PathBuf::from("/var/lib/nodedb")));

        std::fs::write(&path, "data_dir = [").unwrap();
        assert!(matches!(TrackerConfig::load(&path), Err(TrackerError::Malformed(_))));
    }
}
