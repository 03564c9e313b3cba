//! Author identity for history records.
//!
//! The tracker never looks up "the current user" on its own. Callers build
//! an [`Author`] once (usually with [`Author::from_env`]) and pass it into
//! every mutating operation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TrackerError;

/// Longest author string the history table accepts.
pub const MAX_AUTHOR_LEN: usize = 64;

/// Who made a change. Non-empty, at most [`MAX_AUTHOR_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Author(String);

impl Author {
    pub fn new(name: impl Into<String>) -> Result<Self, TrackerError> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Malformed("author must not be empty".into()));
        }
        if name.chars().count() > MAX_AUTHOR_LEN {
            return Err(TrackerError::Malformed(format!(
                "author {name:?} is longer than {MAX_AUTHOR_LEN} characters"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// `user@host` for the current process, truncated to fit.
    pub fn from_env() -> Self {
        let user = ["USER", "LOGNAME", "USERNAME"]
            .iter()
            .find_map(|var| {
                let v = std::env::var(var).ok()?;
                let v = v.trim();
                (!v.is_empty()).then(|| v.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());
        let host = gethostname::gethostname().to_string_lossy().into_owned();

        let full = if host.is_empty() {
            user
        } else {
            format!("{user}@{host}")
        };
        Self(full.chars().take(MAX_AUTHOR_LEN).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Author {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Author::new(value)
    }
}

impl From<Author> for String {
    fn from(author: Author) -> Self {
        author.0
    }
}
