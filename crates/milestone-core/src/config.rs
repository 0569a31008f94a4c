//! Milestone definitions loaded from YAML.
//!
//! The milestone file is either a top-level list or a mapping with a
//! `milestones` key holding the list:
//!
//! ```yaml
//! - description: first creep spawned
//!   check: { creeps: 1 }
//!   tick: 50
//!   required: true
//! ```
//!
//! Entries are decoded one at a time. A malformed entry (unknown status
//! field, wrong types, missing deadline) is logged and skipped so one typo
//! does not discard the rest of the file. A file that cannot be read or is
//! not a list at all falls back to [`default_milestones`].

use std::collections::BTreeMap;
use std::path::Path;

use milestone_types::{Milestone, StatusField};
use tracing::{info, warn};

/// Errors that can occur when loading milestone definitions.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the milestone file from disk.
    #[error("failed to read milestone file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse milestone YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The document is valid YAML but holds no milestone list.
    #[error("milestone file must be a list or contain a `milestones` list")]
    NotAList,
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Parse milestone definitions from a YAML string, skipping malformed entries.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
/// [`ConfigError::NotAList`] if it does not hold a milestone list.
pub fn parse_milestones(yaml: &str) -> Result<Vec<Milestone>, ConfigError> {
    if yaml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: serde_yml::Value = serde_yml::from_str(yaml)?;
    let list = match raw {
        serde_yml::Value::Mapping(_) => raw
            .get("milestones")
            .cloned()
            .unwrap_or(serde_yml::Value::Null),
        other => other,
    };
    let entries = match list {
        serde_yml::Value::Sequence(entries) => entries,
        serde_yml::Value::Null => Vec::new(),
        _ => return Err(ConfigError::NotAList),
    };

    let mut milestones = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_yml::from_value::<Milestone>(entry) {
            Ok(milestone) => milestones.push(milestone),
            Err(e) => warn!(
                index = index,
                error = %e,
                "skipping malformed milestone definition"
            ),
        }
    }
    Ok(milestones)
}

/// Load milestone definitions from a YAML file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read, or any error
/// from [`parse_milestones`].
pub fn from_file(path: &Path) -> Result<Vec<Milestone>, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_milestones(&contents)
}

/// Load milestones from `path`, falling back to the built-in list.
///
/// Never fails: a missing file silently uses the defaults, an unreadable
/// or unparsable one logs a warning first.
pub fn load_milestones(path: &Path) -> Vec<Milestone> {
    if !path.exists() {
        info!(
            path = %path.display(),
            "milestone file not found, using built-in milestones"
        );
        return default_milestones();
    }
    match from_file(path) {
        Ok(milestones) => {
            info!(
                path = %path.display(),
                count = milestones.len(),
                "milestones loaded"
            );
            milestones
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to load milestone file, using built-in milestones"
            );
            default_milestones()
        }
    }
}

/// Built-in milestones used when no milestone file is available.
pub fn default_milestones() -> Vec<Milestone> {
    vec![
        Milestone::new(
            "first creep spawned",
            BTreeMap::from([(StatusField::Creeps, 1)]),
            50,
            true,
        ),
        Milestone::new(
            "controller level 2",
            BTreeMap::from([(StatusField::Level, 2)]),
            1500,
            true,
        ),
        Milestone::new(
            "three structures built",
            BTreeMap::from([(StatusField::Structures, 3)]),
            3000,
            false,
        ),
    ]
}
