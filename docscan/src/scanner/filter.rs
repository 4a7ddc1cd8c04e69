//! Database selection.

use regex::Regex;

use crate::error::{Result, ScanError};

/// Databases that are never scanned.
pub const SYSTEM_DATABASES: [&str; 3] = ["admin", "local", "config"];

/// Returns true for databases in the system deny-set.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

/// Returns true for collections hidden from scans (leading underscore).
pub fn is_hidden_collection(name: &str) -> bool {
    name.starts_with('_')
}

/// Decides which databases a scan visits.
///
/// The system deny-set is applied first. If allow-list patterns are
/// configured, a database is kept when any pattern matches anywhere in its
/// name.
#[derive(Debug, Clone, Default)]
pub struct DatabaseFilter {
    patterns: Vec<Regex>,
}

impl DatabaseFilter {
    /// Compiles the allow-list. Fails on the first invalid pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    ScanError::Configuration(format!(
                        "invalid database filter pattern '{}': {e}",
                        p.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn has_patterns(&self) -> bool {
        !self.patterns.is_empty()
    }

    pub fn allows(&self, database: &str) -> bool {
        if is_system_database(database) {
            return false;
        }
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(database))
    }

    /// Keeps the allowed databases, preserving their order.
    pub fn apply(&self, databases: Vec<String>) -> Vec<String> {
        databases.into_iter().filter(|db| self.allows(db)).collect()
    }
}
