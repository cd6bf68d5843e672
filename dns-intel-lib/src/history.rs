//! Bounded local history of past lookups.
//!
//! History lives in a single JSON file holding a most-recent-first list of
//! [`DomainQuery`] entries. Reading is fail-closed: a missing, unreadable or
//! corrupt file is simply an empty history, and entries that no longer parse
//! are skipped individually.

use crate::error::DnsIntelError;
use crate::types::{DomainQuery, LookupOptions};
use chrono::{DateTime, Utc};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of entries kept.
pub const MAX_HISTORY_ITEMS: usize = 20;

const HISTORY_FILE_NAME: &str = "history.json";

/// File-backed history of successful lookups.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Open a history store backed by the given file.
    ///
    /// The file is not touched until the first write.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Open the history store at its default location.
    pub fn open_default() -> Result<Self, DnsIntelError> {
        default_history_path()
            .map(Self::new)
            .ok_or_else(|| DnsIntelError::config("Cannot determine a history location: HOME is not set"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, most recent first.
    pub fn list(&self) -> Vec<DomainQuery> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };

        let raw = match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable history file");
                return Vec::new();
            }
        };

        // One bad entry must not cost the rest of the history
        raw.into_iter()
            .filter_map(|value| match serde_json::from_value::<DomainQuery>(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping unreadable history entry");
                    None
                }
            })
            .collect()
    }

    /// Find the entry for a domain.
    pub fn get(&self, domain: &str) -> Option<DomainQuery> {
        self.list().into_iter().find(|entry| entry.domain == domain)
    }

    /// Record a lookup, moving the domain to the head of the list.
    pub fn save(&self, domain: &str, options: &LookupOptions) -> Result<DomainQuery, DnsIntelError> {
        self.save_at(domain, options, Utc::now())
    }

    /// Record a lookup with an explicit timestamp.
    pub fn save_at(
        &self,
        domain: &str,
        options: &LookupOptions,
        timestamp: DateTime<Utc>,
    ) -> Result<DomainQuery, DnsIntelError> {
        let mut entries = self.list();
        entries.retain(|entry| entry.domain != domain);

        let entry = DomainQuery {
            domain: domain.to_string(),
            options: options.clone(),
            timestamp,
        };
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ITEMS);

        self.persist(&entries)?;
        tracing::debug!(domain, entries = entries.len(), "saved lookup to history");
        Ok(entry)
    }

    /// Remove every entry for a domain. Removing an unknown domain is a no-op.
    pub fn delete(&self, domain: &str) -> Result<(), DnsIntelError> {
        let mut entries = self.list();
        let before = entries.len();
        entries.retain(|entry| entry.domain != domain);

        if entries.len() == before {
            return Ok(());
        }

        self.persist(&entries)
    }

    /// Remove all history.
    ///
    /// Callers are expected to confirm with the user first.
    pub fn clear(&self) -> Result<(), DnsIntelError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DnsIntelError::file_error(
                self.path.to_string_lossy(),
                format!("Failed to clear history: {}", e),
            )),
        }
    }

    fn persist(&self, entries: &[DomainQuery]) -> Result<(), DnsIntelError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DnsIntelError::file_error(
                        parent.to_string_lossy(),
                        format!("Failed to create history directory: {}", e),
                    )
                })?;
            }
        }

        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json).map_err(|e| {
            DnsIntelError::file_error(
                self.path.to_string_lossy(),
                format!("Failed to write history: {}", e),
            )
        })
    }
}

/// Default history file location.
///
/// Follows the XDG Base Directory Specification for data files.
pub fn default_history_path() -> Option<PathBuf> {
    let data_dir = env::var_os("XDG_DATA_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".local").join("share")))?;

    Some(data_dir.join("dns-intel").join(HISTORY_FILE_NAME))
}

/// Format a timestamp relative to `now` ("Just now", "5m ago", "3h ago", ...).
///
/// Anything a week or older is shown as a plain date.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        timestamp.format("%Y-%m-%d").to_string()
    }
}
