//! Append-only outcome ledger.
//!
//! Every consumed identifier gets exactly one committed row per attempt,
//! success or failure, written before the session is released. The ledger is
//! the source of truth for which identifiers are spent: the pool re-reads it
//! before every claim, so restarts never replay a committed number.
//!
//! The file is line-oriented CSV and only ever appended to. Duplicate rows
//! for one identifier are legal; readers resolve them last-write-wins.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header written when the ledger file is first created.
const HEADER: &str = "identifier,timestamp,succeeded,step_reached,reason,duration_ms";

/// Field count of a well-formed row.
const FIELDS: usize = 6;

// ============================================================================
// LedgerRow
// ============================================================================

/// One committed attempt outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    /// Canonical identifier digits, no `+` prefix.
    pub identifier: String,
    /// When the outcome was committed.
    pub timestamp: DateTime<Utc>,
    /// Whether the attempt completed the whole wizard.
    pub succeeded: bool,
    /// Furthest flow step the attempt reached.
    pub step_reached: String,
    /// Failure reason, empty on success.
    pub reason: String,
    /// Wall-clock attempt duration.
    pub duration_ms: u64,
}

impl LedgerRow {
    fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            sanitize(&self.identifier),
            self.timestamp.to_rfc3339(),
            self.succeeded,
            sanitize(&self.step_reached),
            sanitize(&self.reason),
            self.duration_ms
        )
    }

    fn parse(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != FIELDS {
            return None;
        }
        Some(Self {
            identifier: parts[0].to_string(),
            timestamp: DateTime::parse_from_rfc3339(parts[1]).ok()?.with_timezone(&Utc),
            succeeded: parts[2].parse().ok()?,
            step_reached: parts[3].to_string(),
            reason: parts[4].to_string(),
            duration_ms: parts[5].parse().ok()?,
        })
    }
}

/// Keeps free-text fields from breaking the row structure.
fn sanitize(field: &str) -> String {
    field.replace([',', '\n', '\r'], ";")
}

// ============================================================================
// OutcomeLedger
// ============================================================================

/// Append-only CSV ledger of attempt outcomes.
pub struct OutcomeLedger {
    path: PathBuf,
    /// Serializes appends so concurrent commits never interleave bytes.
    write_lock: Mutex<()>,
}

impl OutcomeLedger {
    /// Creates a ledger over the given file. The file itself is created
    /// lazily on first commit.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one outcome row.
    ///
    /// Committing the same identifier again is allowed and simply appends;
    /// readers keep the latest row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnwritable`], which is fatal to the process:
    /// running on without recorded outcomes would burn identifiers silently.
    pub async fn commit(&self, row: &LedgerRow) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::ledger_unwritable(&self.path, e))?;
        }

        let fresh = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::ledger_unwritable(&self.path, e))?;

        let mut payload = String::new();
        if fresh {
            payload.push_str(HEADER);
            payload.push('\n');
        }
        payload.push_str(&row.to_line());
        payload.push('\n');

        file.write_all(payload.as_bytes())
            .await
            .map_err(|e| Error::ledger_unwritable(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| Error::ledger_unwritable(&self.path, e))?;

        debug!(
            identifier = %row.identifier,
            succeeded = row.succeeded,
            step_reached = %row.step_reached,
            "Outcome committed"
        );
        Ok(())
    }

    /// Reads the committed set, resolving duplicates last-write-wins.
    ///
    /// A missing ledger file is an empty committed set, not an error.
    /// Malformed rows are reported and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read.
    pub fn read_committed(&self) -> Result<FxHashMap<String, LedgerRow>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(FxHashMap::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut committed = FxHashMap::default();
        for line in raw.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            match LedgerRow::parse(line) {
                Some(row) => {
                    committed.insert(row.identifier.clone(), row);
                }
                None => warn!(line = %line, "Skipping malformed ledger row"),
            }
        }
        Ok(committed)
    }

    /// Whether an identifier already has a committed outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the ledger exists but cannot be read.
    pub fn is_committed(&self, identifier: &str) -> Result<bool> {
        Ok(self.read_committed()?.contains_key(identifier))
    }
}

// ============================================================================
// Tests
// ============================================================================
