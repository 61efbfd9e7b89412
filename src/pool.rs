//! Identifier pool.
//!
//! Loads the line-oriented phone list once at startup and hands out one
//! unclaimed, uncommitted number per attempt. The committed set is re-read
//! from the ledger at every claim, so a restarted process resumes exactly
//! where the ledger says it stopped.
//!
//! A claim is in-memory only. If the process dies between claim and commit
//! the identifier was consumed by the remote side anyway, so the next run
//! treating it as fresh would be wrong more often than right; losing the
//! claim is the accepted cost.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ledger::OutcomeLedger;
use crate::phone::PhoneNumber;

// ============================================================================
// PhonePool
// ============================================================================

/// Ordered pool of parsed identifiers.
#[derive(Debug)]
pub struct PhonePool {
    numbers: Vec<PhoneNumber>,
    /// Identifiers handed out by this process, committed or not.
    claimed: Mutex<FxHashSet<String>>,
    skipped: usize,
}

impl PhonePool {
    /// Loads the pool from a line-oriented file.
    ///
    /// Blank lines and `#` comments are ignored. Malformed lines are
    /// reported and skipped; they never abort the load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceMissing`] if the file does not exist or
    /// cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|_| Error::source_missing(path))?;

        let mut numbers = Vec::new();
        let mut skipped = 0usize;
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match PhoneNumber::parse(line) {
                Ok(number) => numbers.push(number),
                Err(e) => {
                    skipped += 1;
                    warn!(line = %line, error = %e, "Skipping malformed phone entry");
                }
            }
        }

        info!(
            path = %path.display(),
            loaded = numbers.len(),
            skipped,
            "Phone list loaded"
        );

        Ok(Self {
            numbers,
            claimed: Mutex::new(FxHashSet::default()),
            skipped,
        })
    }

    /// Pool built directly from parsed numbers. Used by tests and batch
    /// tooling that sources identifiers elsewhere.
    #[must_use]
    pub fn from_numbers(numbers: Vec<PhoneNumber>) -> Self {
        Self {
            numbers,
            claimed: Mutex::new(FxHashSet::default()),
            skipped: 0,
        }
    }

    /// Total identifiers loaded.
    #[must_use]
    pub fn total(&self) -> usize {
        self.numbers.len()
    }

    /// Malformed lines dropped during load.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Claims the next identifier that has neither a committed outcome nor
    /// an in-process claim. Returns `None` when the pool is exhausted.
    ///
    /// The ledger is consulted under the claim lock, so two concurrent
    /// claims can never hand out the same number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the ledger exists but cannot be read.
    pub fn next(&self, ledger: &OutcomeLedger) -> Result<Option<PhoneNumber>> {
        let mut claimed = self.claimed.lock();
        let committed = ledger.read_committed()?;

        for number in &self.numbers {
            let digits = number.digits();
            if committed.contains_key(digits) || claimed.contains(digits) {
                continue;
            }
            claimed.insert(digits.to_string());
            return Ok(Some(number.clone()));
        }
        Ok(None)
    }

    /// Identifiers still claimable right now, given the ledger state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the ledger exists but cannot be read.
    pub fn remaining(&self, ledger: &OutcomeLedger) -> Result<usize> {
        let claimed = self.claimed.lock();
        let committed = ledger.read_committed()?;
        Ok(self
            .numbers
            .iter()
            .filter(|n| !committed.contains_key(n.digits()) && !claimed.contains(n.digits()))
            .count())
    }
}

// ============================================================================
// Tests
// ============================================================================
