//! Created-account export.
//!
//! Successful signups are appended to a dated JSON file so operators can
//! collect the day's credentials in one place. Export failures are logged
//! and swallowed by the caller: the authoritative record is the ledger, the
//! export is a convenience copy.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::identity::Identity;
use crate::phone::PhoneNumber;

// ============================================================================
// AccountRecord
// ============================================================================

/// One exported account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub phone: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    /// Builds a record from the attempt's identifier and identity.
    #[must_use]
    pub fn new(phone: &PhoneNumber, identity: &Identity) -> Self {
        Self {
            phone: phone.formatted(),
            email: identity.email.clone(),
            password: identity.password.clone(),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// AccountStore
// ============================================================================

/// Dated JSON export of created accounts.
pub struct AccountStore {
    dir: PathBuf,
}

impl AccountStore {
    /// Creates a store over the given directory. The directory is created
    /// lazily on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Today's export file, `accounts_YYYY-MM-DD.json`.
    #[must_use]
    pub fn current_file(&self) -> PathBuf {
        self.dir
            .join(format!("accounts_{}.json", Utc::now().format("%Y-%m-%d")))
    }

    /// Appends one account to today's export.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) or
    /// [`Error::Json`](crate::Error::Json) if the file cannot be
    /// read back or rewritten.
    pub fn save(&self, record: &AccountRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.current_file();

        let mut records: Vec<AccountRecord> = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        records.push(record.clone());
        std::fs::write(&path, serde_json::to_string_pretty(&records)?)?;

        info!(
            phone = %record.phone,
            email = %record.email,
            file = %path.display(),
            total_today = records.len(),
            "Account exported"
        );
        Ok(path)
    }

    /// Loads every record from one export file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) or
    /// [`Error::Json`](crate::Error::Json) on unreadable or malformed files.
    pub fn load_file(path: &Path) -> Result<Vec<AccountRecord>> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    fn identity() -> Identity {
        Identity {
            first_name: "Clara".to_string(),
            last_name: "Weber".to_string(),
            email: "clara.weber842@outlook.com".to_string(),
            password: "mN2pQ9rLwxK3!7Aa".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1992, 8, 14).unwrap(),
        }
    }

    #[test]
    fn test_save_creates_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("accounts"));
        let phone = PhoneNumber::parse("+493012345678").unwrap();

        let path = store.save(&AccountRecord::new(&phone, &identity())).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("accounts_"));

        let records = AccountStore::load_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phone, "+493012345678");
    }

    #[test]
    fn test_save_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path());
        let phone_a = PhoneNumber::parse("+15550001234").unwrap();
        let phone_b = PhoneNumber::parse("+380501112233").unwrap();

        store.save(&AccountRecord::new(&phone_a, &identity())).unwrap();
        let path = store.save(&AccountRecord::new(&phone_b, &identity())).unwrap();

        let records = AccountStore::load_file(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].phone, "+380501112233");
    }
}
