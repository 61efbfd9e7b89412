//! Profile identity generation.
//!
//! Every attempt fills the profile form with a fresh plausible identity.
//! Randomness comes from a small time-seeded generator; cryptographic
//! quality is not needed here, only non-repetition across attempts.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Name Tables
// ============================================================================

const FIRST_NAMES: &[&str] = &[
    "James", "Oliver", "Daniel", "Lucas", "Henry", "Ethan", "Adam", "Leo",
    "Emma", "Sofia", "Mia", "Anna", "Clara", "Julia", "Nora", "Elena",
    "Marco", "Viktor", "Tomas", "Andrei", "Karim", "Omar", "Diego", "Mateo",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Brown", "Miller", "Davis", "Wilson", "Moore",
    "Taylor", "Anderson", "Thomas", "Walker", "Harris", "Clark", "Lewis",
    "Novak", "Petrov", "Kovacs", "Weber", "Rossi", "Silva", "Santos", "Reyes",
];

const EMAIL_DOMAINS: &[&str] = &["gmail.com", "outlook.com", "yahoo.com", "proton.me"];

const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// ============================================================================
// Identity
// ============================================================================

/// One generated profile identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Date of birth; always an adult in the 22-45 range.
    pub birth_date: NaiveDate,
}

impl Identity {
    /// Birth date in the `MM/DD/YYYY` form the profile input expects.
    #[must_use]
    pub fn birth_date_input(&self) -> String {
        self.birth_date.format("%m/%d/%Y").to_string()
    }
}

// ============================================================================
// IdentityGenerator
// ============================================================================

/// Time-seeded identity generator.
///
/// SplitMix64 over an atomic counter: each call gets a distinct state even
/// under concurrent use.
pub struct IdentityGenerator {
    state: AtomicU64,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGenerator {
    /// Creates a generator seeded from the clock.
    #[must_use]
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self {
            state: AtomicU64::new(seed | 1),
        }
    }

    fn next_u64(&self) -> u64 {
        let mut z = self
            .state
            .fetch_add(0x9e37_79b9_7f4a_7c15, Ordering::Relaxed)
            .wrapping_add(0x9e37_79b9_7f4a_7c15);
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn pick<'a>(&self, table: &[&'a str]) -> &'a str {
        table[(self.next_u64() % table.len() as u64) as usize]
    }

    /// Picks a u64 in `[low, high]`.
    fn range(&self, low: u64, high: u64) -> u64 {
        low + self.next_u64() % (high - low + 1)
    }

    fn password(&self) -> String {
        let mut out = String::with_capacity(16);
        for _ in 0..12 {
            let idx = (self.next_u64() % PASSWORD_ALPHABET.len() as u64) as usize;
            out.push(PASSWORD_ALPHABET[idx] as char);
        }
        // The site requires a symbol and a digit regardless of the rest.
        format!("{out}!7Aa")
    }

    /// Generates a fresh identity.
    #[must_use]
    pub fn generate(&self) -> Identity {
        let first_name = self.pick(FIRST_NAMES).to_string();
        let last_name = self.pick(LAST_NAMES).to_string();

        let email = format!(
            "{}.{}{}@{}",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            self.range(100, 9_999),
            self.pick(EMAIL_DOMAINS)
        );

        let age = self.range(22, 45) as i32;
        let year = Utc::now().year() - age;
        let month = self.range(1, 12) as u32;
        // Capped at 28 so every month is valid.
        let day = self.range(1, 28) as u32;
        let birth_date =
            NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
                NaiveDate::from_ymd_opt(year, 1, 1).expect("january first is valid")
            });

        Identity {
            first_name,
            last_name,
            email,
            password: self.password(),
            birth_date,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_identity_is_complete() {
        let generator = IdentityGenerator::new();
        let identity = generator.generate();

        assert!(!identity.first_name.is_empty());
        assert!(!identity.last_name.is_empty());
        assert!(identity.email.contains('@'));
        assert!(identity.password.len() >= 12);
    }

    #[test]
    fn test_birth_date_is_adult() {
        let generator = IdentityGenerator::new();
        for _ in 0..50 {
            let identity = generator.generate();
            let age = Utc::now().year() - identity.birth_date.year();
            assert!((22..=46).contains(&age), "age out of range: {age}");
        }
    }

    #[test]
    fn test_birth_date_input_format() {
        let identity = Identity {
            first_name: "Anna".to_string(),
            last_name: "Novak".to_string(),
            email: "anna.novak101@gmail.com".to_string(),
            password: "xK3mN2pQ9rLw!7Aa".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1995, 4, 7).unwrap(),
        };
        assert_eq!(identity.birth_date_input(), "04/07/1995");
    }

    #[test]
    fn test_consecutive_identities_differ() {
        let generator = IdentityGenerator::new();
        let a = generator.generate();
        let b = generator.generate();
        // Emails carry a random suffix; collision would need a full cycle.
        assert_ne!(a.email, b.email);
    }
}
