//! Verification code acquisition.
//!
//! Where the code comes from is not the flow's business: SMS gateways,
//! operator consoles, and plain manual entry all sit behind [`CodeProvider`].
//! The flow supplies the deadline; a provider that cannot produce a code in
//! time answers `None` and the attempt records why.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::error::Result;
use crate::phone::PhoneNumber;

// ============================================================================
// CodeProvider Trait
// ============================================================================

/// Source of verification codes.
#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Produces the code sent to the given number, or `None` if no code
    /// arrived within the deadline.
    async fn get_code(&self, phone: &PhoneNumber, deadline: Duration) -> Result<Option<String>>;
}

// ============================================================================
// StdinCodeProvider
// ============================================================================

/// Manual entry: prompts the operator on the terminal and waits for a line.
#[derive(Debug, Default)]
pub struct StdinCodeProvider;

#[async_trait]
impl CodeProvider for StdinCodeProvider {
    async fn get_code(&self, phone: &PhoneNumber, deadline: Duration) -> Result<Option<String>> {
        info!(
            phone = %phone,
            deadline_s = deadline.as_secs(),
            "Waiting for manual code entry"
        );
        println!("Enter the SMS code sent to {phone} (blank to skip):");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        let read = tokio::time::timeout(deadline, reader.read_line(&mut line)).await;

        match read {
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(_)) => {
                let code: String = line.trim().chars().filter(char::is_ascii_digit).collect();
                if code.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(code))
                }
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(phone = %phone, "No code entered before the deadline");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
