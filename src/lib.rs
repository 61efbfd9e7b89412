//! Phone-verified account signup automation.
//!
//! This crate drives a remote browser session through a phone-first signup
//! wizard: enter a number, disambiguate what the site did with it, enter
//! the verification code, complete the profile, and record the outcome.
//! Identifiers are a consumable resource; the design treats "never burn a
//! number twice" and "never lose an outcome" as the two invariants
//! everything else bends around.
//!
//! # Architecture
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`phone`] | Identifier parsing and dial-code routing |
//! | [`pool`] | Claiming identifiers, exactly once each |
//! | [`ledger`] | Append-only outcome record, the source of truth |
//! | [`accounts`] | Dated export of created credentials |
//! | [`config`] | Runner configuration, phrase sets, selector chains |
//! | [`page`] | Locators, the [`page::PageDriver`] boundary, the wire client |
//! | [`classifier`] | Post-submission signal disambiguation |
//! | [`steps`] | Wizard step execution over candidate chains |
//! | [`flow`] | The attempt state machine and orchestration |
//! | [`session`] | Fingerprinted session provisioning and release |
//! | [`identity`] | Generated profile identities |
//! | [`fingerprint`] | Country-consistent fingerprint ingredients |
//! | [`otp`] | Verification code acquisition |
//! | [`captcha`] | Optional challenge solving |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use signup_runner::flow::FlowController;
//! use signup_runner::otp::StdinCodeProvider;
//! use signup_runner::session::{HttpProvisioner, MlxAllocator};
//! use signup_runner::shutdown::Shutdown;
//! use signup_runner::{Config, OutcomeLedger, PhonePool};
//!
//! # async fn run() -> signup_runner::Result<()> {
//! let config = Arc::new(Config::default());
//! let pool = PhonePool::load(&config.paths.phone_list)?;
//! let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));
//!
//! let http = reqwest::Client::new();
//! let allocator = MlxAllocator::new(
//!     http.clone(),
//!     config.allocator.clone(),
//!     config.proxy.clone(),
//! );
//! let provisioner = Arc::new(HttpProvisioner::new(
//!     Arc::new(allocator),
//!     http,
//!     config.allocator.clone(),
//!     config.timeouts.clone(),
//! ));
//!
//! let flow = FlowController::new(
//!     config,
//!     provisioner,
//!     Arc::new(StdinCodeProvider),
//!     None,
//!     ledger.clone(),
//! );
//!
//! let (_handle, mut shutdown) = Shutdown::new();
//! while let Some(phone) = pool.next(&ledger)? {
//!     let outcome = flow.run_attempt(phone, &mut shutdown).await?;
//!     println!("{}: success={}", outcome.phone, outcome.succeeded);
//! }
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod captcha;
pub mod classifier;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod flow;
pub mod identity;
pub mod ledger;
pub mod otp;
pub mod page;
pub mod phone;
pub mod pool;
pub mod session;
pub mod shutdown;
pub mod steps;

pub use config::Config;
pub use error::{Error, Result};
pub use flow::{FlowController, FlowState, Outcome};
pub use ledger::OutcomeLedger;
pub use phone::PhoneNumber;
pub use pool::PhonePool;
