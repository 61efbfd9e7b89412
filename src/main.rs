//! Signup runner binary.
//!
//! Claims identifiers from the pool and runs attempts until the requested
//! count is reached, the pool is exhausted, or the operator interrupts.
//! Ctrl-C cancels the in-flight attempt at its next suspension point; the
//! attempt still commits its outcome and releases its session.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use signup_runner::captcha::{ChallengeSolver, TwoCaptchaSolver};
use signup_runner::flow::FlowController;
use signup_runner::otp::StdinCodeProvider;
use signup_runner::session::{HttpProvisioner, MlxAllocator};
use signup_runner::shutdown::Shutdown;
use signup_runner::{Config, OutcomeLedger, PhonePool, Result};

// ============================================================================
// CLI
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "signup-runner", version, about = "Phone-verified signup automation")]
struct Cli {
    /// Path to a JSON configuration file. Defaults apply section by section.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seconds to pause between consecutive attempts.
    #[arg(long, global = true, default_value_t = 5)]
    delay: u64,

    /// Route sessions directly, skipping the egress proxy.
    #[arg(long, global = true)]
    no_proxy: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run exactly one attempt.
    Single,
    /// Run a fixed number of attempts.
    Batch {
        /// Attempts to run.
        #[arg(long)]
        count: usize,
    },
    /// Run until the identifier pool is exhausted.
    Exhaust,
}

impl Mode {
    fn limit(&self) -> usize {
        match self {
            Mode::Single => 1,
            Mode::Batch { count } => *count,
            Mode::Exhaust => usize::MAX,
        }
    }
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("signup_runner=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Runner stopped on a fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if cli.no_proxy {
        warn!("Proxy routing disabled for this run");
        config.proxy.enabled = false;
    }
    let config = Arc::new(config);

    let pool = PhonePool::load(&config.paths.phone_list)?;
    let ledger = Arc::new(OutcomeLedger::new(config.paths.ledger.clone()));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;

    let allocator = MlxAllocator::new(
        http.clone(),
        config.allocator.clone(),
        config.proxy.clone(),
    );
    let provisioner = Arc::new(HttpProvisioner::new(
        Arc::new(allocator),
        http.clone(),
        config.allocator.clone(),
        config.timeouts.clone(),
    ));

    let solver: Option<Arc<dyn ChallengeSolver>> = if config.captcha.enabled {
        Some(Arc::new(TwoCaptchaSolver::new(http, config.captcha.clone())))
    } else {
        None
    };

    let flow = FlowController::new(
        config.clone(),
        provisioner,
        Arc::new(StdinCodeProvider),
        solver,
        ledger.clone(),
    );

    let (handle, mut shutdown) = Shutdown::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing the in-flight attempt");
            handle.trigger();
        }
    });

    let limit = cli.mode.limit();
    let delay = Duration::from_secs(cli.delay);
    let mut attempts = 0usize;
    let mut successes = 0usize;

    while attempts < limit && !shutdown.is_triggered() {
        let Some(phone) = pool.next(&ledger)? else {
            info!("Identifier pool exhausted");
            break;
        };

        let outcome = flow.run_attempt(phone, &mut shutdown).await?;
        attempts += 1;
        if outcome.succeeded {
            successes += 1;
        }
        info!(
            attempts,
            successes,
            remaining = pool.remaining(&ledger)?,
            "Running tally"
        );

        if attempts < limit && !shutdown.is_triggered() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.triggered() => {}
            }
        }
    }

    let rate = if attempts > 0 {
        successes as f64 / attempts as f64 * 100.0
    } else {
        0.0
    };
    info!(
        attempts,
        successes,
        failures = attempts - successes,
        success_rate = format!("{rate:.1}%"),
        "Run finished"
    );
    Ok(ExitCode::SUCCESS)
}
