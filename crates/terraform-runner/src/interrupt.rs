//! Termination signal handling.
//!
//! The first SIGTERM/SIGINT/SIGQUIT sets a flag instead of killing the test
//! process. The runner polls the flag while Terraform is running, stops the
//! child, and returns an error so the lifecycle falls through to destroy. A
//! second signal terminates the process immediately.

use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;

static PROCESS_FLAG: OnceLock<InterruptFlag> = OnceLock::new();

/// Shared "termination requested" flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// A private flag with no signal handlers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide flag, registering signal handlers on first use.
    pub fn install() -> io::Result<Self> {
        if let Some(existing) = PROCESS_FLAG.get() {
            return Ok(existing.clone());
        }

        let candidate = Self::new();
        for signal in TERM_SIGNALS {
            // Order matters: the shutdown hook only fires if the flag is
            // already set, i.e. on the second delivery.
            flag::register_conditional_shutdown(*signal, 1, Arc::clone(&candidate.raised))?;
            flag::register(*signal, Arc::clone(&candidate.raised))?;
        }
        debug!(signals = ?TERM_SIGNALS, "Installed termination signal handlers");

        // A concurrent caller may have won the race; both flags are wired to
        // handlers, so either one observes the signal.
        Ok(PROCESS_FLAG.get_or_init(|| candidate).clone())
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Raise the flag as if a signal had arrived.
    pub fn trigger(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }
}
