//! Lifecycle orchestration: init+apply → output → assert → destroy.
//!
//! Cleanup is a [`DestroyGuard`] registered before the first Terraform call.
//! The normal path destroys explicitly so the result can be reported; any
//! other exit (early return, panic unwinding through the guard) destroys from
//! `Drop`. Either way each guard makes exactly one destroy attempt.

use crate::assertions;
use crate::cli::TerraformCli;
use crate::config::RunOptions;
use crate::errors::{LifecycleError, TerraformError};
use crate::output::OutputValue;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Scoped `terraform destroy`.
#[must_use = "dropping the guard immediately runs terraform destroy"]
pub struct DestroyGuard<'a, C: TerraformCli + ?Sized> {
    cli: &'a C,
    options: &'a RunOptions,
    armed: bool,
}

impl<'a, C: TerraformCli + ?Sized> DestroyGuard<'a, C> {
    /// Register cleanup for `options`. Must happen before init+apply.
    pub fn register(cli: &'a C, options: &'a RunOptions) -> Self {
        info!(working_dir = %options.working_dir.display(), "Registered terraform destroy");
        Self {
            cli,
            options,
            armed: true,
        }
    }

    /// Run destroy now and return its result.
    pub fn destroy(mut self) -> Result<(), TerraformError> {
        self.armed = false;
        self.run()
    }

    fn run(&self) -> Result<(), TerraformError> {
        info!("Destroying terraform resources");
        self.cli.destroy(self.options)
    }
}

impl<C: TerraformCli + ?Sized> Drop for DestroyGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        if std::thread::panicking() {
            warn!("Lifecycle aborted by panic, running terraform destroy");
        }
        if let Err(e) = self.run() {
            error!(error = %e, "terraform destroy failed during cleanup");
        }
    }
}

/// Result of a lifecycle run.
#[derive(Debug)]
pub enum TestOutcome {
    Pass,
    Fail(LifecycleFailure),
}

/// A failed run: the first error encountered, plus a destroy error if
/// cleanup also failed afterwards.
#[derive(Debug, Error)]
#[error("{primary}{}", DestroySuffix(.destroy))]
pub struct LifecycleFailure {
    #[source]
    pub primary: LifecycleError,
    pub destroy: Option<TerraformError>,
}

struct DestroySuffix<'a>(&'a Option<TerraformError>);

impl fmt::Display for DestroySuffix<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(e) => write!(f, " (destroy also failed: {})", e),
            None => Ok(()),
        }
    }
}

/// Outcome of [`run_lifecycle`] together with the output that was read.
#[derive(Debug)]
pub struct LifecycleReport {
    pub outcome: TestOutcome,
    pub output: Option<OutputValue>,
}

impl LifecycleReport {
    pub fn is_pass(&self) -> bool {
        matches!(self.outcome, TestOutcome::Pass)
    }

    pub fn failure(&self) -> Option<&LifecycleFailure> {
        match &self.outcome {
            TestOutcome::Pass => None,
            TestOutcome::Fail(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<Option<OutputValue>, LifecycleFailure> {
        match self.outcome {
            TestOutcome::Pass => Ok(self.output),
            TestOutcome::Fail(failure) => Err(failure),
        }
    }

    /// Fail the calling test with the recorded failure, if any.
    #[track_caller]
    #[allow(clippy::panic)] // Test assertion helper: panicking is how a test fails
    pub fn assert_passed(&self) {
        if let Some(failure) = self.failure() {
            panic!("{}", failure);
        }
    }
}

/// Run the full lifecycle against `options` and assert that `output_name`
/// is non-empty.
#[instrument(skip(cli, options), fields(working_dir = %options.working_dir.display()))]
pub fn run_lifecycle<C: TerraformCli + ?Sized>(
    cli: &C,
    options: &RunOptions,
    output_name: &str,
) -> LifecycleReport {
    let guard = DestroyGuard::register(cli, options);

    let mut output = None;
    let primary = apply_and_check(cli, options, output_name, &mut output).err();
    if let Some(e) = &primary {
        error!(error = %e, "Lifecycle failed");
    }

    let destroyed = guard.destroy();

    let outcome = match (primary, destroyed) {
        (None, Ok(())) => {
            info!("Lifecycle passed");
            TestOutcome::Pass
        }
        (None, Err(e)) => {
            error!(error = %e, "terraform destroy failed");
            TestOutcome::Fail(LifecycleFailure {
                primary: LifecycleError::Destroy(e),
                destroy: None,
            })
        }
        (Some(primary), Ok(())) => TestOutcome::Fail(LifecycleFailure {
            primary,
            destroy: None,
        }),
        (Some(primary), Err(e)) => {
            warn!(error = %e, "terraform destroy also failed");
            TestOutcome::Fail(LifecycleFailure {
                primary,
                destroy: Some(e),
            })
        }
    };

    LifecycleReport { outcome, output }
}

fn apply_and_check<C: TerraformCli + ?Sized>(
    cli: &C,
    options: &RunOptions,
    output_name: &str,
    output: &mut Option<OutputValue>,
) -> Result<(), LifecycleError> {
    cli.init(options).map_err(LifecycleError::Init)?;
    cli.apply(options).map_err(LifecycleError::Apply)?;

    let value = cli
        .output(options, output_name)
        .map_err(|source| LifecycleError::Output {
            name: output_name.to_string(),
            source,
        })?;
    // Outputs may be sensitive; only the size is logged.
    info!(output = output_name, value_len = value.as_text().len(), "Read terraform output");

    let checked = assertions::assert_not_empty(output_name, &value);
    *output = Some(value);
    checked
}
