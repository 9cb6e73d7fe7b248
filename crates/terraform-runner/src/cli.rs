//! Terraform CLI adapter.
//!
//! [`TerraformCli`] is the seam between the lifecycle orchestrator and the
//! external binary. [`TerraformBinary`] shells out to Terraform; the
//! [`mock::MockTerraform`] implementation records calls for driver tests.

use crate::config::RunOptions;
use crate::errors::TerraformError;
use crate::interrupt::InterruptFlag;
use crate::output::OutputValue;
use crate::process::{self, Interruptible};
use std::io;
use std::process::Command;
use tracing::{info, instrument};

/// Operations the lifecycle needs from Terraform.
pub trait TerraformCli: Send + Sync {
    /// Initialise the working directory (`terraform init`).
    fn init(&self, options: &RunOptions) -> Result<(), TerraformError>;

    /// Apply the configuration without prompting (`terraform apply`).
    fn apply(&self, options: &RunOptions) -> Result<(), TerraformError>;

    /// Read a root module output (`terraform output -json <name>`).
    fn output(&self, options: &RunOptions, name: &str) -> Result<OutputValue, TerraformError>;

    /// Destroy everything the apply created (`terraform destroy`).
    fn destroy(&self, options: &RunOptions) -> Result<(), TerraformError>;
}

/// Arguments for `terraform init`.
pub fn init_args(options: &RunOptions) -> Vec<String> {
    let mut args = vec!["init".to_string(), "-input=false".to_string()];
    push_no_color(&mut args, options);
    args.extend(
        options
            .backend_config
            .iter()
            .map(|(key, value)| format!("-backend-config={}={}", key, value)),
    );
    args
}

/// Arguments for `terraform apply`.
pub fn apply_args(options: &RunOptions) -> Vec<String> {
    let mut args = vec![
        "apply".to_string(),
        "-input=false".to_string(),
        "-auto-approve".to_string(),
    ];
    push_no_color(&mut args, options);
    push_variables(&mut args, options);
    args
}

/// Arguments for `terraform output`.
pub fn output_args(options: &RunOptions, name: &str) -> Vec<String> {
    let mut args = vec!["output".to_string()];
    push_no_color(&mut args, options);
    args.push("-json".to_string());
    args.push(name.to_string());
    args
}

/// Arguments for `terraform destroy`.
pub fn destroy_args(options: &RunOptions) -> Vec<String> {
    let mut args = vec![
        "destroy".to_string(),
        "-input=false".to_string(),
        "-auto-approve".to_string(),
    ];
    push_no_color(&mut args, options);
    push_variables(&mut args, options);
    args
}

fn push_no_color(args: &mut Vec<String>, options: &RunOptions) {
    if options.no_color {
        args.push("-no-color".to_string());
    }
}

fn push_variables(args: &mut Vec<String>, options: &RunOptions) {
    for (key, value) in &options.vars {
        args.push("-var".to_string());
        args.push(format!("{}={}", key, render_var(value)));
    }
    for file in &options.var_files {
        args.push(format!("-var-file={}", file.display()));
    }
}

/// Render a variable value for `-var`. Strings are passed raw; lists, maps,
/// numbers and booleans use JSON syntax, which HCL accepts.
fn render_var(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Adapter that runs the real Terraform binary.
#[derive(Debug, Clone)]
pub struct TerraformBinary {
    interrupt: InterruptFlag,
}

impl TerraformBinary {
    /// Create an adapter wired to the process-wide termination signal flag.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            interrupt: InterruptFlag::install()?,
        })
    }

    /// Create an adapter that observes the given flag instead of process signals.
    pub fn with_interrupt(interrupt: InterruptFlag) -> Self {
        Self { interrupt }
    }

    fn command(&self, options: &RunOptions, args: &[String]) -> Result<Command, TerraformError> {
        if !options.working_dir.is_dir() {
            return Err(TerraformError::WorkingDirMissing {
                path: options.working_dir.clone(),
            });
        }

        let mut command = Command::new(&options.binary);
        command
            .args(args)
            .current_dir(&options.working_dir)
            .env("TF_IN_AUTOMATION", "1")
            .env("TF_INPUT", "0")
            .envs(&options.env_vars);
        Ok(command)
    }

    /// Run a subcommand and return its stdout, failing on non-zero exit.
    fn run(
        &self,
        options: &RunOptions,
        args: &[String],
        interruptible: Interruptible,
    ) -> Result<String, TerraformError> {
        let subcommand = args.first().map(String::as_str).unwrap_or("terraform");
        let command = self.command(options, args)?;

        info!(
            command = subcommand,
            working_dir = %options.working_dir.display(),
            "Running terraform {}",
            subcommand
        );

        let output = process::run(command, subcommand, &self.interrupt, interruptible)
            .map_err(|e| e.into_terraform_error(subcommand, &options.binary))?;

        if !output.status.success() {
            return Err(TerraformError::CommandFailed {
                command: subcommand.to_string(),
                code: output.status.code(),
                stderr: process::sanitize_stderr(&output.stderr),
            });
        }

        Ok(output.stdout)
    }
}

impl TerraformCli for TerraformBinary {
    #[instrument(skip_all)]
    fn init(&self, options: &RunOptions) -> Result<(), TerraformError> {
        self.run(options, &init_args(options), Interruptible::Yes)
            .map(|_| ())
    }

    #[instrument(skip_all)]
    fn apply(&self, options: &RunOptions) -> Result<(), TerraformError> {
        self.run(options, &apply_args(options), Interruptible::Yes)
            .map(|_| ())
    }

    #[instrument(skip(self, options))]
    fn output(&self, options: &RunOptions, name: &str) -> Result<OutputValue, TerraformError> {
        let stdout = self
            .run(options, &output_args(options, name), Interruptible::Yes)
            .map_err(|e| classify_output_error(e, name))?;

        OutputValue::from_json(&stdout).map_err(|source| TerraformError::OutputParse {
            name: name.to_string(),
            source,
        })
    }

    /// Destroy ignores the interrupt flag so cleanup runs to completion.
    #[instrument(skip_all)]
    fn destroy(&self, options: &RunOptions) -> Result<(), TerraformError> {
        self.run(options, &destroy_args(options), Interruptible::No)
            .map(|_| ())
    }
}

/// Terraform reports an undeclared output as a failed `output` command with
/// `Output "<name>" not found` (or "No outputs found") on stderr. Any other
/// failure is passed through with its stderr intact.
fn classify_output_error(err: TerraformError, name: &str) -> TerraformError {
    let missing = format!("Output \"{}\" not found", name);
    match err {
        TerraformError::CommandFailed { ref stderr, .. }
            if stderr.contains(&missing) || stderr.contains("No outputs found") =>
        {
            TerraformError::OutputNotFound {
                name: name.to_string(),
            }
        }
        other => other,
    }
}

/// Mock Terraform adapter for driver tests.
///
/// Records every call and can be configured to fail or panic at a given
/// stage, so lifecycle behaviour is testable without a Terraform binary.
pub mod mock {

    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// One recorded adapter call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Call {
        Init,
        Apply,
        Output,
        Destroy,
    }

    /// Behaviour configured for a single stage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Behavior {
        Succeed,
        Fail,
        Interrupt,
        Panic,
    }

    /// Recording mock for [`TerraformCli`].
    pub struct MockTerraform {
        output: Option<OutputValue>,
        init: Behavior,
        apply: Behavior,
        destroy: Behavior,
        calls: Mutex<Vec<(Call, PathBuf)>>,
    }

    impl MockTerraform {
        /// Create a mock whose module exposes `value` for any output name.
        pub fn with_output(value: impl Into<OutputValue>) -> Self {
            Self {
                output: Some(value.into()),
                init: Behavior::Succeed,
                apply: Behavior::Succeed,
                destroy: Behavior::Succeed,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock whose module declares no outputs.
        pub fn without_output() -> Self {
            Self {
                output: None,
                ..Self::with_output("")
            }
        }

        #[must_use]
        pub fn init_behavior(mut self, behavior: Behavior) -> Self {
            self.init = behavior;
            self
        }

        #[must_use]
        pub fn apply_behavior(mut self, behavior: Behavior) -> Self {
            self.apply = behavior;
            self
        }

        #[must_use]
        pub fn destroy_behavior(mut self, behavior: Behavior) -> Self {
            self.destroy = behavior;
            self
        }

        /// All calls made so far, in order.
        pub fn calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .map(|calls| calls.iter().map(|(call, _)| *call).collect())
                .unwrap_or_default()
        }

        /// Working directory each call was made against, in call order.
        pub fn working_dirs(&self) -> Vec<PathBuf> {
            self.calls
                .lock()
                .map(|calls| calls.iter().map(|(_, dir)| dir.clone()).collect())
                .unwrap_or_default()
        }

        /// Number of calls made for one stage.
        pub fn call_count(&self, call: Call) -> usize {
            self.calls().iter().filter(|c| **c == call).count()
        }

        fn record(&self, call: Call, options: &RunOptions) {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((call, options.working_dir.clone()));
            }
        }

        #[allow(clippy::panic)] // Panicking on request is the point of Behavior::Panic
        fn act(command: &str, behavior: Behavior) -> Result<(), TerraformError> {
            match behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => Err(TerraformError::CommandFailed {
                    command: command.to_string(),
                    code: Some(1),
                    stderr: format!("Error: mock {} failure", command),
                }),
                Behavior::Interrupt => Err(TerraformError::Interrupted {
                    command: command.to_string(),
                }),
                Behavior::Panic => panic!("mock terraform {} panicked", command),
            }
        }
    }

    impl TerraformCli for MockTerraform {
        fn init(&self, options: &RunOptions) -> Result<(), TerraformError> {
            self.record(Call::Init, options);
            Self::act("init", self.init)
        }

        fn apply(&self, options: &RunOptions) -> Result<(), TerraformError> {
            self.record(Call::Apply, options);
            Self::act("apply", self.apply)
        }

        fn output(&self, options: &RunOptions, name: &str) -> Result<OutputValue, TerraformError> {
            self.record(Call::Output, options);
            self.output
                .clone()
                .ok_or_else(|| TerraformError::OutputNotFound {
                    name: name.to_string(),
                })
        }

        fn destroy(&self, options: &RunOptions) -> Result<(), TerraformError> {
            self.record(Call::Destroy, options);
            Self::act("destroy", self.destroy)
        }
    }

}
