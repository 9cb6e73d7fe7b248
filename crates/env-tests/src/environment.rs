//! qa environment settings.

use terraform_runner::config::{ConfigError, RunOptions};

/// Output the qa root module must expose with a non-empty value.
pub const EXAMPLE_OUTPUT: &str = "example_output";

/// Run options for the qa environment.
///
/// Reads `TF_TEST_DIR` once. Variables and backend configuration for the qa
/// module can be layered on with the `RunOptions` builder methods.
pub fn qa_options() -> Result<RunOptions, ConfigError> {
    RunOptions::from_env()
}
