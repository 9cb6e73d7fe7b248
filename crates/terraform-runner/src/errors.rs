//! Error types for Terraform invocations and lifecycle runs.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single Terraform CLI invocation.
#[derive(Debug, Error)]
pub enum TerraformError {
    #[error("Terraform working directory not found: {}", .path.display())]
    WorkingDirMissing { path: PathBuf },

    #[error("Terraform binary '{}' not found in PATH", .binary.display())]
    BinaryNotFound { binary: PathBuf },

    #[error("Failed to run terraform {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("terraform {command} exited with {}: {stderr}", exit_label(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Output '{name}' is not declared by the Terraform module")]
    OutputNotFound { name: String },

    #[error("Output '{name}' is not valid JSON: {source}")]
    OutputParse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("terraform {command} was interrupted by a termination signal")]
    Interrupted { command: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (killed by signal)".to_string(),
    }
}

/// Failure of one lifecycle stage.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("terraform init failed: {0}")]
    Init(#[source] TerraformError),

    #[error("terraform apply failed: {0}")]
    Apply(#[source] TerraformError),

    #[error("Failed to read output '{name}': {source}")]
    Output {
        name: String,
        #[source]
        source: TerraformError,
    },

    #[error("{name} should not be empty")]
    EmptyOutput { name: String },

    #[error("terraform destroy failed: {0}")]
    Destroy(#[source] TerraformError),
}
