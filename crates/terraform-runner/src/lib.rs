//! Terraform lifecycle runner for environment tests.
//!
//! Runs a Terraform root module through `init` → `apply` → `output` →
//! `destroy`, asserts on a named output, and guarantees that a destroy attempt
//! is made once cleanup has been registered, including when a step fails,
//! panics, or the process receives a termination signal.
//!
//! # Usage
//!
//! ```rust,no_run
//! use terraform_runner::cli::TerraformBinary;
//! use terraform_runner::config::RunOptions;
//! use terraform_runner::lifecycle::run_lifecycle;
//!
//! let options = RunOptions::from_env().expect("TF_TEST_DIR should be valid");
//! let cli = TerraformBinary::new().expect("signal handlers should install");
//!
//! run_lifecycle(&cli, &options, "example_output").assert_passed();
//! ```

pub mod assertions;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interrupt;
pub mod lifecycle;
pub mod output;
pub mod process;
