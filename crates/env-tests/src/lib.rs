//! Environment Integration Test Suite
//!
//! Integration tests for the Terraform environments. Each test drives a root
//! module through `init` → `apply` → `output` → `destroy` with
//! [`terraform_runner`] and fails if the expected output is empty. Destroy is
//! always attempted once the run has started.
//!
//! # Features
//!
//! - `qa`: Real qa environment lifecycle (provisions and destroys infrastructure)
//! - `fixtures`: Lifecycle against small local fixture modules (terraform in PATH only)
//! - `all`: Enable all test categories
//!
//! Driver property tests run against a mock adapter and need no feature flag.
//!
//! # Prerequisites
//!
//! 1. `terraform` in PATH (1.4 or newer for the fixture modules)
//! 2. For `qa`: credentials for the qa backend and providers in the environment
//! 3. Optional: `TF_TEST_DIR` pointing at the root module (defaults to
//!    `../tf/environments/qa` relative to this crate)
//!
//! # Usage
//!
//! ```bash
//! # Driver property tests only
//! cargo test -p env-tests
//!
//! # Fixture-backed lifecycle tests
//! cargo test -p env-tests --features fixtures
//!
//! # Real qa environment
//! TF_TEST_DIR=/path/to/tf/environments/qa cargo test -p env-tests --features qa
//! ```

pub mod environment;
pub mod fixtures;
pub mod logging;
