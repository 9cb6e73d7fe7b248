//! Run configuration for a Terraform lifecycle.
//!
//! `TF_TEST_DIR` is the only ambient input. It is read once into an immutable
//! [`RunOptions`] which every lifecycle stage borrows.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable selecting the Terraform working directory.
pub const TF_TEST_DIR: &str = "TF_TEST_DIR";

/// Working directory used when `TF_TEST_DIR` is unset or empty, relative to
/// the test's runtime directory.
pub const DEFAULT_QA_DIR: [&str; 4] = ["..", "tf", "environments", "qa"];

/// Terraform binary used unless overridden.
pub const DEFAULT_BINARY: &str = "terraform";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is not valid Unicode")]
    NotUnicode(String),
}

/// Resolve the Terraform working directory from a variable snapshot.
///
/// Does not check that the directory exists; the first Terraform invocation
/// reports that.
pub fn resolve_working_dir(vars: &HashMap<String, String>) -> PathBuf {
    match vars.get(TF_TEST_DIR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => default_working_dir(),
    }
}

/// The fallback working directory (`../tf/environments/qa`).
pub fn default_working_dir() -> PathBuf {
    DEFAULT_QA_DIR.iter().collect()
}

/// Options shared by every Terraform invocation of one lifecycle run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    /// Pass `-no-color` to every subcommand.
    pub no_color: bool,
    /// Input variables, passed as `-var key=value` to apply and destroy.
    pub vars: BTreeMap<String, serde_json::Value>,
    pub var_files: Vec<PathBuf>,
    /// Partial backend configuration, passed to init only.
    pub backend_config: BTreeMap<String, String>,
    /// Extra environment for the Terraform process.
    pub env_vars: BTreeMap<String, String>,
    pub binary: PathBuf,
}

impl RunOptions {
    /// Options for a working directory with all other settings at defaults.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            no_color: true,
            vars: BTreeMap::new(),
            var_files: Vec::new(),
            backend_config: BTreeMap::new(),
            env_vars: BTreeMap::new(),
            binary: PathBuf::from(DEFAULT_BINARY),
        }
    }

    /// Load options from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();
        match env::var(TF_TEST_DIR) {
            Ok(dir) => {
                vars.insert(TF_TEST_DIR.to_string(), dir);
            }
            Err(env::VarError::NotPresent) => {}
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigError::NotUnicode(TF_TEST_DIR.to_string()));
            }
        }
        Ok(Self::from_vars(&vars))
    }

    /// Load options from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        Self::new(resolve_working_dir(vars))
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    #[must_use]
    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_var_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.var_files.push(path.into());
        self
    }

    #[must_use]
    pub fn with_backend_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.backend_config.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }
}
