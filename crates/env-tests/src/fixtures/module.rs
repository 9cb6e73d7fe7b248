//! Fixture root modules written to temporary directories.
//!
//! Fixtures only use built-in Terraform features (outputs, `terraform_data`,
//! `local-exec`), so `terraform init` needs no network access.

use anyhow::Context;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use terraform_runner::config::RunOptions;
use tracing::debug;

/// A Terraform root module in a temporary directory.
///
/// The directory (including any local state) is removed on drop.
#[derive(Debug)]
pub struct FixtureModule {
    dir: TempDir,
}

impl FixtureModule {
    pub fn builder() -> FixtureModuleBuilder {
        FixtureModuleBuilder::default()
    }

    /// Module exposing `name` with a literal string value.
    pub fn with_output(name: &str, value: &str) -> anyhow::Result<Self> {
        Self::builder().output(name, value).build()
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run options targeting this module.
    pub fn options(&self) -> RunOptions {
        RunOptions::new(self.path())
    }

    /// Whether local state still tracks any resources.
    pub fn has_resources_in_state(&self) -> anyhow::Result<bool> {
        let state_path = self.path().join("terraform.tfstate");
        if !state_path.exists() {
            return Ok(false);
        }

        let raw = fs::read_to_string(&state_path)
            .with_context(|| format!("Failed to read {}", state_path.display()))?;
        let state: serde_json::Value =
            serde_json::from_str(&raw).context("Local state is not valid JSON")?;

        Ok(state["resources"]
            .as_array()
            .is_some_and(|resources| !resources.is_empty()))
    }
}

/// Builder for [`FixtureModule`].
#[derive(Debug, Default)]
pub struct FixtureModuleBuilder {
    outputs: Vec<(String, String)>,
    failing_apply: bool,
    slow_apply: Option<Duration>,
}

impl FixtureModuleBuilder {
    /// Declare `output "<name>" { value = "<value>" }`.
    #[must_use]
    pub fn output(mut self, name: &str, value: &str) -> Self {
        self.outputs.push((name.to_string(), value.to_string()));
        self
    }

    /// Add a resource whose create-time provisioner exits non-zero, so the
    /// module is valid but `apply` fails.
    #[must_use]
    pub fn failing_apply(mut self) -> Self {
        self.failing_apply = true;
        self
    }

    /// Add a resource whose creation runs `sleep` for `duration`.
    #[must_use]
    pub fn slow_apply(mut self, duration: Duration) -> Self {
        self.slow_apply = Some(duration);
        self
    }

    /// Write `main.tf` into a fresh temporary directory.
    pub fn build(self) -> anyhow::Result<FixtureModule> {
        let dir = tempfile::Builder::new()
            .prefix("tf-fixture-")
            .tempdir()
            .context("Failed to create fixture directory")?;

        let main_tf = dir.path().join("main.tf");
        fs::write(&main_tf, self.render())
            .with_context(|| format!("Failed to write {}", main_tf.display()))?;
        debug!(path = %dir.path().display(), "Wrote fixture module");

        Ok(FixtureModule { dir })
    }

    fn render(&self) -> String {
        let mut hcl = String::new();

        if self.failing_apply {
            hcl.push_str(
                r#"resource "terraform_data" "failure" {
  provisioner "local-exec" {
    command = "echo 'Fixture apply failure.' >&2; exit 1"
  }
}

"#,
            );
        }

        if let Some(duration) = self.slow_apply {
            let _ = write!(
                hcl,
                r#"resource "terraform_data" "slow" {{
  provisioner "local-exec" {{
    command = "sleep {}"
  }}
}}

"#,
                duration.as_secs().max(1)
            );
        }

        for (name, value) in &self.outputs {
            let _ = write!(
                hcl,
                "output \"{}\" {{\n  value = {}\n}}\n\n",
                name,
                hcl_string(value)
            );
        }

        hcl
    }
}

/// Quote a literal as an HCL string, escaping template sequences.
fn hcl_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace("${", "$${")
        .replace("%{", "%%{")
}
