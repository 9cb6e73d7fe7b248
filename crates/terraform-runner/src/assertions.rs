//! Assertions on Terraform outputs.

use crate::errors::LifecycleError;
use crate::output::OutputValue;

/// Require an output to be non-empty after trimming whitespace.
pub fn assert_not_empty(name: &str, value: &OutputValue) -> Result<(), LifecycleError> {
    if value.as_text().trim().is_empty() {
        return Err(LifecycleError::EmptyOutput {
            name: name.to_string(),
        });
    }
    Ok(())
}
