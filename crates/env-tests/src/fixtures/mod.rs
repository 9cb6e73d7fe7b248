//! Test fixtures: throwaway Terraform root modules.

pub mod module;

pub use module::{FixtureModule, FixtureModuleBuilder};
