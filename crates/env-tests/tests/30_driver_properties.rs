//! Driver Property Tests
//!
//! Lifecycle guarantees checked against the recording mock adapter: destroy
//! runs exactly once on every path, failures keep their cause, and the
//! working directory resolves from `TF_TEST_DIR`. No Terraform binary needed.

use env_tests::environment::{qa_options, EXAMPLE_OUTPUT};
use env_tests::logging::init_tracing;
use serial_test::serial;
use std::env;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use terraform_runner::cli::mock::{Behavior, Call, MockTerraform};
use terraform_runner::cli::{apply_args, destroy_args, init_args, output_args};
use terraform_runner::config::{default_working_dir, RunOptions, TF_TEST_DIR};
use terraform_runner::errors::{LifecycleError, TerraformError};
use terraform_runner::lifecycle::run_lifecycle;

fn options() -> RunOptions {
    RunOptions::new("fixtures/qa")
}

#[test]
fn test_non_empty_output_passes_and_destroys_once() {
    init_tracing();
    for value in ["ok", "  padded  ", "arn:aws:s3:::qa-bucket"] {
        let mock = MockTerraform::with_output(value);

        let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

        assert!(report.is_pass(), "Output {:?} should pass", value);
        assert_eq!(mock.call_count(Call::Destroy), 1);
    }
}

#[test]
fn test_empty_output_fails_naming_output() {
    init_tracing();
    for value in ["", " ", "\n\t"] {
        let mock = MockTerraform::with_output(value);

        let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

        let failure = report.failure().expect("Empty output should fail");
        assert_eq!(failure.to_string(), "example_output should not be empty");
        assert_eq!(mock.call_count(Call::Destroy), 1);
    }
}

#[test]
fn test_apply_failure_destroys_and_reports_apply_error() {
    init_tracing();
    let mock = MockTerraform::with_output("ok").apply_behavior(Behavior::Fail);

    let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

    let failure = report.failure().expect("Apply failure should fail");
    assert!(matches!(failure.primary, LifecycleError::Apply(_)));
    assert!(failure.to_string().contains("mock apply failure"));
    assert_eq!(mock.calls(), vec![Call::Init, Call::Apply, Call::Destroy]);
}

#[test]
fn test_missing_output_fails_at_output_read() {
    init_tracing();
    let mock = MockTerraform::without_output();

    let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

    let failure = report.failure().expect("Missing output should fail");
    assert!(matches!(
        &failure.primary,
        LifecycleError::Output { name, .. } if name == EXAMPLE_OUTPUT
    ));
    assert_eq!(mock.call_count(Call::Destroy), 1);
}

#[test]
fn test_init_failure_attempts_destroy_and_reports_both() {
    init_tracing();
    let mock = MockTerraform::with_output("ok")
        .init_behavior(Behavior::Fail)
        .destroy_behavior(Behavior::Fail);

    let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

    let failure = report.failure().expect("Init failure should fail");
    assert!(matches!(failure.primary, LifecycleError::Init(_)));
    assert!(matches!(
        failure.destroy,
        Some(TerraformError::CommandFailed { .. })
    ));
    assert_eq!(mock.calls(), vec![Call::Init, Call::Destroy]);
}

#[test]
fn test_assertion_failure_not_masked_by_destroy_failure() {
    init_tracing();
    let mock = MockTerraform::with_output("").destroy_behavior(Behavior::Fail);

    let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

    let failure = report.failure().expect("Empty output should fail");
    assert!(matches!(failure.primary, LifecycleError::EmptyOutput { .. }));
    assert!(failure.destroy.is_some());
}

#[test]
fn test_panic_during_apply_still_destroys() {
    init_tracing();
    let mock = MockTerraform::with_output("ok").apply_behavior(Behavior::Panic);
    let options = options();

    let result = catch_unwind(AssertUnwindSafe(|| {
        run_lifecycle(&mock, &options, EXAMPLE_OUTPUT)
    }));

    assert!(result.is_err(), "Panic should propagate to the test harness");
    assert_eq!(mock.call_count(Call::Destroy), 1);
}

#[test]
fn test_interrupted_apply_still_destroys() {
    init_tracing();
    let mock = MockTerraform::with_output("ok").apply_behavior(Behavior::Interrupt);

    let report = run_lifecycle(&mock, &options(), EXAMPLE_OUTPUT);

    let failure = report.failure().expect("Interrupted apply should fail");
    assert!(matches!(
        failure.primary,
        LifecycleError::Apply(TerraformError::Interrupted { .. })
    ));
    assert_eq!(mock.calls(), vec![Call::Init, Call::Apply, Call::Destroy]);
}

#[test]
fn test_no_color_in_every_invocation() {
    let variants = [
        RunOptions::new("qa"),
        RunOptions::new("qa").with_var("region", "eu-west-1"),
        RunOptions::new("qa").with_backend_config("bucket", "tf-state-qa"),
        RunOptions::new("qa").with_var_file("qa.tfvars"),
    ];

    for options in &variants {
        for args in [
            init_args(options),
            apply_args(options),
            output_args(options, EXAMPLE_OUTPUT),
            destroy_args(options),
        ] {
            assert!(
                args.iter().any(|arg| arg == "-no-color"),
                "-no-color missing from {:?}",
                args
            );
        }
    }
}

#[test]
#[serial]
fn test_tf_test_dir_overrides_default() {
    let previous = env::var(TF_TEST_DIR).ok();

    env::set_var(TF_TEST_DIR, "/srv/terraform/qa");
    let overridden = qa_options().expect("TF_TEST_DIR should be readable");
    assert_eq!(overridden.working_dir(), Path::new("/srv/terraform/qa"));

    env::remove_var(TF_TEST_DIR);
    let restored = qa_options().expect("Unset TF_TEST_DIR is valid");
    assert_eq!(restored.working_dir(), default_working_dir());
    assert_eq!(restored.working_dir(), Path::new("../tf/environments/qa"));

    env::set_var(TF_TEST_DIR, "");
    let empty = qa_options().expect("Empty TF_TEST_DIR is valid");
    assert_eq!(empty.working_dir(), default_working_dir());

    match previous {
        Some(previous) => env::set_var(TF_TEST_DIR, previous),
        None => env::remove_var(TF_TEST_DIR),
    }
}

#[test]
#[serial]
fn test_options_are_snapshotted_once() {
    let previous = env::var(TF_TEST_DIR).ok();

    env::set_var(TF_TEST_DIR, "/srv/terraform/first");
    let options = qa_options().expect("TF_TEST_DIR should be readable");
    env::set_var(TF_TEST_DIR, "/srv/terraform/second");

    let mock = MockTerraform::with_output("ok");
    run_lifecycle(&mock, &options, EXAMPLE_OUTPUT).assert_passed();

    match previous {
        Some(previous) => env::set_var(TF_TEST_DIR, previous),
        None => env::remove_var(TF_TEST_DIR),
    }

    let dirs = mock.working_dirs();
    assert_eq!(dirs.len(), 4, "expected init, apply, output and destroy");
    for dir in dirs {
        assert_eq!(dir, Path::new("/srv/terraform/first"));
    }
}
