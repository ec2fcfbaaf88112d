//! Integration tests for the `run` command.
use heathub::commands::handle_run_command;
use std::path::PathBuf;
use tempfile::tempdir;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

/// An integration test for the `run` command.
#[test]
fn test_handle_run_command() {
    unsafe { std::env::set_var("HEATHUB_LOG_LEVEL", "off") };

    {
        // Save results to a non-existent directory to check that directory creation works
        let tempdir = tempdir().unwrap();
        let output_dir = tempdir.path().join("results");
        handle_run_command(&get_model_dir(), Some(&output_dir), None).unwrap();

        for file_name in ["dispatch.csv", "objective.csv", "first_stage.csv"] {
            assert!(output_dir.join(file_name).is_file());
        }
    }

    // Second time will fail because the logging is already initialised
    assert_eq!(
        handle_run_command(&get_model_dir(), Some(&tempdir().unwrap().path().join("results")), None)
            .unwrap_err()
            .chain()
            .next()
            .unwrap()
            .to_string(),
        "Failed to initialise logging."
    );
}
