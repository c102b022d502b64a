// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI Integration Tests
//!
//! Each test runs the `tracekit` binary in its own data directory.

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use tracekit_core::matching::{FeedResponse, FileKeyFeed};

/// Helper to run CLI commands in an isolated data directory
struct CliTestContext {
    data_dir: TempDir,
}

impl CliTestContext {
    fn new() -> Self {
        Self {
            data_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.data_dir.path().join(name)
    }

    /// Run a CLI command and return the output
    fn run(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tracekit"));
        cmd.env_remove("TRACEKIT_AUTHORITIES")
            .env_remove("TRACEKIT_FEED")
            .env_remove("TRACEKIT_AUTHORITY_SEED")
            .env("RUST_LOG", "warn")
            .arg("--data-dir")
            .arg(self.data_dir.path());

        for arg in args {
            cmd.arg(arg);
        }

        cmd.output().expect("Failed to execute command")
    }

    /// Run a command and assert success
    fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        assert!(
            output.status.success(),
            "Command {:?} failed.\nStdout: {}\nStderr: {}",
            args,
            stdout,
            stderr
        );
        stdout
    }

    /// Run a command and assert failure
    fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        assert!(
            !output.status.success(),
            "Command {:?} should have failed but succeeded",
            args
        );
        stderr
    }

    /// Starts and stops tracing once, accepting the consent prompt.
    fn start_once(&self) -> String {
        self.run_success(&["--yes", "run", "--minutes", "0", "--peers", "1"])
    }
}

// ===========================================================================
// Lifecycle
// ===========================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_status_before_first_run() {
        let ctx = CliTestContext::new();
        let output = ctx.run_success(&["status"]);
        assert!(output.contains("Nothing stored yet"));
    }

    #[test]
    fn test_run_records_consent_and_todays_key() {
        let ctx = CliTestContext::new();
        let output = ctx.start_once();
        assert!(output.contains("Contact tracing"));
        assert!(output.contains("Stopped"));

        let status = ctx.run_success(&["status"]);
        assert!(status.contains("Tracing consent:     granted"));
        assert!(status.contains("Daily keys:          1"));

        let keys = ctx.run_success(&["keys", "list"]);
        assert!(keys.contains("today"));
    }

    #[test]
    fn test_uninstall_wipes_data() {
        let ctx = CliTestContext::new();
        ctx.start_once();

        let output = ctx.run_success(&["--yes", "uninstall"]);
        assert!(output.contains("All tracing data removed"));

        let status = ctx.run_success(&["status"]);
        assert!(status.contains("Daily keys:          0"));
        assert!(status.contains("Tracing consent:     not granted"));
    }
}

// ===========================================================================
// Keys and matching
// ===========================================================================

mod matching {
    use super::*;

    #[test]
    fn test_share_on_first_day_has_nothing_to_upload() {
        let ctx = CliTestContext::new();
        ctx.start_once();

        let export = ctx.path("export.json");
        let output = ctx.run_success(&["--yes", "keys", "share", export.to_str().unwrap()]);

        assert!(output.contains("No keys old enough"));
        assert!(!export.exists());
    }

    #[test]
    fn test_share_rejects_out_of_range_risk_level() {
        let ctx = CliTestContext::new();
        let export = ctx.path("export.json");
        ctx.run_failure(&[
            "keys",
            "share",
            export.to_str().unwrap(),
            "--risk-level",
            "9",
        ]);
    }

    #[test]
    fn test_provide_empty_export() {
        let ctx = CliTestContext::new();
        ctx.start_once();

        let export = ctx.path("export.json");
        let response = FeedResponse {
            date: 1_700_000_000,
            ..FeedResponse::default()
        };
        FileKeyFeed::publish(&export, &response).unwrap();

        let output = ctx.run_success(&["--yes", "provide", export.to_str().unwrap()]);
        assert!(output.contains("Checked 0 diagnosis key(s)"));

        let exposures = ctx.run_success(&["exposures", "list"]);
        assert!(exposures.contains("No exposures found"));
    }

    #[test]
    fn test_provide_missing_export_fails() {
        let ctx = CliTestContext::new();
        let missing = ctx.path("missing.json");
        let stderr = ctx.run_failure(&["provide", missing.to_str().unwrap()]);
        assert!(stderr.contains("No diagnosis key export"));
    }

    #[test]
    fn test_invalid_authority_fails() {
        let ctx = CliTestContext::new();
        let stderr = ctx.run_failure(&["--authority", "nothex", "status"]);
        assert!(stderr.contains("invalid authority"));
    }
}

// ===========================================================================
// Risk scoring
// ===========================================================================

mod risk_configuration {
    use super::*;

    #[test]
    fn test_show_default_configuration() {
        let ctx = CliTestContext::new();
        let output = ctx.run_success(&["exposures", "config"]);
        assert!(output.contains("minimumRiskScore"));
    }

    #[test]
    fn test_set_configuration_persists() {
        let ctx = CliTestContext::new();
        let shown = ctx.run_success(&["exposures", "config"]);
        let changed = shown.replacen("\"minimumRiskScore\": 1", "\"minimumRiskScore\": 3", 1);
        assert_ne!(shown, changed);

        let file = ctx.path("scoring.json");
        std::fs::write(&file, changed).unwrap();
        ctx.run_success(&["exposures", "config", "--set", file.to_str().unwrap()]);

        let status = ctx.run_success(&["status"]);
        assert!(status.contains("Minimum risk score:  3"));
    }

    #[test]
    fn test_set_invalid_configuration_fails() {
        let ctx = CliTestContext::new();
        let file = ctx.path("scoring.json");
        std::fs::write(&file, "{\"minimumRiskScore\": \"high\"}").unwrap();
        ctx.run_failure(&["exposures", "config", "--set", file.to_str().unwrap()]);
    }
}

// ===========================================================================
// Shell completions
// ===========================================================================

#[test]
fn test_completions_bash() {
    let ctx = CliTestContext::new();
    let output = ctx.run_success(&["completions", "bash"]);
    assert!(output.contains("tracekit"));
}
