//! Shared spec helpers: a thin builder over `assert_cmd::Command` for the
//! `sfctl` binary, grounded on the teacher's `cli()`/`.passes()`/
//! `.stdout_has()` chain (`tests/specs/prelude.rs` in the pack wasn't
//! retrieved, so this is rebuilt from its call sites in `tests/specs/cli/*`).

use assert_cmd::Command;

pub struct CliRunner {
    command: Command,
}

pub fn cli() -> CliRunner {
    CliRunner { command: Command::cargo_bin("sfctl").expect("sfctl binary should be built by the test harness") }
}

impl CliRunner {
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        self.command.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.command.env(key, value);
        self
    }

    pub fn passes(mut self) -> CliOutput {
        let output = self.command.output().expect("sfctl should spawn");
        assert!(output.status.success(), "expected success, got {:?}\nstderr: {}", output.status, String::from_utf8_lossy(&output.stderr));
        CliOutput { output }
    }

    pub fn fails(mut self) -> CliOutput {
        let output = self.command.output().expect("sfctl should spawn");
        assert!(!output.status.success(), "expected failure, got success\nstdout: {}", String::from_utf8_lossy(&output.stdout));
        CliOutput { output }
    }
}

pub struct CliOutput {
    output: std::process::Output,
}

impl CliOutput {
    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = String::from_utf8_lossy(&self.output.stdout);
        assert!(stdout.contains(needle), "expected stdout to contain {needle:?}, got:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = String::from_utf8_lossy(&self.output.stderr);
        assert!(stderr.contains(needle), "expected stderr to contain {needle:?}, got:\n{stderr}");
        self
    }
}
