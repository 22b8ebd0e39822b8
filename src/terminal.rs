//! Synchronous subprocess helpers.
//!
//! Every external call made by this crate (the Rscript bridge, gtftools,
//! gseapy, jupyter) goes through here. Calls block until the child exits;
//! there is no timeout or cancellation.

use crate::error::{EcoError, Result};
use std::process::{Command, ExitStatus, Output, Stdio};

/// Run a command with inherited stdio and return its exit status.
pub fn run(program: &str, args: &[&str]) -> Result<ExitStatus> {
    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| spawn_error(program, &e))?;
    Ok(status)
}

/// Run a command, capture its output, and return it.
pub fn capture(program: &str, args: &[&str]) -> Result<Output> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(program, &e))?;
    Ok(output)
}

/// Run a command and return its stdout as a string, failing on non-zero exit.
pub fn stdout(program: &str, args: &[&str]) -> Result<String> {
    let output = capture(program, args)?;
    if !output.status.success() {
        return Err(EcoError::Subprocess {
            command: program.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn spawn_error(program: &str, err: &std::io::Error) -> EcoError {
    EcoError::Subprocess {
        command: program.to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_true() {
        let status = run("true", &[]).unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_stdout_echo() {
        let out = stdout("echo", &["hello"]).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_missing_program() {
        let result = run("definitely-not-a-real-program", &[]);
        assert!(result.is_err());
    }
}
