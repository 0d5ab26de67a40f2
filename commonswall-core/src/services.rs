// Service traits and default implementations for dependency injection
use anyhow::{Context, Result};
use log::debug;
use std::path::Path;
use std::process::Command;

/// Service trait for talking to the remote media API
pub trait Transport {
    /// Send a GET query with the given parameters and return the raw JSON body
    fn get_json(&self, params: &[(String, String)]) -> Result<String>;

    /// Download `url` into the file at `dest`
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Service trait for detecting which desktop session is running
pub trait SessionDetector {
    /// Whether a process of the current user has a name matching `process_name`.
    /// This is a pattern match, so `gnome-session` also finds `gnome-session-binary`.
    fn is_running(&self, process_name: &str) -> bool;
}

/// Service trait for running desktop commands
pub trait CommandRunner {
    /// Run `program` with `args`, returning whether it exited successfully
    fn run(&self, program: &str, args: &[String]) -> Result<bool>;
}

/// Default implementation backed by `pgrep` and `std::process::Command`
pub struct DefaultServiceProvider;

impl SessionDetector for DefaultServiceProvider {
    fn is_running(&self, process_name: &str) -> bool {
        let user = match Command::new("whoami").output() {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            _ => return false,
        };

        // pgrep missing or no match both mean "not running"
        match Command::new("pgrep").args(pgrep_args(&user, process_name)).output() {
            Ok(output) => output.status.success() && !output.stdout.is_empty(),
            Err(e) => {
                debug!("pgrep failed for {}: {}", process_name, e);
                false
            }
        }
    }
}

// No `-x`: pgrep treats the name as a pattern
fn pgrep_args<'a>(user: &'a str, pattern: &'a str) -> [&'a str; 3] {
    ["-u", user, pattern]
}

impl CommandRunner for DefaultServiceProvider {
    fn run(&self, program: &str, args: &[String]) -> Result<bool> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", program))?;
        if !output.stderr.is_empty() {
            debug!("{} stderr: {}", program, String::from_utf8_lossy(&output.stderr).trim());
        }
        Ok(output.status.success())
    }
}
