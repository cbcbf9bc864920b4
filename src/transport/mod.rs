//! Transport layer for communicating with Claude Code CLI
//!
//! This module provides the transport abstraction and the subprocess
//! implementation that owns one CLI child process. The transport deals in
//! framed lines; decoding them is the control codec's job.

pub mod subprocess;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{ClaudeError, Result};

/// Minimum supported Claude Code CLI version
pub const MIN_CLI_VERSION: &str = "2.0.60";

/// Events delivered to transport subscribers
#[derive(Debug)]
pub enum TransportEvent {
    /// One complete stdout line, newline stripped
    Line(String),
    /// A recoverable transport-level error (oversized line, read failure)
    Error(ClaudeError),
    /// The child process exited; terminal event
    Exited {
        /// Exit code, if the process terminated normally
        code: Option<i32>,
        /// Tail of captured stderr for diagnostics
        stderr: Option<String>,
    },
}

/// Transport trait for communicating with Claude Code
///
/// Implementations own the CLI child process (or, in tests, a scripted
/// stand-in). The transport never retries; retry policy belongs to the
/// client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect to the transport (spawn the child process)
    ///
    /// # Errors
    /// Returns error if the executable is missing, the working directory
    /// does not exist, or the spawn fails
    async fn connect(&mut self) -> Result<()>;

    /// Write a line to the transport
    ///
    /// # Arguments
    /// * `data` - UTF-8 line to write, terminated with `\n`
    ///
    /// # Errors
    /// Returns error if the write fails or the transport is not ready
    async fn write(&mut self, data: &str) -> Result<()>;

    /// End the input stream (close stdin)
    ///
    /// # Errors
    /// Returns error if closing fails
    async fn end_input(&mut self) -> Result<()>;

    /// Subscribe to transport events
    ///
    /// Returns a receiver of framed stdout lines, recoverable errors, and a
    /// terminal exit event. May be called once per transport; the reader task
    /// is started on first subscription.
    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent>;

    /// Check if transport is ready for communication
    fn is_ready(&self) -> bool;

    /// Close the transport and clean up resources; idempotent
    ///
    /// # Errors
    /// Returns error if cleanup fails
    async fn close(&mut self) -> Result<()>;
}

/// Check the Claude Code CLI version
///
/// Returns the version string if it meets minimum requirements.
///
/// # Errors
/// Returns `ClaudeError::CliVersionTooOld` if the version is below minimum.
pub async fn check_claude_version(cli_path: &std::path::Path) -> Result<String> {
    use tokio::process::Command;

    let output = Command::new(cli_path)
        .arg("--version")
        .output()
        .await
        .map_err(|e| ClaudeError::connection(format!("Failed to get CLI version: {e}")))?;

    if !output.status.success() {
        return Err(ClaudeError::connection("Failed to get CLI version"));
    }

    let version_str = String::from_utf8_lossy(&output.stdout);
    let version = version_str.trim();

    // Handle formats like "1.2.3" or "claude 1.2.3"
    let version_num = version
        .split_whitespace()
        .find(|s| s.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(version);

    if version_lt(version_num, MIN_CLI_VERSION) {
        return Err(ClaudeError::cli_version_too_old(
            version_num,
            MIN_CLI_VERSION,
        ));
    }

    Ok(version_num.to_string())
}

/// Simple semver comparison (returns true if v1 < v2)
fn version_lt(v1: &str, v2: &str) -> bool {
    let parse = |v: &str| -> Vec<u32> { v.split('.').filter_map(|s| s.parse().ok()).collect() };

    let v1_parts = parse(v1);
    let v2_parts = parse(v2);

    for i in 0..v1_parts.len().max(v2_parts.len()) {
        let p1 = v1_parts.get(i).copied().unwrap_or(0);
        let p2 = v2_parts.get(i).copied().unwrap_or(0);
        if p1 < p2 {
            return true;
        } else if p1 > p2 {
            return false;
        }
    }
    false
}

pub use subprocess::{PromptInput, SubprocessTransport};
