//! Subprocess transport implementation using Claude Code CLI

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{ClaudeError, Result};
use crate::transport::{Transport, TransportEvent};
use crate::types::{ClaudeAgentOptions, StderrCallback, SystemPrompt};
use crate::utils::line_preview;
use crate::VERSION;

const DEFAULT_MAX_LINE_SIZE: usize = 1024 * 1024; // 1MB

/// Number of trailing stderr lines retained for exit diagnostics
const STDERR_TAIL_LINES: usize = 20;

// Dangerous environment variables that must not reach the subprocess
const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

// Allowed extra CLI flags (allowlist approach)
const ALLOWED_EXTRA_FLAGS: &[&str] = &["timeout", "retries", "log-level", "cache-dir"];

/// Prompt input type
#[derive(Debug)]
pub enum PromptInput {
    /// Single string prompt passed on the command line; stdin closes at spawn
    String(String),
    /// Stream of JSON messages over stdin
    Stream,
}

impl From<String> for PromptInput {
    fn from(s: String) -> Self {
        PromptInput::String(s)
    }
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        PromptInput::String(s.to_string())
    }
}

type StderrTail = Arc<std::sync::Mutex<VecDeque<String>>>;

/// Subprocess transport for Claude Code CLI
pub struct SubprocessTransport {
    prompt: PromptInput,
    options: ClaudeAgentOptions,
    cli_path: PathBuf,
    cwd: Option<PathBuf>,
    process: Arc<Mutex<Option<Child>>>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    ready: Arc<AtomicBool>,
    max_line_size: usize,
    reader_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
    stderr_tail: StderrTail,
    cancellation_token: CancellationToken,
}

impl SubprocessTransport {
    /// Create a new subprocess transport
    ///
    /// # Arguments
    /// * `prompt` - The prompt input (string or stream)
    /// * `options` - Configuration options
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found
    pub fn new(prompt: PromptInput, options: ClaudeAgentOptions) -> Result<Self> {
        Self::with_cancellation_token(prompt, options, None)
    }

    /// Create a new subprocess transport with a parent cancellation token
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found
    pub fn with_cancellation_token(
        prompt: PromptInput,
        options: ClaudeAgentOptions,
        cancellation_token: Option<CancellationToken>,
    ) -> Result<Self> {
        let cli_path = match options.path_to_claude_code_executable {
            Some(ref path) => path.clone(),
            None => Self::find_cli()?,
        };

        let cwd = options.cwd.clone();
        let max_line_size = options.max_line_size.unwrap_or(DEFAULT_MAX_LINE_SIZE);
        let token = cancellation_token.unwrap_or_default();

        Ok(Self {
            prompt,
            options,
            cli_path,
            cwd,
            process: Arc::new(Mutex::new(None)),
            stdin: None,
            stdout: None,
            ready: Arc::new(AtomicBool::new(false)),
            max_line_size,
            reader_task: None,
            stderr_task: None,
            stderr_tail: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            cancellation_token: token,
        })
    }

    /// Find Claude Code CLI binary
    fn find_cli() -> Result<PathBuf> {
        if let Ok(path) = which::which("claude") {
            return Ok(path);
        }

        // Manual search in common locations
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/root"));
        let locations = vec![
            PathBuf::from(home.clone()).join(".npm-global/bin/claude"),
            PathBuf::from("/usr/local/bin/claude"),
            PathBuf::from(home.clone()).join(".local/bin/claude"),
            PathBuf::from(home.clone()).join("node_modules/.bin/claude"),
            PathBuf::from(home).join(".yarn/bin/claude"),
        ];

        for path in locations {
            if path.exists() && path.is_file() {
                return Ok(path);
            }
        }

        Err(ClaudeError::cli_not_found())
    }

    /// Build CLI command with all arguments
    #[allow(clippy::too_many_lines)]
    fn build_command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.cli_path);

        // Always --print for non-interactive mode to avoid terminal manipulation
        cmd.arg("--print");

        cmd.arg("--output-format")
            .arg("stream-json")
            .arg("--verbose");

        // System prompt
        if let Some(ref system_prompt) = self.options.system_prompt {
            match system_prompt {
                SystemPrompt::String(s) => {
                    cmd.arg("--system-prompt").arg(s);
                }
                SystemPrompt::Preset(preset) => {
                    if let Some(ref append) = preset.append {
                        cmd.arg("--append-system-prompt").arg(append);
                    }
                }
            }
        }

        // Allowed / disallowed tools
        if !self.options.allowed_tools.is_empty() {
            let tools: Vec<&str> = self
                .options
                .allowed_tools
                .iter()
                .map(|t| t.as_str())
                .collect();
            cmd.arg("--allowedTools").arg(tools.join(","));
        }
        if !self.options.disallowed_tools.is_empty() {
            let tools: Vec<&str> = self
                .options
                .disallowed_tools
                .iter()
                .map(|t| t.as_str())
                .collect();
            cmd.arg("--disallowedTools").arg(tools.join(","));
        }

        // Max turns
        if let Some(max_turns) = self.options.max_turns {
            cmd.arg("--max-turns").arg(max_turns.to_string());
        }

        // Model and fallback
        if let Some(ref model) = self.options.model {
            cmd.arg("--model").arg(model);
        }
        if let Some(ref fallback) = self.options.fallback_model {
            cmd.arg("--fallback-model").arg(fallback);
        }

        // Permission prompt tool
        if let Some(ref tool) = self.options.permission_prompt_tool_name {
            cmd.arg("--permission-prompt-tool").arg(tool);
        }

        // Permission mode
        if let Some(ref mode) = self.options.permission_mode {
            cmd.arg("--permission-mode").arg(mode.as_str());
        }

        // Continue / resume / fork
        if self.options.continue_conversation {
            cmd.arg("--continue");
        }
        if let Some(ref session_id) = self.options.resume {
            cmd.arg("--resume").arg(session_id.as_str());
        }
        if self.options.fork_session {
            cmd.arg("--fork-session");
        }

        // Settings file
        if let Some(ref settings) = self.options.settings {
            cmd.arg("--settings").arg(settings);
        }

        // Add directories
        for dir in &self.options.add_dirs {
            cmd.arg("--add-dir").arg(dir);
        }

        // MCP servers
        match &self.options.mcp_servers {
            crate::types::McpServers::Dict(servers) => {
                if !servers.is_empty() {
                    let mut config_map = HashMap::new();
                    for (name, config) in servers {
                        config_map.insert(name.clone(), Self::serialize_mcp_config(config));
                    }
                    let config_json = serde_json::json!({
                        "mcpServers": config_map
                    });
                    cmd.arg("--mcp-config").arg(config_json.to_string());
                }
            }
            crate::types::McpServers::Path(path) => {
                cmd.arg("--mcp-config").arg(path);
            }
            crate::types::McpServers::None => {}
        }

        if self.options.strict_mcp_config {
            cmd.arg("--strict-mcp-config");
        }

        // Include partial messages
        if self.options.include_partial_messages {
            cmd.arg("--include-partial-messages");
        }

        // Agent profiles
        if let Some(ref agents) = self.options.agents {
            let agents_json = serde_json::to_string(agents)
                .map_err(|e| ClaudeError::json_encode(format!("agents: {e}")))?;
            cmd.arg("--agents").arg(agents_json);
        }

        // Setting sources
        if let Some(ref sources) = self.options.setting_sources {
            let sources_str: Vec<&str> = sources
                .iter()
                .map(|s| match s {
                    crate::types::SettingSource::User => "user",
                    crate::types::SettingSource::Project => "project",
                    crate::types::SettingSource::Local => "local",
                })
                .collect();
            cmd.arg("--setting-sources").arg(sources_str.join(","));
        } else {
            cmd.arg("--setting-sources").arg("");
        }

        // OS user
        if let Some(ref user) = self.options.user {
            cmd.arg("--user").arg(user);
        }

        // Beta features
        if let Some(ref betas) = self.options.betas {
            for beta in betas {
                cmd.arg("--beta").arg(beta.as_str());
            }
        }

        // Extra args - strict allowlist enforcement to prevent CLI injection
        let disallowed: Vec<&String> = self
            .options
            .extra_args
            .keys()
            .filter(|flag| !ALLOWED_EXTRA_FLAGS.contains(&flag.as_str()))
            .collect();

        if !disallowed.is_empty() {
            let flags_str = disallowed
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                flags = %flags_str,
                allowed = ?ALLOWED_EXTRA_FLAGS,
                "Rejected disallowed CLI flags in extra_args"
            );
            return Err(ClaudeError::invalid_config(format!(
                "Disallowed CLI flags in extra_args: [{flags_str}]. Allowed flags: {ALLOWED_EXTRA_FLAGS:?}"
            )));
        }

        for (flag, value) in &self.options.extra_args {
            if let Some(v) = value {
                cmd.arg(format!("--{flag}")).arg(v);
            } else {
                cmd.arg(format!("--{flag}"));
            }
        }

        // Prompt handling based on mode
        match &self.prompt {
            PromptInput::Stream => {
                // --replay-user-messages lets the CLI read stdin during streaming
                cmd.arg("--input-format").arg("stream-json");
                cmd.arg("--replay-user-messages");
            }
            PromptInput::String(s) => {
                cmd.arg("--").arg(s);
            }
        }

        Ok(cmd)
    }

    /// Serialize MCP config for the CLI's `--mcp-config` payload
    ///
    /// SDK servers are declared with `type: "sdk"` and name/version only; the
    /// tool handlers never cross the wire.
    fn serialize_mcp_config(config: &crate::types::McpServerConfig) -> serde_json::Value {
        match config {
            crate::types::McpServerConfig::Stdio(stdio) => {
                let mut obj = serde_json::json!({
                    "command": stdio.command,
                });
                if let Some(ref args) = stdio.args {
                    obj["args"] = serde_json::json!(args);
                }
                if let Some(ref env) = stdio.env {
                    obj["env"] = serde_json::json!(env);
                }
                if let Some(ref server_type) = stdio.server_type {
                    obj["type"] = serde_json::json!(server_type);
                }
                obj
            }
            crate::types::McpServerConfig::Sse(sse) => {
                serde_json::json!({
                    "type": sse.server_type,
                    "url": sse.url,
                    "headers": sse.headers,
                })
            }
            crate::types::McpServerConfig::Http(http) => {
                serde_json::json!({
                    "type": http.server_type,
                    "url": http.url,
                    "headers": http.headers,
                })
            }
            crate::types::McpServerConfig::Sdk(server) => {
                serde_json::json!({
                    "type": "sdk",
                    "name": server.name(),
                    "version": server.server_version(),
                })
            }
        }
    }

    /// Get a child cancellation token for this transport
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    fn stderr_tail_string(tail: &StderrTail) -> Option<String> {
        let guard = tail.lock().ok()?;
        if guard.is_empty() {
            None
        } else {
            Some(guard.iter().cloned().collect::<Vec<_>>().join("\n"))
        }
    }

    /// Split buffered bytes into complete lines, enforcing the per-line bound.
    ///
    /// Emits `Line` events for complete lines and a single `LineTooLong` error
    /// when the bound is exceeded; oversized data is discarded up to the next
    /// newline and framing resumes there.
    fn drain_lines(
        buf: &mut Vec<u8>,
        discarding: &mut bool,
        max_line_size: usize,
        tx: &mpsc::UnboundedSender<TransportEvent>,
    ) {
        loop {
            let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
                break;
            };
            let mut line: Vec<u8> = buf.drain(..=pos).collect();
            line.pop(); // trailing '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if *discarding {
                // Remainder of an oversized line; the error was already sent
                *discarding = false;
                continue;
            }

            if line.len() > max_line_size {
                let _ = tx.send(TransportEvent::Error(ClaudeError::LineTooLong {
                    limit: max_line_size,
                }));
                continue;
            }

            if line.is_empty() {
                continue;
            }

            match String::from_utf8(line) {
                Ok(text) => {
                    let _ = tx.send(TransportEvent::Line(text));
                }
                Err(e) => {
                    let _ = tx.send(TransportEvent::Error(ClaudeError::transport(format!(
                        "Invalid UTF-8 on stdout: {e}"
                    ))));
                }
            }
        }

        // No newline yet; if the partial line already exceeds the bound,
        // report once and discard until the next newline.
        if !*discarding && buf.len() > max_line_size {
            let preview = line_preview(&String::from_utf8_lossy(buf), 100);
            tracing::warn!(limit = max_line_size, preview = %preview, "Oversized line, resynchronizing");
            let _ = tx.send(TransportEvent::Error(ClaudeError::LineTooLong {
                limit: max_line_size,
            }));
            buf.clear();
            *discarding = true;
        }
    }
}

#[async_trait]
impl Transport for SubprocessTransport {
    async fn connect(&mut self) -> Result<()> {
        {
            let guard = self.process.lock().await;
            if guard.is_some() {
                return Ok(());
            }
        }

        if let Some(ref cwd) = self.cwd {
            if !cwd.exists() {
                return Err(ClaudeError::connection(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                )));
            }
        }

        let mut cmd = self.build_command()?;

        // Strict enforcement of dangerous variable blocking
        let mut process_env = env::vars().collect::<HashMap<_, _>>();

        let dangerous_found: Vec<&String> = self
            .options
            .env
            .keys()
            .filter(|key| DANGEROUS_ENV_VARS.contains(&key.as_str()))
            .collect();

        if !dangerous_found.is_empty() {
            let vars_str = dangerous_found
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                vars = %vars_str,
                "Rejected dangerous environment variables - possible injection attempt"
            );
            return Err(ClaudeError::invalid_config(format!(
                "Dangerous environment variables detected: [{vars_str}]. These are blocked to prevent injection attacks."
            )));
        }

        for (key, value) in &self.options.env {
            process_env.insert(key.clone(), value.clone());
        }

        process_env.insert("CLAUDE_CODE_ENTRYPOINT".to_string(), "sdk-rust".to_string());
        process_env.insert("CLAUDE_AGENT_SDK_VERSION".to_string(), VERSION.to_string());

        if let Some(ref cwd) = self.cwd {
            process_env.insert("PWD".to_string(), cwd.to_string_lossy().to_string());
            cmd.current_dir(cwd);
        }

        cmd.envs(process_env);

        // Pipe stderr instead of inheriting so the child never touches the
        // parent terminal state.
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ClaudeError::connection(format!("Failed to start Claude Code: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stderr handle"))?;

        // Drain stderr line-by-line: forward to the sink callback and keep a
        // bounded tail for exit diagnostics.
        let stderr_sink: Option<StderrCallback> = self.options.stderr.clone();
        let stderr_tail = self.stderr_tail.clone();
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(ref sink) = stderr_sink {
                    sink(line.clone());
                } else {
                    tracing::debug!(target: "claude_cli_stderr", "{line}");
                }
                if let Ok(mut tail) = stderr_tail.lock() {
                    if tail.len() >= STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        });

        self.stdin = Some(stdin);
        self.stdout = Some(stdout);
        *self.process.lock().await = Some(child);
        self.stderr_task = Some(stderr_task);
        self.ready.store(true, Ordering::SeqCst);

        // For string mode, close stdin immediately
        if matches!(self.prompt, PromptInput::String(_)) {
            if let Some(mut stdin) = self.stdin.take() {
                let _ = stdin.shutdown().await;
            }
        }

        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(ClaudeError::transport("Transport is not ready for writing"));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClaudeError::transport("stdin not available"))?;

        stdin
            .write_all(data.as_bytes())
            .await
            .map_err(|e| ClaudeError::transport(format!("Failed to write to stdin: {e}")))?;

        stdin
            .flush()
            .await
            .map_err(|e| ClaudeError::transport(format!("Failed to flush stdin: {e}")))?;

        Ok(())
    }

    async fn end_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| ClaudeError::transport(format!("Failed to close stdin: {e}")))?;
        }
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = self.stdout.take();
        let process = self.process.clone();
        let max_line_size = self.max_line_size;
        let cancel_token = self.cancellation_token.clone();
        let ready = self.ready.clone();
        let stderr_tail = self.stderr_tail.clone();

        let task = tokio::spawn(async move {
            let Some(mut stdout) = stdout else {
                let _ = tx.send(TransportEvent::Error(ClaudeError::connection(
                    "Not connected - stdout not available",
                )));
                return;
            };

            let mut buf: Vec<u8> = Vec::new();
            let mut discarding = false;
            let mut chunk = [0u8; 8192];

            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => {
                        tracing::debug!("Transport read cancelled");
                        break;
                    }
                    result = stdout.read(&mut chunk) => {
                        match result {
                            Ok(0) => break, // EOF
                            Ok(n) => {
                                buf.extend_from_slice(&chunk[..n]);
                                Self::drain_lines(&mut buf, &mut discarding, max_line_size, &tx);
                            }
                            Err(e) => {
                                let _ = tx.send(TransportEvent::Error(ClaudeError::Io(e)));
                                break;
                            }
                        }
                    }
                }
            }

            ready.store(false, Ordering::SeqCst);

            // Report exit exactly once; close() may have taken the child already.
            let code = {
                let mut guard = process.lock().await;
                match guard.take() {
                    Some(mut child) => match child.wait().await {
                        Ok(status) => status.code(),
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to wait for CLI exit");
                            None
                        }
                    },
                    None => None,
                }
            };

            let stderr = Self::stderr_tail_string(&stderr_tail);
            let _ = tx.send(TransportEvent::Exited { code, stderr });
        });

        self.reader_task = Some(task);

        rx
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);

        // Cancel any ongoing reads
        self.cancellation_token.cancel();

        // Close stdin to signal the process to exit gracefully
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        // Give the reader a brief window to finish on its own
        if let Some(task) = self.reader_task.take() {
            tokio::select! {
                _ = task => {}
                () = tokio::time::sleep(std::time::Duration::from_millis(100)) => {}
            }
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        self.stdout = None;

        // Wait for graceful exit, then kill
        let child = self.process.lock().await.take();
        if let Some(mut child) = child {
            let timeout_duration = std::time::Duration::from_secs(5);

            match tokio::time::timeout(timeout_duration, child.wait()).await {
                Ok(Ok(_status)) => {}
                Ok(Err(e)) => {
                    return Err(ClaudeError::Io(e));
                }
                Err(_) => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                }
            }
        }

        Ok(())
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        if let Some(stdin) = self.stdin.take() {
            drop(stdin);
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }

        // Try graceful shutdown (SIGTERM on Unix); best effort from Drop
        if let Ok(mut guard) = self.process.try_lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.start_kill();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_events(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_drain_lines_simple() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut buf = b"{\"type\":\"system\"}\n{\"type\":\"res".to_vec();
        let mut discarding = false;

        SubprocessTransport::drain_lines(&mut buf, &mut discarding, 1024, &tx);

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            TransportEvent::Line(line) => assert_eq!(line, "{\"type\":\"system\"}"),
            other => panic!("expected line, got {other:?}"),
        }
        // Partial trailing data retained
        assert_eq!(buf, b"{\"type\":\"res".to_vec());
        assert!(!discarding);
    }

    #[test]
    fn test_drain_lines_exactly_at_limit_succeeds() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let limit = 16;
        let line = "x".repeat(limit);
        let mut buf = format!("{line}\n").into_bytes();
        let mut discarding = false;

        SubprocessTransport::drain_lines(&mut buf, &mut discarding, limit, &tx);

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Line(l) if l.len() == limit));
    }

    #[test]
    fn test_drain_lines_over_limit_resynchronizes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let limit = 16;
        let mut buf = "y".repeat(limit + 1).into_bytes();
        let mut discarding = false;

        // Oversized partial line: one error, buffer discarded
        SubprocessTransport::drain_lines(&mut buf, &mut discarding, limit, &tx);
        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            TransportEvent::Error(ClaudeError::LineTooLong { limit: 16 })
        ));
        assert!(discarding);
        assert!(buf.is_empty());

        // Rest of the oversized line plus a healthy one: resync on newline
        buf.extend_from_slice(b"yyyy\n{\"ok\":1}\n");
        SubprocessTransport::drain_lines(&mut buf, &mut discarding, limit, &tx);
        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Line(l) if l == "{\"ok\":1}"));
        assert!(!discarding);
    }

    #[test]
    fn test_drain_lines_complete_oversized_line() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let limit = 8;
        let mut buf = format!("{}\nshort\n", "z".repeat(limit + 1)).into_bytes();
        let mut discarding = false;

        SubprocessTransport::drain_lines(&mut buf, &mut discarding, limit, &tx);

        let events = collect_events(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            TransportEvent::Error(ClaudeError::LineTooLong { .. })
        ));
        assert!(matches!(&events[1], TransportEvent::Line(l) if l == "short"));
    }

    #[test]
    fn test_drain_lines_strips_carriage_return() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut buf = b"data\r\n".to_vec();
        let mut discarding = false;

        SubprocessTransport::drain_lines(&mut buf, &mut discarding, 1024, &tx);

        let events = collect_events(&mut rx);
        assert!(matches!(&events[0], TransportEvent::Line(l) if l == "data"));
    }

    #[test]
    fn test_prompt_input_conversions() {
        let _prompt1: PromptInput = "hello".into();
        let _prompt2: PromptInput = String::from("world").into();
    }

    #[test]
    fn test_extra_args_allowlist_rejects_disallowed() {
        let mut options = ClaudeAgentOptions::default();
        options.path_to_claude_code_executable = Some(PathBuf::from("/bin/true"));
        options.extra_args.insert("dangerous-flag".to_string(), None);

        let transport = SubprocessTransport::new(PromptInput::Stream, options)
            .expect("Transport creation should succeed");

        let result = transport.build_command();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Disallowed CLI flags"));
        assert!(err.to_string().contains("dangerous-flag"));
    }

    #[test]
    fn test_extra_args_allowlist_accepts_allowed() {
        let mut options = ClaudeAgentOptions::default();
        options.path_to_claude_code_executable = Some(PathBuf::from("/bin/true"));
        options
            .extra_args
            .insert("timeout".to_string(), Some("30".to_string()));
        options
            .extra_args
            .insert("log-level".to_string(), Some("debug".to_string()));

        let transport = SubprocessTransport::new(PromptInput::Stream, options)
            .expect("Transport creation should succeed");

        assert!(transport.build_command().is_ok());
    }

    #[tokio::test]
    async fn test_dangerous_env_vars_rejected() {
        let mut options = ClaudeAgentOptions::default();
        options.path_to_claude_code_executable = Some(PathBuf::from("/bin/true"));
        options
            .env
            .insert("LD_PRELOAD".to_string(), "/tmp/evil.so".to_string());

        let mut transport = SubprocessTransport::new(PromptInput::Stream, options)
            .expect("Transport creation should succeed");

        let result = transport.connect().await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Dangerous environment variables"));
        assert!(err.to_string().contains("LD_PRELOAD"));
    }

    #[tokio::test]
    async fn test_missing_cwd_rejected() {
        let mut options = ClaudeAgentOptions::default();
        options.path_to_claude_code_executable = Some(PathBuf::from("/bin/true"));
        options.cwd = Some(PathBuf::from("/definitely/not/a/real/path"));

        let mut transport = SubprocessTransport::new(PromptInput::Stream, options)
            .expect("Transport creation should succeed");

        let result = transport.connect().await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Working directory does not exist")
        );
    }
}
