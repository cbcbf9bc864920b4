//! `ClaudeSDKClient` for bidirectional communication
//!
//! The client is the session actor: it owns the transport and multiplexes
//! one bidirectional stream into three planes:
//!
//! - outbound control requests (`set_model`, `interrupt`, ...) correlated
//!   with their responses through a pending-request table,
//! - inbound control requests from the CLI (hook callbacks, permission
//!   queries, in-process tool invocations) dispatched onto worker tasks,
//! - conversation messages broadcast to any number of subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ClaudeSDKClient                       │
//! │                                                           │
//! │   reader task ──── decode ──┬── control_response ─→ pending table
//! │        │                    ├── control_request ──→ worker tasks ─┐
//! │        │                    └── messages ─────────→ subscribers   │
//! │        │                                                          │
//! │   writer task ←── outbound channel ←── user calls ←───────────────┘
//! │        │
//! │        └──→ transport stdin (single writer, no interleaving)
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The reader task is the only consumer of transport events and the writer
//! task is the only writer to stdin, so outbound lines are serialized and
//! message order is preserved. Callbacks run on spawned workers; a
//! long-running hook never stalls the broadcast.
//!
//! # Example
//!
//! ```no_run
//! use claude_agent_sdk::{ClaudeSDKClient, ClaudeAgentOptions, Message};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ClaudeAgentOptions::default();
//! let client = ClaudeSDKClient::new(options).await?;
//!
//! let mut messages = Box::pin(client.stream_messages());
//! client.send_message("Hello, Claude!").await?;
//!
//! while let Some(message) = messages.next().await {
//!     match message? {
//!         Message::Assistant { message, .. } => {
//!             println!("Response: {:?}", message.content);
//!         }
//!         Message::Result { .. } => break,
//!         _ => {}
//!     }
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::Stream;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::control::{
    InboundControlRequest, InboundFrame, OutboundRequest, RequestIdGenerator, decode_frame,
    encode_error_response, encode_request, encode_success_response, encode_user_message,
    parse_inbound_request,
};
use crate::error::{ClaudeError, Result};
use crate::hooks::HookRegistry;
use crate::mcp::SdkMcpServer;
use crate::message::parse_message;
use crate::permissions::{PermissionManager, encode_permission_result, parse_suggestions};
use crate::transport::{PromptInput, SubprocessTransport, Transport, TransportEvent};
use crate::types::{
    AgentDefinition, ClaudeAgentOptions, HookContext, Message, PermissionMode, SessionId,
    SystemPrompt, ToolName, ToolPermissionContext,
};

/// Capacity of each subscriber's broadcast channel; a subscriber that falls
/// this far behind is dropped rather than stalling the session
const SUBSCRIBER_CAPACITY: usize = 64;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    /// Transport spawned, handshake not yet sent
    Starting,
    /// Initialize request in flight
    Initializing,
    /// Handshake complete, session usable
    Ready,
    /// Interrupt request in flight
    Interrupting,
    /// Closed by the user or by transport exit
    Closed,
    /// Handshake failure or interrupt timeout
    Errored,
}

struct PendingEntry {
    waiter: oneshot::Sender<Result<Value>>,
    request_type: String,
}

type PendingRequests = Arc<StdMutex<HashMap<String, PendingEntry>>>;
type InflightCallbacks = Arc<StdMutex<HashMap<String, CancellationToken>>>;
type SharedStatus = Arc<StdMutex<ClientStatus>>;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Result<Message>>,
}

type SubscriberSet = Arc<StdMutex<Vec<Subscriber>>>;

/// Runtime-mutable session state, fed by the first `system` init frame and
/// by successful control responses
#[derive(Default)]
struct SessionState {
    session_id: Option<SessionId>,
    cwd: Option<String>,
    model: Option<String>,
    permission_mode: Option<PermissionMode>,
    agent: Option<String>,
    /// System prompt of the active agent profile, shadowing the base prompt
    prompt_override: Option<String>,
}

type SharedSession = Arc<StdMutex<SessionState>>;

/// Context handed to the reader task
struct ReaderContext {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    outbound_tx: mpsc::UnboundedSender<String>,
    pending: PendingRequests,
    inflight: InflightCallbacks,
    subscribers: SubscriberSet,
    status: SharedStatus,
    session: SharedSession,
    hook_registry: Arc<HookRegistry>,
    permissions: Arc<PermissionManager>,
    sdk_servers: Arc<HashMap<String, Arc<SdkMcpServer>>>,
    include_partial_messages: bool,
    callback_timeout: Duration,
    cancellation_token: CancellationToken,
}

/// Client for bidirectional communication with Claude Code
///
/// See the [module documentation](crate::client) for the architecture.
pub struct ClaudeSDKClient {
    transport: Arc<Mutex<Box<dyn Transport>>>,
    outbound_tx: mpsc::UnboundedSender<String>,
    pending: PendingRequests,
    subscribers: SubscriberSet,
    ids: Arc<RequestIdGenerator>,
    status: SharedStatus,
    session: SharedSession,
    init_result: Arc<StdMutex<Option<Value>>>,
    permissions: Arc<PermissionManager>,
    agents: HashMap<String, AgentDefinition>,
    base_system_prompt: Option<String>,
    control_timeout: Duration,
    cancellation_token: CancellationToken,
    next_subscriber_id: AtomicU64,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ClaudeSDKClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeSDKClient")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl ClaudeSDKClient {
    /// Create a client backed by a Claude Code CLI subprocess
    ///
    /// Spawns the CLI in streaming mode and runs the initialize handshake.
    ///
    /// # Errors
    /// Returns error if the CLI cannot be found or spawned, or if the
    /// handshake fails or times out.
    pub async fn new(options: ClaudeAgentOptions) -> Result<Self> {
        let cancellation_token = CancellationToken::new();
        let transport = SubprocessTransport::with_cancellation_token(
            PromptInput::Stream,
            options.clone(),
            Some(cancellation_token.child_token()),
        )?;
        Self::start(Box::new(transport), options, cancellation_token).await
    }

    /// Create a client over an already-constructed transport
    ///
    /// Used for alternate transports and for driving the client from tests
    /// with a scripted transport.
    ///
    /// # Errors
    /// Returns error if the transport fails to connect or the handshake
    /// fails.
    pub async fn with_transport(
        transport: Box<dyn Transport>,
        options: ClaudeAgentOptions,
    ) -> Result<Self> {
        Self::start(transport, options, CancellationToken::new()).await
    }

    async fn start(
        mut transport: Box<dyn Transport>,
        options: ClaudeAgentOptions,
        cancellation_token: CancellationToken,
    ) -> Result<Self> {
        transport.connect().await?;
        let events = transport.subscribe();

        let hook_registry = Arc::new(match options.hooks {
            Some(ref config) => HookRegistry::from_config(config),
            None => HookRegistry::empty(),
        });

        let permissions = Arc::new(PermissionManager::new(
            options.can_use_tool.clone(),
            options.allowed_tools.clone(),
            options.disallowed_tools.clone(),
            options.control_timeout(),
        ));

        let base_system_prompt = match options.system_prompt {
            Some(SystemPrompt::String(ref prompt)) => Some(prompt.clone()),
            _ => None,
        };

        let sdk_servers = Arc::new(options.mcp_servers.sdk_servers());

        let transport = Arc::new(Mutex::new(transport));
        let pending: PendingRequests = Arc::new(StdMutex::new(HashMap::new()));
        let inflight: InflightCallbacks = Arc::new(StdMutex::new(HashMap::new()));
        let subscribers: SubscriberSet = Arc::new(StdMutex::new(Vec::new()));
        let status: SharedStatus = Arc::new(StdMutex::new(ClientStatus::Starting));
        let session: SharedSession = Arc::new(StdMutex::new(SessionState::default()));

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let writer_task = tokio::spawn(Self::writer_task(transport.clone(), outbound_rx));

        let reader_ctx = ReaderContext {
            events,
            outbound_tx: outbound_tx.clone(),
            pending: pending.clone(),
            inflight,
            subscribers: subscribers.clone(),
            status: status.clone(),
            session: session.clone(),
            hook_registry: hook_registry.clone(),
            permissions: permissions.clone(),
            sdk_servers: sdk_servers.clone(),
            include_partial_messages: options.include_partial_messages,
            callback_timeout: options.control_timeout(),
            cancellation_token: cancellation_token.clone(),
        };
        let reader_task = tokio::spawn(Self::reader_task(reader_ctx));

        let client = Self {
            transport,
            outbound_tx,
            pending,
            subscribers,
            ids: Arc::new(RequestIdGenerator::new()),
            status,
            session,
            init_result: Arc::new(StdMutex::new(None)),
            permissions,
            agents: options.agents.clone().unwrap_or_default(),
            base_system_prompt,
            control_timeout: options.control_timeout(),
            cancellation_token,
            next_subscriber_id: AtomicU64::new(0),
            reader_task: Some(reader_task),
            writer_task: Some(writer_task),
        };

        if let Err(e) = client
            .initialize_handshake(&hook_registry, &sdk_servers)
            .await
        {
            // Handshake failure is fatal; tear the transport down but keep
            // the errored status for anyone still holding the client
            client.cancellation_token.cancel();
            let mut transport_guard = client.transport.lock().await;
            let _ = transport_guard.close().await;
            drop(transport_guard);
            return Err(e);
        }

        Ok(client)
    }

    /// Send the initialize request and wait for the CLI to acknowledge
    async fn initialize_handshake(
        &self,
        hook_registry: &HookRegistry,
        sdk_servers: &HashMap<String, Arc<SdkMcpServer>>,
    ) -> Result<()> {
        self.set_status(ClientStatus::Initializing);

        let sdk_mcp_servers = if sdk_servers.is_empty() {
            None
        } else {
            let declarations: serde_json::Map<String, Value> = sdk_servers
                .iter()
                .map(|(name, server)| (name.clone(), server.declaration()))
                .collect();
            Some(Value::Object(declarations))
        };

        let request = OutboundRequest::Initialize {
            hooks: hook_registry.init_payload(),
            sdk_mcp_servers,
        };

        match self.send_control_request(request).await {
            Ok(result) => {
                if let Ok(mut guard) = self.init_result.lock() {
                    *guard = Some(result);
                }
                self.set_status(ClientStatus::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Initialize handshake failed");
                self.set_status(ClientStatus::Errored);
                Err(e)
            }
        }
    }

    // ========================================================================
    // Background tasks
    // ========================================================================

    /// Single writer to transport stdin; serializes all outbound lines
    async fn writer_task(
        transport: Arc<Mutex<Box<dyn Transport>>>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
    ) {
        while let Some(line) = outbound_rx.recv().await {
            let mut transport_guard = transport.lock().await;
            if let Err(e) = transport_guard.write(&line).await {
                tracing::warn!(error = %e, "Failed to write to transport");
            }
        }
    }

    /// Single consumer of transport events; classifies frames and dispatches
    async fn reader_task(mut ctx: ReaderContext) {
        while let Some(event) = ctx.events.recv().await {
            match event {
                TransportEvent::Line(line) => match decode_frame(&line) {
                    Ok(InboundFrame::ControlResponse(frame)) => {
                        let request_id = frame.request_id().as_str().to_string();
                        let entry = ctx
                            .pending
                            .lock()
                            .ok()
                            .and_then(|mut guard| guard.remove(&request_id));
                        match entry {
                            Some(entry) => {
                                let _ = entry.waiter.send(frame.into_result());
                            }
                            None => {
                                // Response for a request we never issued (or
                                // one that already timed out); ignore it
                                tracing::debug!(request_id = %request_id, "Ignoring unmatched control response");
                            }
                        }
                    }
                    Ok(InboundFrame::ControlRequest {
                        request_id,
                        request,
                    }) => {
                        Self::spawn_control_request_handler(&ctx, request_id, request);
                    }
                    Ok(InboundFrame::ControlCancelRequest { request_id }) => {
                        let token = ctx
                            .inflight
                            .lock()
                            .ok()
                            .and_then(|guard| guard.get(&request_id).cloned());
                        match token {
                            Some(token) => {
                                tracing::debug!(request_id = %request_id, "Cancelling in-flight callback");
                                token.cancel();
                            }
                            None => {
                                tracing::debug!(
                                    request_id = %request_id,
                                    "Cancel request matched no in-flight callback, ignoring"
                                );
                            }
                        }
                    }
                    Ok(InboundFrame::Message(value)) => {
                        Self::handle_sdk_message(&ctx, value);
                    }
                    Err(e) => {
                        // Line-level decode failures are recoverable; report
                        // and keep the session alive
                        tracing::warn!(error = %e, "Failed to decode line from CLI");
                        Self::broadcast_error(&ctx.subscribers, &e);
                    }
                },
                TransportEvent::Error(e) => {
                    tracing::warn!(error = %e, "Transport error");
                    Self::broadcast_error(&ctx.subscribers, &e);
                }
                TransportEvent::Exited { code, stderr } => {
                    Self::handle_transport_exit(&ctx, code, stderr);
                    return;
                }
            }
        }

        // Event channel closed without an exit event: the transport was torn
        // down locally. Fail the waiters and end subscriber streams.
        Self::fail_pending(&ctx.pending);
        Self::cancel_inflight(&ctx.inflight);
        ctx.subscribers.lock().map(|mut s| s.clear()).ok();
    }

    fn handle_sdk_message(ctx: &ReaderContext, value: Value) {
        match parse_message(value) {
            Ok(msg) => {
                Self::update_session_state(&ctx.session, &msg);

                if matches!(msg, Message::StreamEvent { .. }) && !ctx.include_partial_messages {
                    return;
                }

                Self::broadcast_message(&ctx.subscribers, &msg);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse message");
                Self::broadcast_error(&ctx.subscribers, &e);
            }
        }
    }

    fn update_session_state(session: &SharedSession, msg: &Message) {
        let Ok(mut state) = session.lock() else {
            return;
        };

        match msg {
            Message::System { subtype, data } if subtype == "init" => {
                if state.session_id.is_none() {
                    state.session_id = data
                        .get("session_id")
                        .and_then(Value::as_str)
                        .map(SessionId::from);
                }
                state.cwd = data
                    .get("cwd")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .or(state.cwd.take());
                if let Some(model) = data.get("model").and_then(Value::as_str) {
                    state.model = Some(model.to_string());
                }
                if let Some(mode) = data.get("permissionMode") {
                    if let Ok(mode) = serde_json::from_value::<PermissionMode>(mode.clone()) {
                        state.permission_mode = Some(mode);
                    }
                }
            }
            Message::Result { session_id, .. } => {
                if state.session_id.is_none() {
                    state.session_id = Some(session_id.clone());
                }
            }
            _ => {}
        }
    }

    fn handle_transport_exit(ctx: &ReaderContext, code: Option<i32>, stderr: Option<String>) {
        let abnormal = !matches!(code, Some(0));

        if let Ok(mut status) = ctx.status.lock() {
            if *status != ClientStatus::Closed {
                *status = if abnormal {
                    ClientStatus::Errored
                } else {
                    ClientStatus::Closed
                };
            }
        }

        Self::fail_pending(&ctx.pending);
        Self::cancel_inflight(&ctx.inflight);

        if abnormal {
            let error = ClaudeError::process(
                "Claude Code exited unexpectedly",
                code.unwrap_or(-1),
                stderr,
            );
            tracing::warn!(error = %error, "Transport exited abnormally");
            Self::broadcast_error(&ctx.subscribers, &error);
        }

        // Dropping the senders ends every subscriber stream
        ctx.subscribers.lock().map(|mut s| s.clear()).ok();
    }

    /// Fail every pending waiter with a transport-closed error
    fn fail_pending(pending: &PendingRequests) {
        let entries: Vec<PendingEntry> = match pending.lock() {
            Ok(mut guard) => guard.drain().map(|(_, entry)| entry).collect(),
            Err(_) => return,
        };
        for entry in entries {
            let _ = entry
                .waiter
                .send(Err(ClaudeError::control_closed(entry.request_type)));
        }
    }

    fn cancel_inflight(inflight: &InflightCallbacks) {
        if let Ok(guard) = inflight.lock() {
            for token in guard.values() {
                token.cancel();
            }
        }
    }

    /// Run one CLI-originated control request on a worker task
    ///
    /// The worker is bounded by the callback deadline and carries a child
    /// cancellation token registered under the request id so a
    /// `control_cancel_request` can abort it. The response is queued on the
    /// writer channel when the work finishes.
    fn spawn_control_request_handler(ctx: &ReaderContext, request_id: String, request: Value) {
        let token = ctx.cancellation_token.child_token();
        if let Ok(mut guard) = ctx.inflight.lock() {
            guard.insert(request_id.clone(), token.clone());
        }

        let outbound_tx = ctx.outbound_tx.clone();
        let inflight = ctx.inflight.clone();
        let hook_registry = ctx.hook_registry.clone();
        let permissions = ctx.permissions.clone();
        let sdk_servers = ctx.sdk_servers.clone();
        let session = ctx.session.clone();
        let deadline = ctx.callback_timeout;

        tokio::spawn(async move {
            let dispatch = Self::dispatch_control_request(
                &request,
                &hook_registry,
                &permissions,
                &sdk_servers,
                &session,
                token.clone(),
            );

            let outcome = tokio::select! {
                () = token.cancelled() => {
                    // Cancelled by the CLI or by close(); the requester no
                    // longer wants an answer
                    tracing::debug!(request_id = %request_id, "Control request cancelled");
                    None
                }
                result = tokio::time::timeout(deadline, dispatch) => Some(match result {
                    Ok(result) => result,
                    Err(_elapsed) => Err(ClaudeError::control_timeout(
                        deadline.as_millis() as u64,
                        "inbound control request",
                    )),
                }),
            };

            if let Ok(mut guard) = inflight.lock() {
                guard.remove(&request_id);
            }

            let Some(result) = outcome else {
                return;
            };

            let line = match result {
                Ok(payload) => encode_success_response(&request_id, payload),
                Err(e) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Control request handler failed");
                    encode_error_response(&request_id, &e.to_string())
                }
            };

            match line {
                Ok(line) => {
                    let _ = outbound_tx.send(line);
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Failed to encode control response");
                }
            }
        });
    }

    async fn dispatch_control_request(
        request: &Value,
        hook_registry: &HookRegistry,
        permissions: &PermissionManager,
        sdk_servers: &HashMap<String, Arc<SdkMcpServer>>,
        session: &SharedSession,
        token: CancellationToken,
    ) -> Result<Value> {
        let (session_id, cwd) = {
            match session.lock() {
                Ok(state) => (
                    state.session_id.as_ref().map(ToString::to_string),
                    state.cwd.clone(),
                ),
                Err(_) => (None, None),
            }
        };

        match parse_inbound_request(request)? {
            InboundControlRequest::HookCallback {
                callback_id,
                input,
                tool_use_id,
            } => {
                let Some(callback) = hook_registry.lookup(&callback_id) else {
                    return Err(ClaudeError::hook(format!(
                        "No hook callback registered for id '{callback_id}'"
                    )));
                };

                let context = HookContext::new(session_id, cwd, Some(token));
                let output = callback.call(input, tool_use_id, context).await?;
                serde_json::to_value(&output)
                    .map_err(|e| ClaudeError::json_encode(format!("hook output: {e}")))
            }
            InboundControlRequest::CanUseTool {
                tool_name,
                input,
                permission_suggestions,
                blocked_path,
            } => {
                let context = ToolPermissionContext {
                    session_id,
                    suggestions: parse_suggestions(permission_suggestions),
                    blocked_path,
                    cancellation_token: Some(token),
                };

                let result = permissions
                    .can_use_tool(&tool_name, input.clone(), context)
                    .await?;
                Ok(encode_permission_result(&result, &input))
            }
            InboundControlRequest::McpMessage {
                server_name,
                message,
            } => {
                let Some(server) = sdk_servers.get(&server_name) else {
                    return Err(ClaudeError::mcp(format!(
                        "No SDK MCP server named '{server_name}'"
                    )));
                };
                server.handle_message(&message).await
            }
            InboundControlRequest::Other { subtype } => Err(ClaudeError::control_protocol(
                format!("Unsupported control request subtype: {subtype}"),
            )),
        }
    }

    // ========================================================================
    // Broadcast
    // ========================================================================

    fn broadcast_message(subscribers: &SubscriberSet, msg: &Message) {
        Self::broadcast_with(subscribers, || Ok(msg.clone()));
    }

    fn broadcast_error(subscribers: &SubscriberSet, error: &ClaudeError) {
        Self::broadcast_with(subscribers, || Err(Self::clone_broadcast_error(error)));
    }

    fn broadcast_with(subscribers: &SubscriberSet, make_item: impl Fn() -> Result<Message>) {
        let Ok(mut guard) = subscribers.lock() else {
            return;
        };
        guard.retain(|subscriber| match subscriber.tx.try_send(make_item()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    subscriber = subscriber.id,
                    reason = "lag",
                    "Dropping subscriber that fell behind the broadcast"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Errors are broadcast to several subscribers; rebuild the clonable
    /// variants and flatten the rest into transport errors
    fn clone_broadcast_error(error: &ClaudeError) -> ClaudeError {
        match error {
            ClaudeError::Process {
                message,
                exit_code,
                stderr,
            } => ClaudeError::process(message.clone(), *exit_code, stderr.clone()),
            ClaudeError::MessageParse { message, data } => {
                ClaudeError::message_parse(message.clone(), data.clone())
            }
            ClaudeError::LineTooLong { limit } => ClaudeError::LineTooLong { limit: *limit },
            other => ClaudeError::transport(other.to_string()),
        }
    }

    // ========================================================================
    // Control plane
    // ========================================================================

    async fn send_control_request(&self, request: OutboundRequest) -> Result<Value> {
        self.ensure_usable()?;

        let request_type = request.subtype().to_string();
        let (request_id, line) = encode_request(&self.ids, &request)?;
        let (waiter_tx, waiter_rx) = oneshot::channel();

        {
            let mut guard = self
                .pending
                .lock()
                .map_err(|_| ClaudeError::control_protocol("pending table poisoned"))?;
            guard.insert(
                request_id.as_str().to_string(),
                PendingEntry {
                    waiter: waiter_tx,
                    request_type: request_type.clone(),
                },
            );
        }

        if self.outbound_tx.send(line).is_err() {
            if let Ok(mut guard) = self.pending.lock() {
                guard.remove(request_id.as_str());
            }
            return Err(ClaudeError::control_closed(request_type));
        }

        match tokio::time::timeout(self.control_timeout, waiter_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_recv)) => Err(ClaudeError::control_closed(request_type)),
            Err(_elapsed) => {
                if let Ok(mut guard) = self.pending.lock() {
                    guard.remove(request_id.as_str());
                }
                Err(ClaudeError::control_timeout(
                    self.control_timeout.as_millis() as u64,
                    request_type,
                ))
            }
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.status() {
            ClientStatus::Closed | ClientStatus::Errored => Err(ClaudeError::not_connected()),
            _ => Ok(()),
        }
    }

    fn set_status(&self, status: ClientStatus) {
        if let Ok(mut guard) = self.status.lock() {
            *guard = status;
        }
    }

    // ========================================================================
    // Public API
    // ========================================================================

    /// Send a user message
    ///
    /// The message carries the current `session_id` (or `"default"` before
    /// the first init frame) and does not wait for a response.
    ///
    /// # Errors
    /// Returns error if the client is closed or the message cannot be queued.
    pub async fn send_message(&self, content: impl Into<String>) -> Result<()> {
        self.ensure_usable()?;

        let session_id = self
            .session_id()
            .map_or_else(|| "default".to_string(), |id| id.to_string());

        let line = encode_user_message(&content.into(), &session_id, None)?;
        self.outbound_tx
            .send(line)
            .map_err(|_| ClaudeError::transport("Outbound channel closed"))
    }

    /// Send a raw user-message map
    ///
    /// Injects the current `session_id` when the map does not carry one.
    ///
    /// # Errors
    /// Returns error if the client is closed or the map cannot be encoded.
    pub async fn send_user_message(&self, mut message: Value) -> Result<()> {
        self.ensure_usable()?;

        let Some(map) = message.as_object_mut() else {
            return Err(ClaudeError::invalid_config(
                "user message must be a JSON object",
            ));
        };
        if !map.contains_key("session_id") {
            let session_id = self
                .session_id()
                .map_or_else(|| "default".to_string(), |id| id.to_string());
            map.insert("session_id".to_string(), Value::String(session_id));
        }

        let line = serde_json::to_string(&message)
            .map_err(|e| ClaudeError::json_encode(format!("user message: {e}")))?;
        self.outbound_tx
            .send(format!("{line}\n"))
            .map_err(|_| ClaudeError::transport("Outbound channel closed"))
    }

    /// Subscribe to the broadcast of conversation messages
    ///
    /// The receiver sees messages arriving after this call. It ends when the
    /// client closes or the transport exits; a subscriber that falls a full
    /// channel (64 messages) behind is dropped.
    pub fn subscribe(&self) -> mpsc::Receiver<Result<Message>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.subscribers.lock() {
            guard.push(Subscriber { id, tx });
        }
        rx
    }

    /// Stream conversation messages until the end of the current turn
    ///
    /// The stream yields messages from the moment of the call and finishes
    /// after the next `result` frame, or when the transport exits.
    #[must_use = "streams do nothing unless consumed"]
    pub fn stream_messages(&self) -> impl Stream<Item = Result<Message>> + Send + use<> {
        let mut rx = self.subscribe();
        async_stream::stream! {
            while let Some(item) = rx.recv().await {
                let is_result = matches!(&item, Ok(Message::Result { .. }));
                yield item;
                if is_result {
                    break;
                }
            }
        }
    }

    /// Switch the active model
    ///
    /// Blocks until the CLI acknowledges (or the deadline passes) and returns
    /// the resolved model name.
    ///
    /// # Errors
    /// Returns error on timeout, transport exit, or CLI rejection.
    pub async fn set_model(&self, model: impl Into<String>) -> Result<String> {
        let model = model.into();
        let result = self
            .send_control_request(OutboundRequest::SetModel {
                model: model.clone(),
            })
            .await?;

        let resolved = result
            .get("model")
            .and_then(Value::as_str)
            .map_or(model, ToString::to_string);

        if let Ok(mut state) = self.session.lock() {
            state.model = Some(resolved.clone());
        }
        Ok(resolved)
    }

    /// Switch the permission mode
    ///
    /// # Errors
    /// Returns error on timeout, transport exit, or CLI rejection.
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> Result<()> {
        self.send_control_request(OutboundRequest::SetPermissionMode { mode })
            .await?;

        if let Ok(mut state) = self.session.lock() {
            state.permission_mode = Some(mode);
        }
        Ok(())
    }

    /// Switch the active agent profile
    ///
    /// Looks the profile up in `options.agents` and makes its overrides
    /// effective: the model change is forwarded as a control request, the
    /// profile's tool list becomes the effective allow set for permission
    /// checks, and the profile's prompt shadows the base system prompt. A
    /// profile without a tool list restores the base configuration.
    ///
    /// # Errors
    /// Returns error when the profile is unknown or a forwarded control
    /// request fails; on failure the previous profile stays in effect.
    pub async fn set_agent(&self, name: impl AsRef<str>) -> Result<()> {
        let name = name.as_ref();
        let Some(agent) = self.agents.get(name).cloned() else {
            return Err(ClaudeError::invalid_config(format!(
                "Unknown agent profile: '{name}'"
            )));
        };

        if let Some(ref model) = agent.model {
            self.set_model(model.clone()).await?;
        }

        self.permissions.set_agent_tools(
            agent
                .tools
                .map(|tools| tools.into_iter().map(ToolName::from).collect()),
        );

        if let Ok(mut state) = self.session.lock() {
            state.agent = Some(name.to_string());
            state.prompt_override = Some(agent.prompt);
        }
        Ok(())
    }

    /// Interrupt the current turn
    ///
    /// The session goes back to ready on acknowledgement; a timed-out
    /// interrupt leaves the session errored.
    ///
    /// # Errors
    /// Returns error on timeout or transport exit.
    pub async fn interrupt(&self) -> Result<()> {
        self.ensure_usable()?;
        self.set_status(ClientStatus::Interrupting);

        match self.send_control_request(OutboundRequest::Interrupt).await {
            Ok(_) => {
                self.set_status(ClientStatus::Ready);
                Ok(())
            }
            Err(e @ ClaudeError::ControlTimeout { .. }) => {
                self.set_status(ClientStatus::Errored);
                Err(e)
            }
            Err(e) => {
                if self.status() == ClientStatus::Interrupting {
                    self.set_status(ClientStatus::Ready);
                }
                Err(e)
            }
        }
    }

    /// Rewind tracked files to their state at a user message
    ///
    /// # Errors
    /// Returns error on timeout, transport exit, or CLI rejection.
    pub async fn rewind_files(&self, user_message_id: impl Into<String>) -> Result<()> {
        self.send_control_request(OutboundRequest::RewindFiles {
            user_message_id: user_message_id.into(),
        })
        .await?;
        Ok(())
    }

    /// Close stdin, signalling the CLI that no further input follows
    ///
    /// # Errors
    /// Returns error if closing the input stream fails.
    pub async fn end_input(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport.end_input().await
    }

    /// Close the client and release all resources
    ///
    /// Cancels in-flight callbacks, fails every pending control request with
    /// a closed error, ends subscriber streams, and tears down the child
    /// process. Idempotent.
    ///
    /// # Errors
    /// Returns error if transport cleanup fails.
    pub async fn close(&self) -> Result<()> {
        self.set_status(ClientStatus::Closed);
        self.cancellation_token.cancel();

        Self::fail_pending(&self.pending);
        self.subscribers.lock().map(|mut s| s.clear()).ok();

        let mut transport = self.transport.lock().await;
        transport.close().await
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current lifecycle status
    #[must_use]
    pub fn status(&self) -> ClientStatus {
        self.status
            .lock()
            .map_or(ClientStatus::Errored, |guard| *guard)
    }

    /// Session id assigned by the first `system` init frame
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.lock().ok()?.session_id.clone()
    }

    /// Currently effective model, if known
    #[must_use]
    pub fn current_model(&self) -> Option<String> {
        self.session.lock().ok()?.model.clone()
    }

    /// Currently effective permission mode, if known
    #[must_use]
    pub fn current_permission_mode(&self) -> Option<PermissionMode> {
        self.session.lock().ok()?.permission_mode
    }

    /// Currently active agent profile, if one was selected
    #[must_use]
    pub fn current_agent(&self) -> Option<String> {
        self.session.lock().ok()?.agent.clone()
    }

    /// Tools allowed right now: the active agent profile's list, or the
    /// configured `allowed_tools`
    #[must_use]
    pub fn effective_allowed_tools(&self) -> Vec<ToolName> {
        self.permissions.effective_allowed_tools()
    }

    /// System prompt in effect: the active agent profile's prompt, falling
    /// back to the prompt configured in the options
    #[must_use]
    pub fn effective_system_prompt(&self) -> Option<String> {
        let prompt_override = self.session.lock().ok()?.prompt_override.clone();
        prompt_override.or_else(|| self.base_system_prompt.clone())
    }

    /// Capabilities reported by the CLI in the initialize response
    #[must_use]
    pub fn capabilities(&self) -> Option<Value> {
        self.init_result.lock().ok()?.clone()
    }

    /// True while the session can accept calls
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(
            self.status(),
            ClientStatus::Ready | ClientStatus::Interrupting
        )
    }
}

impl Drop for ClaudeSDKClient {
    fn drop(&mut self) {
        // Cancel callbacks and transport reads; the background tasks exit
        // when their channels close
        self.cancellation_token.cancel();
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_broadcast_error_preserves_process_fields() {
        let original = ClaudeError::process("gone", 3, Some("stderr tail".to_string()));
        match ClaudeSDKClient::clone_broadcast_error(&original) {
            ClaudeError::Process {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr.as_deref(), Some("stderr tail"));
            }
            other => panic!("expected process error, got {other:?}"),
        }
    }

    #[test]
    fn test_clone_broadcast_error_flattens_unclonable() {
        let original = ClaudeError::Io(std::io::Error::other("pipe broke"));
        match ClaudeSDKClient::clone_broadcast_error(&original) {
            ClaudeError::Transport(msg) => assert!(msg.contains("pipe broke")),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_update_session_state_from_init() {
        let session: SharedSession = Arc::new(StdMutex::new(SessionState::default()));
        let msg: Message = serde_json::from_value(serde_json::json!({
            "type": "system",
            "subtype": "init",
            "session_id": "sess-7",
            "cwd": "/work",
            "model": "haiku",
            "permissionMode": "plan"
        }))
        .unwrap();

        ClaudeSDKClient::update_session_state(&session, &msg);

        let state = session.lock().unwrap();
        assert_eq!(state.session_id.as_ref().unwrap().as_str(), "sess-7");
        assert_eq!(state.cwd.as_deref(), Some("/work"));
        assert_eq!(state.model.as_deref(), Some("haiku"));
        assert_eq!(state.permission_mode, Some(PermissionMode::Plan));
    }

    #[test]
    fn test_session_id_stable_across_inits() {
        let session: SharedSession = Arc::new(StdMutex::new(SessionState::default()));
        let first: Message = serde_json::from_value(serde_json::json!({
            "type": "system", "subtype": "init", "session_id": "sess-a"
        }))
        .unwrap();
        let second: Message = serde_json::from_value(serde_json::json!({
            "type": "system", "subtype": "init", "session_id": "sess-b"
        }))
        .unwrap();

        ClaudeSDKClient::update_session_state(&session, &first);
        ClaudeSDKClient::update_session_state(&session, &second);

        assert_eq!(
            session.lock().unwrap().session_id.as_ref().unwrap().as_str(),
            "sess-a"
        );
    }

    #[test]
    fn test_broadcast_drops_lagging_subscriber() {
        let subscribers: SubscriberSet = Arc::new(StdMutex::new(Vec::new()));
        let (tx, _rx) = mpsc::channel(1);
        subscribers.lock().unwrap().push(Subscriber { id: 0, tx });

        let msg: Message = serde_json::from_value(serde_json::json!({
            "type": "result", "subtype": "success", "is_error": false, "session_id": "s"
        }))
        .unwrap();

        // First send fills the capacity-1 channel, second drops the subscriber
        ClaudeSDKClient::broadcast_message(&subscribers, &msg);
        assert_eq!(subscribers.lock().unwrap().len(), 1);
        ClaudeSDKClient::broadcast_message(&subscribers, &msg);
        assert_eq!(subscribers.lock().unwrap().len(), 0);
    }
}
