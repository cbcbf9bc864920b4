//! Shared test support: a scripted in-memory transport
//!
//! The mock records every line the client writes and lets tests inject
//! CLI-side frames (messages, control requests, exits). Control requests
//! the client issues can be auto-acknowledged per subtype, which is how the
//! initialize handshake completes without a real CLI.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use claude_agent_sdk::error::Result;
use claude_agent_sdk::transport::{Transport, TransportEvent};

type SharedSender = Arc<Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>>;

/// Handle shared between a [`MockTransport`] and the test body
#[derive(Clone)]
pub struct MockHandle {
    written: Arc<Mutex<Vec<Value>>>,
    events: SharedSender,
    auto_responses: Arc<Mutex<HashMap<String, Value>>>,
    ready: Arc<AtomicBool>,
}

impl MockHandle {
    /// Everything the client wrote, parsed
    pub fn written(&self) -> Vec<Value> {
        self.written.lock().unwrap().clone()
    }

    /// Written frames with the given control-request subtype
    pub fn written_requests(&self, subtype: &str) -> Vec<Value> {
        self.written()
            .into_iter()
            .filter(|v| v["type"] == "control_request" && v["request"]["subtype"] == subtype)
            .collect()
    }

    /// Written control responses (SDK answers to CLI-originated requests)
    pub fn written_responses(&self) -> Vec<Value> {
        self.written()
            .into_iter()
            .filter(|v| v["type"] == "control_response")
            .collect()
    }

    /// Feed one line to the client, as if the CLI printed it
    pub fn push_line(&self, value: &Value) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(TransportEvent::Line(value.to_string()));
        }
    }

    /// Feed a raw (possibly invalid) line to the client
    pub fn push_raw_line(&self, line: &str) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(TransportEvent::Line(line.to_string()));
        }
    }

    /// Simulate child exit
    pub fn push_exit(&self, code: Option<i32>, stderr: Option<&str>) {
        self.ready.store(false, Ordering::SeqCst);
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(TransportEvent::Exited {
                code,
                stderr: stderr.map(ToString::to_string),
            });
        }
    }

    /// Auto-acknowledge control requests of `subtype` with `payload`
    pub fn respond_to(&self, subtype: &str, payload: Value) {
        self.auto_responses
            .lock()
            .unwrap()
            .insert(subtype.to_string(), payload);
    }

    /// Stop auto-acknowledging `subtype`
    pub fn ignore(&self, subtype: &str) {
        self.auto_responses.lock().unwrap().remove(subtype);
    }

    /// Send a CLI-originated control request to the SDK
    pub fn push_control_request(&self, request_id: &str, request: Value) {
        self.push_line(&json!({
            "type": "control_request",
            "request_id": request_id,
            "request": request,
        }));
    }

    /// Wait until `predicate` holds or the deadline passes
    pub async fn wait_until(&self, predicate: impl Fn(&MockHandle) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if predicate(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

/// Scripted transport for driving a client without a CLI
pub struct MockTransport {
    handle: MockHandle,
}

impl MockTransport {
    /// A transport that acknowledges the initialize handshake
    pub fn new() -> (Self, MockHandle) {
        let (transport, handle) = Self::silent();
        handle.respond_to("initialize", json!({"commands": [], "output_styles": []}));
        (transport, handle)
    }

    /// A transport that never responds on its own
    pub fn silent() -> (Self, MockHandle) {
        let handle = MockHandle {
            written: Arc::new(Mutex::new(Vec::new())),
            events: Arc::new(Mutex::new(None)),
            auto_responses: Arc::new(Mutex::new(HashMap::new())),
            ready: Arc::new(AtomicBool::new(false)),
        };
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.handle.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        let value: Value = serde_json::from_str(data.trim())
            .unwrap_or_else(|_| json!({"unparseable": data.trim()}));
        self.handle.written.lock().unwrap().push(value.clone());

        if value["type"] == "control_request" {
            let subtype = value["request"]["subtype"].as_str().unwrap_or_default();
            let payload = self
                .handle
                .auto_responses
                .lock()
                .unwrap()
                .get(subtype)
                .cloned();
            if let Some(payload) = payload {
                let request_id = value["request_id"].as_str().unwrap_or_default();
                self.handle.push_line(&json!({
                    "type": "control_response",
                    "response": {
                        "subtype": "success",
                        "request_id": request_id,
                        "response": payload,
                    },
                }));
            }
        }

        Ok(())
    }

    async fn end_input(&mut self) -> Result<()> {
        Ok(())
    }

    fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TransportEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.handle.events.lock().unwrap() = Some(tx);
        rx
    }

    fn is_ready(&self) -> bool {
        self.handle.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.handle.ready.store(false, Ordering::SeqCst);
        // Dropping the sender ends the client's event loop
        self.handle.events.lock().unwrap().take();
        Ok(())
    }
}
