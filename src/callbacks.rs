//! Trait-based callback definitions for hooks and permissions.
//!
//! This module provides idiomatic Rust traits for implementing callbacks.
//! Users can implement these traits on their own types, or use closures
//! via the provided wrapper types.
//!
//! # Example: Implementing `HookCallback`
//!
//! ```no_run
//! use claude_agent_sdk::callbacks::HookCallback;
//! use claude_agent_sdk::types::{HookOutput, HookContext};
//! use claude_agent_sdk::Result;
//! use async_trait::async_trait;
//!
//! struct LoggingHook;
//!
//! #[async_trait]
//! impl HookCallback for LoggingHook {
//!     async fn call(
//!         &self,
//!         input: serde_json::Value,
//!         tool_use_id: Option<String>,
//!         _context: HookContext,
//!     ) -> Result<HookOutput> {
//!         println!("Hook fired for tool use: {:?}", tool_use_id);
//!         Ok(HookOutput::default())
//!     }
//! }
//! ```
//!
//! # Example: Implementing `PermissionCallback`
//!
//! ```no_run
//! use claude_agent_sdk::callbacks::PermissionCallback;
//! use claude_agent_sdk::types::{PermissionResult, ToolPermissionContext};
//! use claude_agent_sdk::Result;
//! use async_trait::async_trait;
//!
//! struct AllowReadOnly;
//!
//! #[async_trait]
//! impl PermissionCallback for AllowReadOnly {
//!     async fn call(
//!         &self,
//!         tool_name: String,
//!         _input: serde_json::Value,
//!         _context: ToolPermissionContext,
//!     ) -> Result<PermissionResult> {
//!         if tool_name == "Read" || tool_name == "Glob" {
//!             Ok(PermissionResult::allow())
//!         } else {
//!             Ok(PermissionResult::deny("Only read operations allowed"))
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{HookContext, HookOutput, PermissionResult, ToolPermissionContext};

// ============================================================================
// Hook Callback Trait
// ============================================================================

/// Trait for hook callbacks.
///
/// Implement this trait to create custom hook handlers that intercept tool
/// usage and other events in the agent loop. The callback id assigned at
/// registration is what the CLI echoes back in `hook_callback` control
/// requests; the function itself never crosses the wire.
#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Called when a hook event occurs.
    ///
    /// # Arguments
    ///
    /// * `input` - The hook input payload (tool input for `PreToolUse`,
    ///   result for `PostToolUse`, etc.)
    /// * `tool_use_id` - Optional tool use ID for tool-related hooks
    /// * `context` - Hook execution context with the cancellation signal
    async fn call(
        &self,
        input: serde_json::Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput>;
}

#[async_trait]
impl HookCallback for Box<dyn HookCallback> {
    async fn call(
        &self,
        input: serde_json::Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        (**self).call(input, tool_use_id, context).await
    }
}

#[async_trait]
impl<T: HookCallback + ?Sized> HookCallback for Arc<T> {
    async fn call(
        &self,
        input: serde_json::Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        (**self).call(input, tool_use_id, context).await
    }
}

// ============================================================================
// Permission Callback Trait
// ============================================================================

/// Trait for permission callbacks.
///
/// The single optional handler consulted on CLI-originated `can_use_tool`
/// requests.
#[async_trait]
pub trait PermissionCallback: Send + Sync {
    /// Called when Claude requests permission to use a tool.
    ///
    /// # Arguments
    ///
    /// * `tool_name` - Name of the tool being requested
    /// * `input` - The tool input parameters
    /// * `context` - Permission context with suggestions and the blocked path
    async fn call(
        &self,
        tool_name: String,
        input: serde_json::Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult>;
}

#[async_trait]
impl PermissionCallback for Box<dyn PermissionCallback> {
    async fn call(
        &self,
        tool_name: String,
        input: serde_json::Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        (**self).call(tool_name, input, context).await
    }
}

#[async_trait]
impl<T: PermissionCallback + ?Sized> PermissionCallback for Arc<T> {
    async fn call(
        &self,
        tool_name: String,
        input: serde_json::Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        (**self).call(tool_name, input, context).await
    }
}

// ============================================================================
// Type aliases
// ============================================================================

/// Type alias for a shared hook callback.
pub type SharedHookCallback = Arc<dyn HookCallback>;

/// Type alias for a shared permission callback.
pub type SharedPermissionCallback = Arc<dyn PermissionCallback>;

// ============================================================================
// Closure-based callback wrappers
// ============================================================================

type BoxedHookFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Result<HookOutput>> + Send>>;
type BoxedPermissionFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<PermissionResult>> + Send>>;

/// Wrapper to convert a closure into a `HookCallback`.
///
/// Prefer [`hook_callback`] for async closures; this type is the underlying
/// adapter.
pub struct FnHookCallback<F>
where
    F: Fn(serde_json::Value, Option<String>, HookContext) -> BoxedHookFuture + Send + Sync,
{
    func: F,
}

impl<F> FnHookCallback<F>
where
    F: Fn(serde_json::Value, Option<String>, HookContext) -> BoxedHookFuture + Send + Sync,
{
    /// Create a new function-based hook callback.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> HookCallback for FnHookCallback<F>
where
    F: Fn(serde_json::Value, Option<String>, HookContext) -> BoxedHookFuture + Send + Sync,
{
    async fn call(
        &self,
        input: serde_json::Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        (self.func)(input, tool_use_id, context).await
    }
}

/// Wrapper to convert a closure into a `PermissionCallback`.
pub struct FnPermissionCallback<F>
where
    F: Fn(String, serde_json::Value, ToolPermissionContext) -> BoxedPermissionFuture + Send + Sync,
{
    func: F,
}

impl<F> FnPermissionCallback<F>
where
    F: Fn(String, serde_json::Value, ToolPermissionContext) -> BoxedPermissionFuture + Send + Sync,
{
    /// Create a new function-based permission callback.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> PermissionCallback for FnPermissionCallback<F>
where
    F: Fn(String, serde_json::Value, ToolPermissionContext) -> BoxedPermissionFuture + Send + Sync,
{
    async fn call(
        &self,
        tool_name: String,
        input: serde_json::Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        (self.func)(tool_name, input, context).await
    }
}

/// Create a shared hook callback from an async closure.
///
/// # Example
///
/// ```no_run
/// use claude_agent_sdk::callbacks::hook_callback;
/// use claude_agent_sdk::types::HookOutput;
///
/// let hook = hook_callback(|_input, tool_use_id, ctx| async move {
///     if ctx.is_cancelled() {
///         return Ok(HookOutput::default());
///     }
///     println!("tool use: {:?}", tool_use_id);
///     Ok(HookOutput::default())
/// });
/// ```
pub fn hook_callback<F, Fut>(f: F) -> SharedHookCallback
where
    F: Fn(serde_json::Value, Option<String>, HookContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<HookOutput>> + Send + 'static,
{
    Arc::new(FnHookCallback::new(move |input, tool_use_id, context| {
        Box::pin(f(input, tool_use_id, context)) as BoxedHookFuture
    }))
}

/// Create a shared permission callback from an async closure.
///
/// # Example
///
/// ```no_run
/// use claude_agent_sdk::callbacks::permission_callback;
/// use claude_agent_sdk::types::PermissionResult;
///
/// let cb = permission_callback(|tool_name, _input, _ctx| async move {
///     match tool_name.as_str() {
///         "Read" | "Glob" => Ok(PermissionResult::allow()),
///         _ => Ok(PermissionResult::deny("tool not allowed")),
///     }
/// });
/// ```
pub fn permission_callback<F, Fut>(f: F) -> SharedPermissionCallback
where
    F: Fn(String, serde_json::Value, ToolPermissionContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<PermissionResult>> + Send + 'static,
{
    Arc::new(FnPermissionCallback::new(move |tool_name, input, context| {
        Box::pin(f(tool_name, input, context)) as BoxedPermissionFuture
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PermissionResultAllow, PermissionResultDeny};

    struct TestHook;

    #[async_trait]
    impl HookCallback for TestHook {
        async fn call(
            &self,
            _input: serde_json::Value,
            _tool_use_id: Option<String>,
            _context: HookContext,
        ) -> Result<HookOutput> {
            Ok(HookOutput::default())
        }
    }

    struct TestPermission {
        allow_all: bool,
    }

    #[async_trait]
    impl PermissionCallback for TestPermission {
        async fn call(
            &self,
            tool_name: String,
            _input: serde_json::Value,
            _context: ToolPermissionContext,
        ) -> Result<PermissionResult> {
            if self.allow_all {
                Ok(PermissionResult::Allow(PermissionResultAllow::default()))
            } else {
                Ok(PermissionResult::Deny(PermissionResultDeny {
                    message: format!("Denied: {tool_name}"),
                    interrupt: false,
                }))
            }
        }
    }

    #[tokio::test]
    async fn test_hook_callback_trait() {
        let hook = TestHook;
        let result = hook
            .call(serde_json::json!({}), None, HookContext::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_permission_callback_trait() {
        let perm = TestPermission { allow_all: true };
        let result = perm
            .call(
                "Read".to_string(),
                serde_json::json!({}),
                ToolPermissionContext::new(vec![]),
            )
            .await;
        assert!(matches!(result.unwrap(), PermissionResult::Allow(_)));
    }

    #[tokio::test]
    async fn test_arc_wrapped_callback() {
        let hook: SharedHookCallback = Arc::new(TestHook);
        let result = hook
            .call(serde_json::json!({}), None, HookContext::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_closure_hook_callback() {
        let callback = hook_callback(|_input, _tool_use_id, ctx| async move {
            let _ = (ctx.is_cancelled(), ctx.session_id, ctx.cwd);
            Ok(HookOutput::default())
        });

        let result = callback
            .call(serde_json::json!({}), None, HookContext::default())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_closure_permission_callback() {
        let callback = permission_callback(|_tool, _input, ctx| async move {
            let _ = (ctx.suggestions, ctx.blocked_path);
            Ok(PermissionResult::allow())
        });

        let result = callback
            .call(
                "Test".to_string(),
                serde_json::json!({}),
                ToolPermissionContext::new(vec![]),
            )
            .await;
        assert!(matches!(result.unwrap(), PermissionResult::Allow(_)));
    }
}
