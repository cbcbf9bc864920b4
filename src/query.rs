//! Simple query function for one-shot interactions

use futures::Stream;

use crate::client::ClaudeSDKClient;
use crate::error::Result;
use crate::types::{ClaudeAgentOptions, Message};

/// One-shot query against Claude Code
///
/// Runs a single prompt through a [`ClaudeSDKClient`]: subscribe, send the
/// prompt, close stdin, then stream messages until the terminal `result`
/// frame (or transport exit). The client is closed when the stream finishes
/// or is dropped.
///
/// Because the full client runs underneath, hooks, the permission callback,
/// and in-process MCP tools configured in `options` all work in one-shot
/// mode too.
///
/// # When to use `query()`
/// - Simple one-off prompts ("What is 2+2?")
/// - Batch processing of independent prompts
/// - Automated scripts and CI pipelines
///
/// # When to use `ClaudeSDKClient`
/// - Interactive conversations with follow-ups
/// - When you need interrupts or runtime model switching
/// - Long-running sessions with state
///
/// # Errors
/// Returns error if the CLI cannot be started or the handshake fails.
/// Stream items carry per-message errors.
///
/// # Examples
///
/// ```no_run
/// use claude_agent_sdk::query;
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let stream = query("What is the capital of France?", None).await?;
///     let mut stream = Box::pin(stream);
///
///     while let Some(message) = stream.next().await {
///         println!("{:?}", message?);
///     }
///     Ok(())
/// }
/// ```
///
/// With options:
///
/// ```no_run
/// use claude_agent_sdk::{query, ClaudeAgentOptions};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ClaudeAgentOptions::builder()
///     .system_prompt("You are a helpful coding assistant")
///     .model("haiku")
///     .max_turns(1)
///     .build();
///
/// let stream = query("Write a hello world in Python", Some(options)).await?;
/// let mut stream = Box::pin(stream);
///
/// while let Some(message) = stream.next().await {
///     println!("{:?}", message?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn query(
    prompt: impl Into<String>,
    options: Option<ClaudeAgentOptions>,
) -> Result<impl Stream<Item = Result<Message>>> {
    let options = options.unwrap_or_default();
    let client = ClaudeSDKClient::new(options).await?;

    // Subscribe before sending so the first frames are not missed
    let mut rx = client.subscribe();
    client.send_message(prompt.into()).await?;
    client.end_input().await?;

    let stream = async_stream::stream! {
        while let Some(item) = rx.recv().await {
            let is_result = matches!(&item, Ok(Message::Result { .. }));
            yield item;
            if is_result {
                break;
            }
        }
        if let Err(e) = client.close().await {
            tracing::debug!(error = %e, "Error closing client after query");
        }
    };

    Ok(stream)
}
