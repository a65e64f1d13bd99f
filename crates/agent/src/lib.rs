//! Conversation core
//!
//! Tool registry, the `modifyRecord` tool, prompt assembly, the bounded
//! tool-calling orchestrator and the chat session controller.

use thiserror::Error;

pub mod chat_session;
pub mod context;
pub mod orchestrator;
pub mod tools;

pub use chat_session::{ChatSession, PageContext};
pub use context::ContextBuilder;
pub use orchestrator::{ConversationResult, Orchestrator, APOLOGY};
pub use tools::{ModifyRecordRequest, ModifyRecordTool, ToolRegistry, ToolResult, ToolStatus, ToolTrait};

/// Conversation errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("invalid tool arguments: {0}")]
    InvalidToolArguments(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("conversation store error: {0}")]
    Store(#[from] tablechat_session::SessionError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
