//! Bounded tool-calling conversation loop

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use tablechat_airtable::{Fields, RecordUpdater};
use tablechat_config::Config;
use tablechat_provider::{ChatParams, Message, Provider, ToolCallDef, ToolChoice};
use tablechat_session::ChatMessage;

use crate::context::ContextBuilder;
use crate::tools::{ModifyRecordTool, ToolRegistry};
use crate::{AgentError, Result};

/// Assistant reply used whenever a turn fails
pub const APOLOGY: &str = "An error occurred. Please try again.";

/// The history of a turn with exactly one assistant message appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub messages: Vec<ChatMessage>,
}

/// Drives one model turn, letting the model update the record through tools
pub struct Orchestrator<P: Provider> {
    provider: Arc<P>,
    tools: ToolRegistry,
    context: ContextBuilder,
    model: String,
    max_tokens: u32,
    temperature: f32,
    max_rounds: u32,
}

impl<P: Provider> Orchestrator<P> {
    /// Create with default settings and the given model
    pub fn new(provider: P, updater: Arc<dyn RecordUpdater>, model: impl Into<String>) -> Self {
        let mut orchestrator = Self::with_config(provider, updater, &Config::default());
        orchestrator.model = model.into();
        orchestrator
    }

    pub fn with_config(provider: P, updater: Arc<dyn RecordUpdater>, config: &Config) -> Self {
        Self::from_shared(Arc::new(provider), updater, config)
    }

    /// Create around a provider that is also used elsewhere
    pub fn from_shared(provider: Arc<P>, updater: Arc<dyn RecordUpdater>, config: &Config) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(ModifyRecordTool::new(updater));

        let defaults = &config.agent.defaults;
        let model = if defaults.model.trim().is_empty() {
            provider.default_model()
        } else {
            defaults.model.clone()
        };

        Self {
            provider,
            tools,
            context: ContextBuilder::new()
                .with_default_table(config.airtable.default_table.clone()),
            model,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
            max_rounds: config.max_tool_roundtrips(),
        }
    }

    /// Cap on tool rounds before a text answer is forced
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer the last user message.
    ///
    /// Never fails: the result is `history` plus one assistant message, which is
    /// the apology text when anything goes wrong.
    pub async fn continue_conversation(
        &self,
        history: &[ChatMessage],
        page_type: &str,
        record_id: &str,
        fields: &Fields,
    ) -> ConversationResult {
        debug!(
            "Continuing conversation: page_type={}, record={}, {} message(s)",
            page_type,
            record_id,
            history.len()
        );

        let reply = match self.run_tool_loop(history, record_id, fields).await {
            Ok(text) => text,
            Err(e) => {
                error!("Conversation turn failed: {}", e);
                APOLOGY.to_string()
            }
        };

        let mut messages = history.to_vec();
        messages.push(ChatMessage::assistant(reply));
        ConversationResult { messages }
    }

    async fn run_tool_loop(
        &self,
        history: &[ChatMessage],
        record_id: &str,
        fields: &Fields,
    ) -> Result<String> {
        let mut messages = self.context.build_messages(history, record_id, fields);
        let mut last_results: Vec<String> = Vec::new();
        let mut round = 0;

        loop {
            let tool_choice = if round < self.max_rounds {
                ToolChoice::Auto
            } else {
                info!("Tool round limit ({}) reached, requesting a text answer", self.max_rounds);
                ToolChoice::None
            };
            let forced = tool_choice == ToolChoice::None;

            let response = self
                .provider
                .chat(self.params(messages.clone(), tool_choice))
                .await
                .map_err(|e| AgentError::Provider(e.to_string()))?;

            if forced || !response.has_tool_calls() {
                if let Some(text) = response.text_content() {
                    return Ok(text.to_string());
                }
                debug!("No final text, answering with {} tool result(s)", last_results.len());
                return Ok(last_results.join("\n"));
            }

            round += 1;
            debug!(
                "Tool round {}/{}: {} call(s)",
                round,
                self.max_rounds,
                response.tool_calls.len()
            );

            let calls: Vec<ToolCallDef> = response.tool_calls.iter().map(ToolCallDef::from).collect();
            ContextBuilder::add_assistant_tool_calls(&mut messages, response.content.as_deref(), calls);

            last_results.clear();
            for call in &response.tool_calls {
                debug!("Executing tool: {}", call.name);
                let result = self.tools.execute(&call.name, call.arguments.clone()).await?;
                ContextBuilder::add_tool_result(&mut messages, &call.id, &call.name, &result);
                last_results.push(result);
            }
        }
    }

    fn params(&self, messages: Vec<Message>, tool_choice: ToolChoice) -> ChatParams {
        ChatParams {
            model: self.model.clone(),
            messages,
            tools: self.tools.definitions(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tool_choice,
        }
    }
}
