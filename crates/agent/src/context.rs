//! Prompt assembly for the record assistant

use chrono::Local;

use tablechat_airtable::{fields_to_json, Fields};
use tablechat_provider::{Message, ToolCallDef};
use tablechat_session::ChatMessage;

/// Builds the system instruction and the model context for one turn
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    default_table: Option<String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the table the record most likely lives in
    pub fn with_default_table(mut self, table: Option<String>) -> Self {
        self.default_table = table.filter(|t| !t.trim().is_empty());
        self
    }

    /// System instruction embedding the record's current state
    pub fn build_system_prompt(&self, record_id: &str, fields: &Fields) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        let fields_json = serde_json::to_string_pretty(&fields_to_json(fields))
            .unwrap_or_else(|_| "{}".to_string());

        let mut prompt = format!(
            r#"# tablechat

You are a helpful assistant that helps users view and update an Airtable record.

## Current Time
{}

## Record
The record ID is: {}

Current fields:
```json
{}
```
"#,
            now, record_id, fields_json
        );

        if let Some(table) = &self.default_table {
            prompt.push_str(&format!("\nThe record belongs to the \"{}\" table.\n", table));
        }

        prompt.push_str(
            r#"
## Updating the record
Use the modifyRecord tool to change fields. Pass only the fields that change.
Always confirm changes with the user before applying them."#,
        );

        prompt
    }

    /// System instruction followed by the visible history
    pub fn build_messages(
        &self,
        history: &[ChatMessage],
        record_id: &str,
        fields: &Fields,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(self.build_system_prompt(record_id, fields)));
        messages.extend(history.iter().map(Message::from));
        messages
    }

    pub fn add_tool_result(
        messages: &mut Vec<Message>,
        tool_call_id: &str,
        name: &str,
        result: &str,
    ) {
        messages.push(Message::tool(tool_call_id, name, result));
    }

    pub fn add_assistant_tool_calls(
        messages: &mut Vec<Message>,
        content: Option<&str>,
        tool_calls: Vec<ToolCallDef>,
    ) {
        messages.push(Message::assistant_tool_calls(
            content.map(str::to_string),
            tool_calls,
        ));
    }
}
