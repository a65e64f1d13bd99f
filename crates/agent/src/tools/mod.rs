//! Tools the model may call

pub mod modify_record;

pub use modify_record::{ModifyRecordRequest, ModifyRecordTool, ToolResult, ToolStatus};

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tablechat_provider::Tool;

use crate::AgentError;

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

/// A named capability with a JSON schema
#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    /// Run the tool; the returned text is fed back to the model verbatim
    async fn execute(&self, args: Value) -> crate::Result<String>;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

/// Tools by name
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<Tool> {
        let mut definitions: Vec<Tool> = self
            .tools
            .values()
            .map(|t| to_provider_tool(t.as_ref()))
            .collect();
        definitions.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        definitions
    }

    pub async fn execute(&self, name: &str, args: Value) -> crate::Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        tool.execute(args).await
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
