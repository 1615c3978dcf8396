//! Client-side tools the remote agent can invoke mid-conversation.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

/// A locally executed tool, dispatched by name.
#[async_trait]
pub trait ClientTool: Send + Sync {
    fn name(&self) -> &str;
    async fn call(&self, params: Value) -> Result<Value, String>;
}

/// Registry of client tools.
pub struct ClientTools {
    tools: HashMap<String, Box<dyn ClientTool>>,
}

impl ClientTools {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Box<dyn ClientTool>) {
        log::info!("Registered client tool: {}", tool.name());
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Dispatch a tool call from the server. An unknown name is an error
    /// result reported back to the agent, never a panic.
    pub async fn dispatch(&self, name: &str, params: Value) -> Result<Value, String> {
        match self.tools.get(name) {
            Some(tool) => tool.call(params).await,
            None => Err(format!("Tool {} not found", name)),
        }
    }
}

impl Default for ClientTools {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints the agent-supplied message on the local console.
pub struct LogMessage;

#[async_trait]
impl ClientTool for LogMessage {
    fn name(&self) -> &str {
        "logMessage"
    }

    async fn call(&self, params: Value) -> Result<Value, String> {
        let message = params.get("message").and_then(|m| m.as_str()).unwrap_or("");
        println!("{}", message);
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn dispatches_registered_tool() {
        let mut tools = ClientTools::new();
        tools.register(Box::new(LogMessage));

        let result = tools
            .dispatch("logMessage", json!({"message": "hi"}))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let tools = ClientTools::new();
        let err = tools.dispatch("doesNotExist", json!({})).await.unwrap_err();
        assert_eq!(err, "Tool doesNotExist not found");
    }

    #[tokio::test]
    async fn missing_message_parameter_is_tolerated() {
        let result = LogMessage.call(json!({})).await.unwrap();
        assert_eq!(result, Value::Null);
    }
}
