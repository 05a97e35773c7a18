//! Extension tool backend
//!
//! Named, externally-provided actions behind the same executor contract as
//! shell and file actions. Extensions implement `ExtensionTool` and are
//! looked up by name at execution time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::{BrokerError, BrokerResult, ExecutionResult};

/// Trait for extension-provided actions
#[async_trait]
pub trait ExtensionTool: Send + Sync {
    /// Name the tool is registered and matched under
    fn name(&self) -> &str;

    /// Human-readable description for prompts and listings
    fn description(&self) -> &str;

    /// Perform the action with the given JSON input
    async fn invoke(&self, input: &Value) -> anyhow::Result<String>;
}

/// Registry of extension tools, keyed by name
#[derive(Default)]
pub struct ExtensionRegistry {
    tools: HashMap<String, Arc<dyn ExtensionTool>>,
}

impl ExtensionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension tool
    pub fn register<T: ExtensionTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        tracing::info!("[Extensions] Registering tool: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ExtensionTool>> {
        self.tools.get(name).cloned()
    }

    /// Names of all registered tools
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name
    pub(crate) async fn invoke(&self, name: &str, input: &Value) -> BrokerResult<ExecutionResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| BrokerError::UnknownExtension(name.to_string()))?;

        tracing::info!("[Extensions] Invoking tool: {}", name);
        match tool.invoke(input).await {
            Ok(output) => Ok(ExecutionResult::success(output)),
            Err(e) => Err(BrokerError::execution(format!(
                "Extension tool '{}' failed: {:#}",
                name, e
            ))),
        }
    }
}
