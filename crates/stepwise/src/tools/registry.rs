//! Tool registry for managing available tools

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::{SessionContext, Tool};

/// Registry of available tools, read-only once the session starts
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names, sorted
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get all tools, sorted by name
    pub fn all_tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Run a tool and return its observation string.
    ///
    /// Returns `None` only when `name` is not registered. A tool error is
    /// folded into an `"Error: <message>"` observation, so callers see one
    /// string either way.
    #[instrument(skip(self, input, ctx), fields(tool = %name))]
    pub async fn invoke(&self, name: &str, input: &str, ctx: &mut SessionContext) -> Option<String> {
        let tool = self.get(name)?;

        info!(security_level = %tool.security_level(), input_len = input.len(), "Executing tool");
        let output = match tool.execute(input, ctx).await {
            Ok(output) => {
                info!(output_len = output.len(), "Tool finished");
                output
            }
            Err(e) => {
                warn!(error = %e, "Tool execution error");
                format!("Error: {:#}", e)
            }
        };

        Some(output)
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .finish()
    }
}
