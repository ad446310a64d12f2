//! Built-in tools for the agent loop

mod run_command;
mod shell;
mod weather;

pub use run_command::{RunCommand, RunCommandTool};
pub use weather::WeatherTool;

use super::registry::ToolRegistry;

/// Create the registry of tools the model may call
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    // Moderate tools (network access)
    registry.register(WeatherTool);

    // Dangerous tools (write/execute)
    registry.register(RunCommandTool);

    registry
}
