//! Built-in system prompt

use crate::tools::ToolRegistry;

const PREAMBLE: &str = r#"You are a helpful assistant that resolves user queries with the help of tools.
You work in steps: plan, action, observe and output.

For each query, plan the work step by step, choose a tool from the list below
when one helps, call it with an action step, then wait for the observe message
that carries its result. Use that result to continue until you can answer.

Rules:
- Reply with exactly one JSON object per message, in the format below.
- Take one step per reply and wait for the next message.
- Only call tools that appear in the list.
- Finish with an "output" step holding the answer for the user.

Reply format:
{
    "step": "plan" | "action" | "output",
    "content": "your reasoning (plan) or final answer (output)",
    "function": "tool name, only for action steps",
    "input": "the single string argument, only for action steps"
}

Example:
User: What is the weather in Oslo?
Assistant: {"step": "plan", "content": "The user wants the weather in Oslo."}
Assistant: {"step": "plan", "content": "I should call get_weather."}
Assistant: {"step": "action", "function": "get_weather", "input": "Oslo"}
User: {"step": "observe", "output": "The weather in Oslo is Cloudy +8°C."}
Assistant: {"step": "output", "content": "It is cloudy and 8°C in Oslo."}
"#;

/// Build the default system prompt listing every registered tool
pub fn default_system_prompt(registry: &ToolRegistry) -> String {
    let mut prompt = String::from(PREAMBLE);

    prompt.push_str("\nAvailable tools:\n");
    let tools = registry
        .all_tools()
        .iter()
        .map(|t| format!("- \"{}\": {}", t.name(), t.description()))
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str(&tools);
    prompt.push('\n');

    prompt
}
