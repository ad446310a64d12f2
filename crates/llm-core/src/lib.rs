//! llm-core: Chat model clients for the stepwise agent
//!
//! Provides:
//! - Configuration loading (stepwise.toml, .env)
//! - The `ChatModel` boundary (transcript in, one JSON reply out)
//! - OpenAI-compatible and Ollama backends

pub mod chat;
pub mod config;
pub mod ollama;
pub mod openai;

pub use chat::{ChatMessage, ChatModel, Role};
pub use config::{load_dotenv, AgentSettings, Config, ProviderConfig, ProviderKind, ToolSettings};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
