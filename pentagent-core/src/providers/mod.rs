//! LLM provider integration

pub mod factory;
pub mod ollama;
pub mod openai;
pub mod traits;

pub use factory::create_provider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use traits::{
    CompletionRequest, CompletionResponse, LlmProvider, Message, Role, TokenUsage,
};
