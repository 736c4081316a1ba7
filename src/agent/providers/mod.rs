//! LLM provider implementations.

pub mod anthropic;
#[cfg(feature = "openai")]
pub mod openai;

pub use anthropic::AnthropicProvider;
#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;
