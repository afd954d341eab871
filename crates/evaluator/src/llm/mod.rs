pub mod anthropic_client;
pub mod prompts;

pub use anthropic_client::{AnthropicClient, ContentBlock, RetryPolicy};
pub use prompts::PromptBuilder;
