//! LLM integration for ticket-forge.
//!
//! Ticket batches are produced by a chat-completions model. The generation
//! pipeline only depends on the [`LlmProvider`] trait, so any backend (or a
//! scripted mock in tests) can stand in for the real service.
//!
//! ```ignore
//! use ticket_forge::llm::{GenerationRequest, LlmProvider, Message, OpenRouterProvider};
//!
//! let provider = OpenRouterProvider::new(api_key)?;
//! let request = GenerationRequest::new("", vec![Message::user("Generate 15 tickets...")])
//!     .with_temperature(0.9);
//! let response = provider.generate(request).await?;
//! println!("{}", response.first_content().unwrap_or_default());
//! ```

pub mod litellm;
pub mod providers;

pub use litellm::{
    Choice, GenerationRequest, GenerationResponse, LiteLlmClient, LlmProvider, Message, Usage,
};
pub use providers::OpenRouterProvider;
