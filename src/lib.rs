//! ticket-forge: synthetic IT support ticket dataset generator.
//!
//! Asks an LLM for batches of ticket lines, keeps the lines that match the
//! ticket grammar, makes identifiers unique within the run and appends the
//! result to a flat text file until a target count is reached.

pub mod cli;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod tickets;

// Re-export commonly used error types
pub use error::{ConfigError, DatasetError, LlmError};
