//! Ticket generation pipeline.
//!
//! - **Config**: run parameters, loaded from defaults, YAML, environment and CLI
//! - **Runner**: the batch request / parse / reconcile / write loop
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticket_forge::llm::OpenRouterProvider;
//! use ticket_forge::pipeline::{ForgeConfig, TicketPipeline};
//!
//! let config = ForgeConfig::from_env()?
//!     .with_target_count(500)
//!     .with_output_path("./data/tickets.txt");
//! let provider = Arc::new(OpenRouterProvider::with_model(api_key, config.model.clone())?);
//!
//! let summary = TicketPipeline::new(provider, config).run().await?;
//! println!("{} tickets in {} batches", summary.accepted, summary.stats.batches_requested);
//! ```

pub mod config;
pub mod runner;

pub use config::ForgeConfig;
pub use runner::{
    BatchError, GenerationSummary, LoopState, PipelineError, RunStats, TicketPipeline,
};
