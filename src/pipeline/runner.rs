//! Driver loop for ticket dataset generation.
//!
//! [`TicketPipeline`] repeatedly asks the LLM for a batch of tickets, parses
//! and reconciles every line, and appends accepted records to the dataset
//! until the target count is reached.
//!
//! The loop is a three-state machine:
//!
//! - `Running`: request a batch and process it; stop mid-batch once the
//!   target is reached, otherwise pause briefly and request the next one.
//!   If the target was already reached by a batch whose final flush failed,
//!   only the flush is retried and no new batch is requested
//! - `BatchFailed`: any error while requesting or processing a batch; wait
//!   the failure delay and go back to `Running`
//! - `Done`: target reached, terminal
//!
//! Failed batches are retried without limit unless
//! [`ForgeConfig::max_consecutive_failures`] is set.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::ForgeConfig;
use crate::error::{ConfigError, DatasetError, LlmError};
use crate::llm::{GenerationRequest, LlmProvider, Message};
use crate::tickets::{
    batch_lines, build_ticket_prompt, parse_line, DatasetWriter, IdRegistry, IdSpaceExhausted,
};

/// Errors that end a generation run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Run configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The output dataset could not be prepared.
    #[error("Dataset setup failed: {0}")]
    Dataset(#[from] DatasetError),

    /// The configured consecutive failure ceiling was reached.
    #[error("Giving up after {attempts} consecutive failed batches: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// No unused fallback identifier is left.
    #[error(transparent)]
    IdSpace(#[from] IdSpaceExhausted),
}

/// Errors that fail a single batch. These never end the run on their own.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Fatal: retrying cannot free identifiers.
    #[error(transparent)]
    IdSpace(#[from] IdSpaceExhausted),
}

/// State of the driver loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    BatchFailed,
    Done,
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Batch requests issued, including failed ones.
    pub batches_requested: usize,
    /// Batches that failed and were retried.
    pub batches_failed: usize,
    /// Lines rejected by the parser.
    pub malformed_lines: usize,
    /// Accepted records whose identifier was replaced by a fallback.
    pub reassigned_ids: usize,
}

/// Summary emitted at the end of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSummary {
    pub run_id: Uuid,
    pub status: String,
    pub model: String,
    pub target: usize,
    pub accepted: usize,
    #[serde(flatten)]
    pub stats: RunStats,
    pub output_path: String,
    pub duration_ms: u64,
}

/// Generates a ticket dataset using an LLM provider.
pub struct TicketPipeline {
    provider: Arc<dyn LlmProvider>,
    config: ForgeConfig,
}

impl TicketPipeline {
    /// Creates a pipeline for `config` backed by `provider`.
    pub fn new(provider: Arc<dyn LlmProvider>, config: ForgeConfig) -> Self {
        Self { provider, config }
    }

    /// The run configuration.
    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    /// Runs the generation loop to completion.
    ///
    /// # Errors
    ///
    /// Fails before any request is made if the configuration is invalid or
    /// the output file cannot be created. Afterwards the only error is
    /// [`PipelineError::RetriesExhausted`], and only when a failure ceiling
    /// is configured. [`PipelineError::IdSpace`] cannot occur with a
    /// validated configuration.
    pub async fn run(&self) -> Result<GenerationSummary, PipelineError> {
        self.config.validate()?;
        let window = self.config.date_window()?;
        let prompt = build_ticket_prompt(self.config.batch_size, &window);

        let mut writer = DatasetWriter::create(&self.config.output_path)?;
        let mut registry = IdRegistry::new(self.config.fallback_start_id);

        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id);

        async move {
            info!(
                output = %writer.path().display(),
                target = self.config.target_count,
                batch_size = self.config.batch_size,
                start_date = %window.start_label(),
                end_date = %window.end_label(),
                "Starting ticket generation"
            );

            let start = Instant::now();
            let mut stats = RunStats::default();
            let mut state = LoopState::Running;
            let mut consecutive_failures: u32 = 0;

            loop {
                match state {
                    LoopState::Running => {
                        let batch = if writer.written() >= self.config.target_count {
                            debug!("Target already written, retrying flush only");
                            writer.flush().map_err(BatchError::from)
                        } else {
                            stats.batches_requested += 1;
                            self.process_batch(&prompt, &mut registry, &mut writer, &mut stats)
                                .await
                        };

                        match batch {
                            Ok(()) => {
                                consecutive_failures = 0;
                                info!(
                                    accepted = writer.written(),
                                    target = self.config.target_count,
                                    "Progress"
                                );
                                if writer.written() >= self.config.target_count {
                                    state = LoopState::Done;
                                } else {
                                    tokio::time::sleep(self.config.pacing_delay()).await;
                                }
                            }
                            Err(BatchError::IdSpace(exhausted)) => {
                                if let Err(flush_err) = writer.flush() {
                                    warn!(error = %flush_err, "Failed to flush dataset");
                                }
                                return Err(PipelineError::IdSpace(exhausted));
                            }
                            Err(err) => {
                                stats.batches_failed += 1;
                                consecutive_failures = consecutive_failures.saturating_add(1);
                                error!(error = %err, consecutive_failures, "Error in batch");

                                if let Err(flush_err) = writer.flush() {
                                    warn!(error = %flush_err, "Failed to flush dataset after batch error");
                                }

                                if let Some(max) = self.config.max_consecutive_failures {
                                    if consecutive_failures >= max {
                                        return Err(PipelineError::RetriesExhausted {
                                            attempts: consecutive_failures,
                                            last_error: err.to_string(),
                                        });
                                    }
                                }
                                state = LoopState::BatchFailed;
                            }
                        }
                    }
                    LoopState::BatchFailed => {
                        warn!(
                            delay_ms = self.config.failure_delay_ms,
                            "Retrying after a short delay"
                        );
                        tokio::time::sleep(self.config.failure_delay()).await;
                        state = LoopState::Running;
                    }
                    LoopState::Done => break,
                }
            }

            let summary = GenerationSummary {
                run_id,
                status: "complete".to_string(),
                model: self.config.model.clone(),
                target: self.config.target_count,
                accepted: writer.written(),
                stats,
                output_path: writer.path().display().to_string(),
                duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            };

            info!(
                accepted = summary.accepted,
                batches = summary.stats.batches_requested,
                failed = summary.stats.batches_failed,
                malformed = summary.stats.malformed_lines,
                reassigned = summary.stats.reassigned_ids,
                "Finished generating tickets"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Requests one batch of raw text from the provider.
    async fn request_batch(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerationRequest::new(&self.config.model, vec![Message::user(prompt)])
            .with_temperature(self.config.temperature);

        let response = self.provider.generate(request).await?;
        debug!(
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            "Received batch"
        );

        response
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ParseError("No content in LLM response".to_string()))
    }

    /// Requests a batch and writes every acceptable line until the target is hit.
    async fn process_batch(
        &self,
        prompt: &str,
        registry: &mut IdRegistry,
        writer: &mut DatasetWriter,
        stats: &mut RunStats,
    ) -> Result<(), BatchError> {
        let content = self.request_batch(prompt).await?;

        for line in batch_lines(&content) {
            if writer.written() >= self.config.target_count {
                break;
            }

            let record = match parse_line(line) {
                Ok(record) => record,
                Err(rejection) => {
                    stats.malformed_lines += 1;
                    warn!(line = %rejection.preview, "Skipped malformed line from LLM");
                    continue;
                }
            };

            let reconciled = registry.reconcile(&record.id)?;
            if let Some(original) = &reconciled.reassigned_from {
                stats.reassigned_ids += 1;
                warn!(
                    original = %original,
                    assigned = %reconciled.id,
                    "Duplicate ticket id, assigning fallback"
                );
            }

            writer.append(&record.with_id(reconciled.id))?;
        }

        writer.flush()?;
        Ok(())
    }
}
