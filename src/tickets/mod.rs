//! Ticket domain: prompt rendering, line parsing, identifier reconciliation
//! and dataset output.
//!
//! # Flow
//!
//! 1. [`build_ticket_prompt`] renders the batch instruction for the model
//! 2. [`batch_lines`] splits the model reply into candidate lines
//! 3. [`parse_line`] accepts or rejects each line against the ticket grammar
//! 4. [`IdRegistry::reconcile`] makes the identifier unique within the run
//! 5. [`DatasetWriter`] appends the finalized line to the output file
//!
//! [`check_dataset`] re-validates a finished dataset with the same grammar.

pub mod check;
pub mod parser;
pub mod prompt;
pub mod record;
pub mod registry;
pub mod writer;

pub use check::{check_contents, check_dataset, CheckReport};
pub use parser::{batch_lines, parse_line, LineRejection};
pub use prompt::{build_ticket_prompt, DateWindow, DATE_FORMAT, ISSUE_EXAMPLES, TICKET_STATUSES};
pub use record::TicketRecord;
pub use registry::{IdRegistry, IdSpaceExhausted, Reconciled, DEFAULT_FALLBACK_START, FIVE_DIGIT_MAX};
pub use writer::DatasetWriter;
