//! Line parser for generated ticket batches.
//!
//! Model output is untrusted free text. Each trimmed, non-empty line either
//! matches the ticket grammar exactly and yields a [`TicketRecord`], or is
//! rejected as a whole. Rejected lines are never repaired.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::record::TicketRecord;

/// Maximum number of characters of a rejected line kept for diagnostics.
const PREVIEW_CHARS: usize = 100;

// Anchored at the start only: anything after the date is ignored.
static TICKET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Ticket #([0-9]{5}): (.+?) - Status: (.+?) - Created: *([0-9]{4}-[0-9]{2}-[0-9]{2})",
    )
    .expect("ticket line pattern is valid")
});

/// A line that did not match the ticket grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRejection {
    /// Leading part of the rejected line, for logging.
    pub preview: String,
}

impl LineRejection {
    fn new(line: &str) -> Self {
        let mut preview: String = line.chars().take(PREVIEW_CHARS).collect();
        if line.chars().count() > PREVIEW_CHARS {
            preview.push_str("...");
        }
        Self { preview }
    }
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed ticket line: {}", self.preview)
    }
}

impl std::error::Error for LineRejection {}

/// Splits a batch response into trimmed, non-empty lines.
pub fn batch_lines(response: &str) -> impl Iterator<Item = &str> {
    response.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Parses one trimmed line into a ticket record.
///
/// # Errors
///
/// Returns [`LineRejection`] when the line does not match
/// `Ticket #NNNNN: <description> - Status: <status> - Created: YYYY-MM-DD`.
pub fn parse_line(line: &str) -> Result<TicketRecord, LineRejection> {
    let captures = TICKET_LINE
        .captures(line)
        .ok_or_else(|| LineRejection::new(line))?;

    Ok(TicketRecord::new(
        &captures[1],
        &captures[2],
        &captures[3],
        &captures[4],
    ))
}
