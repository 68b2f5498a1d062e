//! The ticket record written to the output dataset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One support ticket as parsed from model output and written to disk.
///
/// Only the identifier is ever rewritten by ticket-forge; description,
/// status and date are kept verbatim from the generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Numeric identifier, unique within one run once reconciled.
    pub id: String,
    /// Free-text issue description.
    pub description: String,
    /// Status label. Usually New, Investigating or Resolved, but not enforced.
    pub status: String,
    /// Creation date as `YYYY-MM-DD`.
    pub created: String,
}

impl TicketRecord {
    /// Creates a record from its four fields.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        status: impl Into<String>,
        created: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: status.into(),
            created: created.into(),
        }
    }

    /// Returns a copy of this record carrying a different identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl fmt::Display for TicketRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ticket #{}: {} - Status: {} - Created: {}",
            self.id, self.description, self.status, self.created
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_dataset_line_format() {
        let record = TicketRecord::new("12345", "Printer jam.", "New", "2025-03-10");
        assert_eq!(
            record.to_string(),
            "Ticket #12345: Printer jam. - Status: New - Created: 2025-03-10"
        );
    }

    #[test]
    fn test_with_id_keeps_other_fields() {
        let record = TicketRecord::new("12345", "VPN drop", "Resolved", "2025-02-02").with_id("10000");
        assert_eq!(record.id, "10000");
        assert_eq!(record.description, "VPN drop");
        assert_eq!(record.status, "Resolved");
        assert_eq!(record.created, "2025-02-02");
    }
}
