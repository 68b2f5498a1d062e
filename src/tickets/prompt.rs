//! Prompt builder for ticket batch generation.
//!
//! Renders the fixed instruction template with the batch size and the date
//! window tickets must fall into. Rendering is pure string formatting.

use chrono::{Duration, NaiveDate};

/// Date format used both in prompts and in ticket records.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Instruction template sent to the model for every batch.
const TICKET_GENERATION_PROMPT: &str = r#"Generate {num_tickets} unique technical support tickets. Each ticket must follow this exact format on a new line:
"Ticket #ID: Description - Status: [New/Investigating/Resolved] - Created:YYYY-MM-DD"

Pay close attention to the spacing, especially after 'Created:'. There MUST be a space between 'Created:' and the date.

Ensure:
- ID is a unique 5-digit number (between 10001 and 99999).
- Description is a concise, plausible IT-related issue for a service desk. **Vary these descriptions significantly and ensure each is a distinct problem.** Examples of issues include but are not limited to: {issue_examples}.
- Status is randomly one of {statuses}.
- Created date is a random date between {start_date} and {end_date}.

Example of desired output (note the space after 'Created:' and diverse descriptions):
Ticket #12345: My keyboard is not responding. - Status: New - Created: 2025-03-10
Ticket #98765: VPN connection keeps dropping frequently. - Status: Investigating - Created: 2025-06-01
Ticket #54321: Unable to access shared network drive. - Status: Resolved - Created: 2025-01-25
"#;

/// Status labels the prompt asks for. Parsing does not enforce them.
pub const TICKET_STATUSES: &[&str] = &["New", "Investigating", "Resolved"];

/// Example issue categories offered to the model as inspiration.
pub const ISSUE_EXAMPLES: &[&str] = &[
    "printer not responding",
    "email sync error",
    "software update failed",
    "network drive inaccessible",
    "login issues",
    "video conferencing problem",
    "laptop overheating",
    "account locked",
    "VPN connection issues",
    "account locked out",
    "microphone not detected",
    "application crashing",
    "hard drive full",
    "virus detected",
    "password reset needed",
    "monitor flickering",
    "keyboard input lag",
    "slow system performance",
    "external monitor not detected",
    "file corruption",
    "browser issues",
    "antivirus update failure",
    "keyboard shortcuts not working",
    "mouse not responding",
    "password expired",
    "two-factor authentication problem",
    "wifi intermittent connection",
    "lost data recovery request",
    "new software installation request",
    "hardware upgrade request",
    "server access denied",
];

/// Inclusive range of creation dates requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a window, returning `None` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Window of `half_width_days` on either side of `reference`.
    ///
    /// Returns `None` if either bound falls outside the representable range.
    pub fn around(reference: NaiveDate, half_width_days: u32) -> Option<Self> {
        let delta = Duration::try_days(i64::from(half_width_days))?;
        let start = reference.checked_sub_signed(delta)?;
        let end = reference.checked_add_signed(delta)?;
        Some(Self { start, end })
    }

    /// Start date formatted as `YYYY-MM-DD`.
    pub fn start_label(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    /// End date formatted as `YYYY-MM-DD`.
    pub fn end_label(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }
}

/// Renders the batch instruction for `batch_size` tickets dated within `window`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use ticket_forge::tickets::{build_ticket_prompt, DateWindow};
///
/// let reference = NaiveDate::from_ymd_opt(2025, 6, 18).unwrap();
/// let window = DateWindow::around(reference, 365).unwrap();
/// let prompt = build_ticket_prompt(15, &window);
/// assert!(prompt.starts_with("Generate 15 unique technical support tickets."));
/// assert!(prompt.contains("between 2024-06-18 and 2026-06-18"));
/// ```
pub fn build_ticket_prompt(batch_size: usize, window: &DateWindow) -> String {
    let issue_examples = ISSUE_EXAMPLES
        .iter()
        .map(|issue| format!("\"{}\"", issue))
        .collect::<Vec<_>>()
        .join(", ");
    let statuses = TICKET_STATUSES
        .iter()
        .map(|status| format!("'{}'", status))
        .collect::<Vec<_>>();
    let statuses = match statuses.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => String::new(),
    };

    TICKET_GENERATION_PROMPT
        .replace("{num_tickets}", &batch_size.to_string())
        .replace("{issue_examples}", &issue_examples)
        .replace("{statuses}", &statuses)
        .replace("{start_date}", &window.start_label())
        .replace("{end_date}", &window.end_label())
}
