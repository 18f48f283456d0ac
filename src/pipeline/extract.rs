//! Response extraction: locate and parse the JSON array in a model reply.
//!
//! The prompt demands bare JSON, but models routinely wrap the array in
//! prose or markdown fences anyway. Rather than schema-validating the whole
//! reply, this stage slices from the first `[` to the last `]` and lets
//! serde judge what's inside — the cheapest scan that survives both fences
//! and trailing commentary.

use crate::error::HalfError;
use crate::output::Record;

/// How much of a bad reply to quote back in the error.
const SNIPPET_LEN: usize = 120;

/// Parse the records out of a raw model reply.
///
/// Returns [`HalfError::MalformedResponse`] when no bracketed span exists or
/// the span is not a JSON array of records. The error carries a truncated
/// snippet of the offending reply for the log.
pub fn extract_records(response: &str) -> Result<Vec<Record>, HalfError> {
    let start = response.find('[').ok_or_else(|| malformed(
        format!("no '[' in reply: {}", snippet(response)),
    ))?;
    let end = response.rfind(']').ok_or_else(|| malformed(
        format!("no ']' in reply: {}", snippet(response)),
    ))?;
    if end < start {
        return Err(malformed(format!(
            "']' precedes '[' in reply: {}",
            snippet(response)
        )));
    }

    let span = &response[start..=end];
    serde_json::from_str(span)
        .map_err(|e| malformed(format!("{e}: {}", snippet(span))))
}

fn malformed(detail: String) -> HalfError {
    HalfError::MalformedResponse { detail }
}

fn snippet(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.chars().count() <= SNIPPET_LEN {
        format!("{trimmed:?}")
    } else {
        let cut: String = trimmed.chars().take(SNIPPET_LEN).collect();
        format!("{:?}…", cut)
    }
}
