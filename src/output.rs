//! Output types: extracted records, per-half results, and batch statistics.

use crate::error::HalfError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One extracted questionnaire row.
///
/// The field names are the JSON keys the extraction prompt demands from the
/// model, and double as the CSV header on export — do not rename them
/// without also changing [`crate::prompts::EXTRACTION_PROMPT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Question number as printed on the sheet.
    pub numero: i64,
    /// Verbatim question text (Spanish in the stock prompt).
    pub pregunta: String,
    /// The circled answer on the 1–5 scale; `None` when no mark was
    /// detected on that row.
    pub respuesta: Option<i64>,
}

/// Which vertical half of a scanned page a result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Outcome of processing one half-page through dispatch + extraction.
///
/// A failed half carries its [`HalfError`] here instead of aborting the
/// batch; callers decide their own tolerance after the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalfResult {
    /// File name (not full path) of the page this half came from.
    pub file: String,
    pub side: Side,
    /// Number of records extracted from this half.
    pub records: usize,
    /// Wall-clock time for dispatch + extraction, including backoff sleeps.
    pub duration_ms: u64,
    pub error: Option<HalfError>,
}

/// Aggregate counters for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Directory entries that matched a recognised image extension.
    pub files_seen: usize,
    /// Files whose halves were dispatched (i.e. the split succeeded).
    pub files_processed: usize,
    /// Files skipped because the image could not be loaded or split.
    pub files_skipped: usize,
    pub halves_succeeded: usize,
    pub halves_failed: usize,
    pub total_records: usize,
    pub duration_ms: u64,
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// All extracted records, in processing order: files in directory
    /// listing order, left half before right half within a file.
    pub records: Vec<Record>,
    /// One entry per dispatched half, successes and failures alike.
    pub halves: Vec<HalfResult>,
    pub stats: BatchStats,
    /// Where the table was written; `None` when the caller only ran
    /// extraction and did the export itself.
    pub export_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_field_names() {
        let r = Record {
            numero: 53,
            pregunta: "Está triste.".into(),
            respuesta: Some(1),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"numero\":53"));
        assert!(json.contains("\"pregunta\""));
        assert!(json.contains("\"respuesta\":1"));
    }

    #[test]
    fn record_null_answer_round_trips() {
        let json = r#"{"numero":7,"pregunta":"Duerme bien.","respuesta":null}"#;
        let r: Record = serde_json::from_str(json).unwrap();
        assert_eq!(r.respuesta, None);
        let back = serde_json::to_string(&r).unwrap();
        assert!(back.contains("\"respuesta\":null"));
    }

    #[test]
    fn side_display() {
        assert_eq!(Side::Left.to_string(), "left");
        assert_eq!(Side::Right.to_string(), "right");
    }
}
