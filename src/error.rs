//! Error types for the scan2table library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`BatchError`] — **Fatal**: the batch run cannot proceed or produce any
//!   output at all (unreadable input directory, invalid configuration, export
//!   write failure, every half failed). Returned as `Err(BatchError)` from
//!   the top-level `batch::*` functions.
//!
//! * [`HalfError`] — **Non-fatal**: one half-page failed (undecodable scan,
//!   dispatch exhaustion, reply without a JSON array) but the rest of the
//!   batch is fine. Stored inside [`crate::output::HalfResult`] so callers
//!   can inspect partial success rather than losing a whole day's scans to
//!   one bad page.
//!
//! * [`BackendError`] — **Retryable**: a single failed attempt against one
//!   backend client. Consumed inside the dispatcher's retry loop and only
//!   ever surfaces as the `detail` of a [`HalfError::DispatchExhausted`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2table library.
///
/// Half-level failures use [`HalfError`] and are stored in
/// [`crate::output::HalfResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory could not be listed.
    #[error("Cannot read input directory '{path}': {source}\nCheck the path exists and is readable.")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The client pool contains no backend clients.
    #[error("Client pool is empty: no API keys were configured.\nProvide at least one key via --api-key or GEMINI_API_KEY.")]
    EmptyClientPool,

    /// Every attempted half failed; the table would be empty.
    #[error("All {total} halves failed during extraction.\nFirst error: {first_error}")]
    AllHalvesFailed { total: usize, first_error: String },

    /// Could not create or write the output spreadsheet.
    #[error("Failed to write export file '{path}': {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A non-fatal error for a single half-page.
///
/// Stored in [`crate::output::HalfResult`] when a half fails. The batch
/// continues unless ALL halves fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum HalfError {
    /// The page image could not be loaded, decoded, or split.
    #[error("'{file}': cannot load page image: {detail}")]
    LoadFailed { file: String, detail: String },

    /// Every client exhausted every try without a reply.
    #[error("dispatch exhausted after {attempts} attempts across {clients} clients: {detail}")]
    DispatchExhausted {
        clients: usize,
        attempts: u32,
        detail: String,
    },

    /// The model reply contained no parseable JSON array.
    #[error("malformed model response: {detail}")]
    MalformedResponse { detail: String },
}

/// One failed attempt against one backend client.
///
/// Every variant is treated as transient by the dispatcher: the attempt is
/// logged and retried with backoff until tries run out.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },

    /// The backend answered 200 but with no candidate text.
    #[error("reply contained no candidate text")]
    EmptyReply,
}
