//! # scan2table
//!
//! Batch-extract marked answers from scanned questionnaire pages using
//! Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classical OCR reads the question text fine but is blind to what matters
//! on an answered questionnaire: *which number on the 1–5 scale is circled*.
//! A vision model reads the page like the person who filled it in. This
//! crate turns a directory of page scans into one CSV of
//! `numero, pregunta, respuesta` rows, surviving flaky keys and oversized
//! scans along the way.
//!
//! ## Pipeline Overview
//!
//! ```text
//! scans/
//!  │
//!  ├─ 1. Split     bisect each two-column page into left/right halves
//!  ├─ 2. Compress  shrink halves under the payload ceiling (quality → resolution)
//!  ├─ 3. Dispatch  rotate across API keys with retry + exponential backoff
//!  ├─ 4. Extract   parse the JSON array out of the model reply
//!  └─ 5. Export    cuestionario_YYYYMMDD_HHMMSS.csv
//! ```
//!
//! Processing is deliberately sequential — one file, one half, one request
//! at a time. Vision quotas on free-tier keys are tight enough that
//! parallelism just converts rate-limit errors into retries; rotating keys
//! on a single lane is what actually helps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2table::{run, BatchConfig, ClientPool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One client per key; GEMINI_API_KEY may be a comma-separated list.
//!     let pool = ClientPool::from_env()?;
//!     let config = BatchConfig::builder().input_dir("scans/").build()?;
//!     let output = run(&config, &pool).await?;
//!     println!(
//!         "{} records → {}",
//!         output.stats.total_records,
//!         output.export_path.unwrap().display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2table` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! scan2table = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{ClientPool, GeminiClient, VisionBackend};
pub use batch::{process_directory, run};
pub use config::{BatchConfig, BatchConfigBuilder};
pub use error::{BackendError, BatchError, HalfError};
pub use output::{BatchOutput, BatchStats, HalfResult, Record, Side};
pub use progress::{BatchProgress, NoopProgress, ProgressCallback};
