//! Configuration types for a questionnaire batch run.
//!
//! All behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share a config across calls, log it, and diff two runs to understand
//! why their outputs differ.

use crate::error::BatchError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default image byte ceiling: 4.5 MiB, comfortably under the backend's
/// inline-payload limit once base64 expansion (~4/3) is accounted for.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4_718_592;

/// Configuration for a batch extraction run.
///
/// Built via [`BatchConfig::builder()`] or [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use scan2table::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .input_dir("scans/")
///     .model("gemini-2.5-flash")
///     .tries_per_client(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory containing the scanned page images.
    pub input_dir: PathBuf,

    /// Directory the timestamped CSV is written into. Default: `"."`.
    pub output_dir: PathBuf,

    /// Vision model identifier. Default: `"gemini-2.5-flash"`.
    pub model: String,

    /// Byte ceiling for each encoded half before dispatch. Default: 4.5 MiB.
    ///
    /// Halves over the ceiling go through the two-phase compressor (quality,
    /// then resolution). The ceiling is best-effort: a half can still exceed
    /// it if the quality and dimension floors are both hit first.
    pub max_image_bytes: usize,

    /// Dimension floor for the compressor's resolution phase. Default: 200 px.
    ///
    /// Below roughly 200 px a questionnaire row is no longer legible to the
    /// model, so shrinking further trades a size violation for garbage
    /// output. Either dimension reaching the floor stops the loop.
    pub min_dimension_px: u32,

    /// Attempts per client before rotating to the next one. Default: 3.
    ///
    /// Quota errors are per key, so rotating after a few tries reaches a
    /// healthy key quickly; 3 tries still absorbs the transient 5xx blips
    /// that clear within a couple of seconds.
    pub tries_per_client: u32,

    /// Base backoff delay in milliseconds (exponential). Default: 500.
    ///
    /// Doubles per attempt: 500 ms → 1 s → 2 s. A random jitter of up to
    /// [`Self::backoff_jitter_ms`] is added to each sleep so repeated runs
    /// against a recovering backend don't retry in lockstep.
    pub backoff_base_ms: u64,

    /// Upper bound of the uniform backoff jitter in milliseconds. Default: 200.
    pub backoff_jitter_ms: u64,

    /// Custom extraction instruction. If `None`, uses
    /// [`crate::prompts::EXTRACTION_PROMPT`].
    pub instruction: Option<String>,

    /// Recognised input extensions, lower-case without the dot.
    /// Default: `jpeg`, `jpg`, `png`.
    pub extensions: Vec<String>,

    /// Progress callback fired per file/half. Default: none.
    pub progress: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("archivos"),
            output_dir: PathBuf::from("."),
            model: "gemini-2.5-flash".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            min_dimension_px: 200,
            tries_per_client: 3,
            backoff_base_ms: 500,
            backoff_jitter_ms: 200,
            instruction: None,
            extensions: vec!["jpeg".into(), "jpg".into(), "png".into()],
            progress: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("model", &self.model)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("min_dimension_px", &self.min_dimension_px)
            .field("tries_per_client", &self.tries_per_client)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_jitter_ms", &self.backoff_jitter_ms)
            .field("instruction", &self.instruction.as_ref().map(|_| "<custom>"))
            .field("extensions", &self.extensions)
            .field("progress", &self.progress.as_ref().map(|_| "<dyn BatchProgress>"))
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction text actually sent with each half.
    pub fn instruction_text(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::EXTRACTION_PROMPT)
    }
}

/// Builder for [`BatchConfig`].
#[derive(Debug)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes;
        self
    }

    pub fn min_dimension_px(mut self, px: u32) -> Self {
        self.config.min_dimension_px = px.max(1);
        self
    }

    pub fn tries_per_client(mut self, n: u32) -> Self {
        self.config.tries_per_client = n.max(1);
        self
    }

    pub fn backoff_base_ms(mut self, ms: u64) -> Self {
        self.config.backoff_base_ms = ms;
        self
    }

    pub fn backoff_jitter_ms(mut self, ms: u64) -> Self {
        self.config.backoff_jitter_ms = ms;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn extensions(mut self, exts: Vec<String>) -> Self {
        self.config.extensions = exts
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn progress(mut self, callback: ProgressCallback) -> Self {
        self.config.progress = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.max_image_bytes == 0 {
            return Err(BatchError::InvalidConfig(
                "Image byte ceiling must be > 0".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(BatchError::InvalidConfig("Model id must not be empty".into()));
        }
        if c.extensions.is_empty() {
            return Err(BatchError::InvalidConfig(
                "At least one input extension is required".into(),
            ));
        }
        Ok(self.config)
    }
}
