//! Batch orchestration: walk the input directory and drive every page
//! through split → compress → dispatch → extract.
//!
//! ## Failure policy
//!
//! * A page that cannot be loaded or split is logged and skipped; the batch
//!   moves on (a bad scan should not cost the day's work).
//! * A half whose dispatch exhausts the pool, or whose reply has no JSON
//!   array, is recorded as a failed [`HalfResult`] and the batch continues.
//! * Only when *every* attempted half failed does the run end in
//!   [`BatchError::AllHalvesFailed`] — at that point there is nothing worth
//!   exporting and something systemic (keys, network, model id) is wrong.
//!
//! Processing is strictly sequential: files in directory listing order
//! (whatever the platform returns — deliberately not normalised), the left
//! half before the right half within each page. Record order in the final
//! table mirrors processing order.

use crate::backend::ClientPool;
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::output::{BatchOutput, BatchStats, HalfResult, Record, Side};
use crate::pipeline::{compress, dispatch, export, extract, split};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Process every page image in the input directory and export the table.
///
/// This is the primary entry point: [`process_directory`] followed by
/// [`export::export_records`], with the written path recorded in the output.
pub async fn run(config: &BatchConfig, pool: &ClientPool) -> Result<BatchOutput, BatchError> {
    let mut output = process_directory(config, pool).await?;
    let path = export::export_records(&output.records, &config.output_dir)?;
    output.export_path = Some(path);
    Ok(output)
}

/// Process every page image in the input directory, without exporting.
///
/// Returns all extracted records plus per-half results and counters. Callers
/// that want the CSV use [`run`]; this variant exists for embedding the
/// extraction in a different sink.
pub async fn process_directory(
    config: &BatchConfig,
    pool: &ClientPool,
) -> Result<BatchOutput, BatchError> {
    let started = Instant::now();
    let files = list_image_files(config)?;
    info!(
        "Processing {} page images from {} with {} clients",
        files.len(),
        config.input_dir.display(),
        pool.len()
    );
    if files.is_empty() {
        warn!(
            "No images matching {:?} in {}",
            config.extensions,
            config.input_dir.display()
        );
    }

    let total_files = files.len();
    let mut records: Vec<Record> = Vec::new();
    let mut halves: Vec<HalfResult> = Vec::new();
    let mut stats = BatchStats {
        files_seen: total_files,
        ..BatchStats::default()
    };

    for (index, path) in files.iter().enumerate() {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!("Processing file: {}", file);
        if let Some(ref cb) = config.progress {
            cb.on_file_start(&file, index, total_files);
        }

        let page = match split::split_page(path) {
            Ok(split) => split,
            Err(e) => {
                warn!("Skipping {}: {}", file, e);
                stats.files_skipped += 1;
                if let Some(ref cb) = config.progress {
                    cb.on_file_skipped(&file, &e);
                }
                continue;
            }
        };
        stats.files_processed += 1;

        for (side, bytes) in [(Side::Left, page.left), (Side::Right, page.right)] {
            let result =
                process_half(config, pool, &file, side, bytes, &mut records).await;
            match &result.error {
                None => stats.halves_succeeded += 1,
                Some(e) => {
                    warn!("{} {} half failed: {}", file, side, e);
                    stats.halves_failed += 1;
                }
            }
            if let Some(ref cb) = config.progress {
                cb.on_half_done(&file, side, result.records, result.error.as_ref());
            }
            halves.push(result);
        }
    }

    if !halves.is_empty() && stats.halves_succeeded == 0 {
        let first_error = halves
            .iter()
            .find_map(|h| h.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(BatchError::AllHalvesFailed {
            total: halves.len(),
            first_error,
        });
    }

    stats.total_records = records.len();
    stats.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} records from {}/{} files in {}ms",
        stats.total_records, stats.files_processed, stats.files_seen, stats.duration_ms
    );
    if let Some(ref cb) = config.progress {
        cb.on_batch_complete(stats.files_processed, stats.total_records);
    }

    Ok(BatchOutput {
        records,
        halves,
        stats,
        export_path: None,
    })
}

/// Compress, dispatch, and extract one half; append its records on success.
async fn process_half(
    config: &BatchConfig,
    pool: &ClientPool,
    file: &str,
    side: Side,
    bytes: Vec<u8>,
    records: &mut Vec<Record>,
) -> HalfResult {
    let started = Instant::now();
    let bytes = compress::shrink_to_fit(bytes, config.max_image_bytes, config.min_dimension_px);

    let outcome = match dispatch::dispatch(pool, &bytes, config).await {
        Ok(reply) => extract::extract_records(&reply),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(extracted) => {
            let count = extracted.len();
            records.extend(extracted);
            HalfResult {
                file: file.to_string(),
                side,
                records: count,
                duration_ms: started.elapsed().as_millis() as u64,
                error: None,
            }
        }
        Err(e) => HalfResult {
            file: file.to_string(),
            side,
            records: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            error: Some(e),
        },
    }
}

/// List directory entries matching the configured extensions.
///
/// Order is whatever `read_dir` yields — platform/filesystem dependent by
/// contract.
fn list_image_files(config: &BatchConfig) -> Result<Vec<PathBuf>, BatchError> {
    let entries = std::fs::read_dir(&config.input_dir).map_err(|e| {
        BatchError::InputDirUnreadable {
            path: config.input_dir.clone(),
            source: e,
        }
    })?;

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let e = e.to_ascii_lowercase();
                config.extensions.iter().any(|known| known == &e)
            })
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    Ok(files)
}
