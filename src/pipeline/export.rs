//! Table export: write the accumulated records as one timestamped CSV.
//!
//! The filename embeds the local wall-clock second
//! (`cuestionario_YYYYMMDD_HHMMSS.csv`), which is the only collision
//! protection: two exports within the same second overwrite each other.
//! That matches how the output has always been named downstream, so the
//! spreadsheet-importing side keeps working unchanged.

use crate::error::BatchError;
use crate::output::Record;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write `records` to `<output_dir>/cuestionario_<timestamp>.csv`.
///
/// One row per record, header row from the record's field names
/// (`numero,pregunta,respuesta`); a `None` answer becomes an empty cell.
/// Creates the output directory if needed. Returns the written path.
pub fn export_records(records: &[Record], output_dir: &Path) -> Result<PathBuf, BatchError> {
    let filename = format!("cuestionario_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
    let path = output_dir.join(filename);

    write_csv(records, &path)?;

    info!("{} records exported to {}", records.len(), path.display());
    Ok(path)
}

/// Write the CSV to an explicit path. Split out so tests can pin the name.
fn write_csv(records: &[Record], path: &Path) -> Result<(), BatchError> {
    let export_failed = |source: csv::Error| BatchError::ExportFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| export_failed(csv::Error::from(e)))?;
    }

    // Header written by hand: the serde-driven header only appears once a
    // record is serialised, and an empty batch must still export a table.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(export_failed)?;
    writer
        .write_record(["numero", "pregunta", "respuesta"])
        .map_err(export_failed)?;
    for record in records {
        writer.serialize(record).map_err(export_failed)?;
    }
    writer.flush().map_err(|e| export_failed(csv::Error::from(e)))?;
    Ok(())
}
