//! CLI binary for scan2table.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`,
//! builds the client pool, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2table::{
    run, BatchConfig, BatchProgress, ClientPool, HalfError, ProgressCallback, Side,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar over the file list plus a per-half log line.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:40.green/238}] {pos:>3}/{len} files  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgress for CliProgress {
    fn on_file_start(&self, file: &str, index: usize, total: usize) {
        if index == 0 {
            self.bar.set_length(total as u64);
        }
        self.bar.set_message(file.to_string());
    }

    fn on_file_skipped(&self, file: &str, error: &HalfError) {
        self.bar
            .println(format!("  {} {}  {}", red("✗"), file, red(&error.to_string())));
        self.bar.inc(1);
    }

    fn on_half_done(&self, file: &str, side: Side, records: usize, error: Option<&HalfError>) {
        match error {
            None => self.bar.println(format!(
                "  {} {} {:<5}  {}",
                green("✓"),
                file,
                side.to_string(),
                dim(&format!("{records} records")),
            )),
            Some(e) => {
                let msg = e.to_string();
                let msg = if msg.len() > 80 {
                    format!("{}\u{2026}", &msg[..79])
                } else {
                    msg
                };
                self.bar
                    .println(format!("  {} {} {:<5}  {}", red("✗"), file, side.to_string(), red(&msg)));
            }
        }
        // The right half closes out a file regardless of outcome.
        if side == Side::Right {
            self.bar.inc(1);
        }
    }

    fn on_batch_complete(&self, _files: usize, _records: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process ./archivos with keys from the environment
  export GEMINI_API_KEY=key1,key2,key3
  scan2table

  # Explicit directory, model, and output location
  scan2table scans/ --model gemini-2.5-flash -o results/

  # Keys on the command line (one flag per key)
  scan2table scans/ --api-key AIza... --api-key AIza...

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY   One key, or a comma-separated list (one client per key)
  GEMINI_MODEL     Override the model id

OUTPUT:
  One CSV per run, named cuestionario_YYYYMMDD_HHMMSS.csv, with columns
  numero,pregunta,respuesta. An unmarked row exports an empty respuesta cell.
"#;

/// Extract marked questionnaire answers from scanned pages using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "scan2table",
    version,
    about = "Batch-extract answers from scanned questionnaire pages using Vision LLMs",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory of scanned page images (.jpeg/.jpg/.png).
    #[arg(default_value = "archivos")]
    input: PathBuf,

    /// Directory the timestamped CSV is written into.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Vision model id.
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// API key; repeat the flag for a pool. Falls back to GEMINI_API_KEY
    /// (single key or comma-separated list).
    #[arg(long = "api-key", value_name = "KEY")]
    api_key: Vec<String>,

    /// Image payload ceiling in MiB before the compressor kicks in.
    #[arg(long, default_value_t = 4.5)]
    max_image_mb: f64,

    /// Attempts per key before rotating to the next one.
    #[arg(long, default_value_t = 3)]
    tries_per_client: u32,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar is the user-facing feedback channel; keep library
    // INFO logs out of its way unless explicitly asked for.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── Client pool ──────────────────────────────────────────────────────
    let pool = if cli.api_key.is_empty() {
        ClientPool::from_env()
    } else {
        ClientPool::from_gemini_keys(cli.api_key.clone())
    }
    .context("No usable API keys")?;

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgress::new() as Arc<dyn BatchProgress>)
    } else {
        None
    };

    let mut builder = BatchConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output_dir)
        .model(cli.model.clone())
        .max_image_bytes((cli.max_image_mb * 1024.0 * 1024.0) as usize)
        .tries_per_client(cli.tries_per_client);
    if let Some(cb) = progress {
        builder = builder.progress(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run batch ────────────────────────────────────────────────────────
    let output = run(&config, &pool).await.context("Batch run failed")?;

    if !cli.quiet {
        let s = &output.stats;
        let export = output
            .export_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        eprintln!(
            "{}  {} records from {}/{} files  {}ms  →  {}",
            if s.halves_failed == 0 && s.files_skipped == 0 {
                green("✔")
            } else {
                red("⚠")
            },
            bold(&s.total_records.to_string()),
            s.files_processed,
            s.files_seen,
            s.duration_ms,
            bold(&export),
        );
        if s.files_skipped > 0 {
            eprintln!("   {} files skipped (unreadable images)", s.files_skipped);
        }
        if s.halves_failed > 0 {
            eprintln!("   {} halves failed (see warnings above)", s.halves_failed);
        }
    }

    Ok(())
}
