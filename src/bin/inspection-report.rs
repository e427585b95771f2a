//! CLI binary for inspection-report.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReportConfig`, runs the pipeline and prints a summary.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use inspection_report::{
    load_record, DocumentKind, EngineConfig, PipelineStage, ProgressCallback, ReportConfig,
    ReportOutput, ReportPipeline, ReportProgressCallback,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Report");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ReportProgressCallback for CliProgressCallback {
    fn on_report_start(&self) {
        self.bar.set_message("starting browser and composing…");
    }

    fn on_stage_complete(&self, stage: PipelineStage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<16} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        let next = match stage {
            PipelineStage::Compose => "writing markup…",
            PipelineStage::Persist => "rendering cover and body…",
            PipelineStage::Render => "merging…",
            PipelineStage::Merge => "writing PDF…",
            _ => "",
        };
        self.bar.set_message(next);
    }

    fn on_document_rendered(&self, kind: DocumentKind, pages: usize) {
        self.bar.println(format!(
            "    {} {}",
            kind,
            dim(&format!("{pages} page(s)"))
        ));
    }

    fn on_asset_timeout(&self, kind: DocumentKind, index: usize) {
        self.bar.println(format!(
            "  {} {} image #{} did not load in time; rendered without it",
            yellow("⚠"),
            kind,
            index
        ));
    }

    fn on_report_complete(&self, total_pages: usize) {
        self.bar.set_message(format!("{total_pages} pages written"));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a report next to its input (inspection.pdf)
  inspection-report inspection.json

  # Choose the output path and keep the intermediate HTML/PDFs
  inspection-report inspection.json -o out/report.pdf --work-dir out/work

  # Use a specific browser binary, US Central time on the cover
  inspection-report inspection.json --chrome /usr/bin/chromium --tz-offset -360

  # Render three times on one browser process
  inspection-report inspection.json --runs 3

ENVIRONMENT VARIABLES:
  Every flag can also be set as INSPECTION_REPORT_<FLAG>, e.g.
  INSPECTION_REPORT_CHROME=/usr/bin/chromium. RUST_LOG overrides the log level.
"#;

/// Render inspection records to a merged cover + sections PDF.
#[derive(Parser, Debug)]
#[command(
    name = "inspection-report",
    version,
    about = "Render an inspection record (JSON) to a PDF report",
    long_about = "Render an inspection record (JSON export) to a single PDF: the fixed cover \
and disclosure page followed by every inspection section, printed by a headless Chrome/Chromium.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Inspection record (JSON export).
    input: PathBuf,

    /// Write the PDF here. Default: the input path with a `.pdf` extension.
    #[arg(short, long, env = "INSPECTION_REPORT_OUTPUT")]
    output: Option<PathBuf>,

    /// Keep intermediate HTML and PDFs in this directory.
    #[arg(long, env = "INSPECTION_REPORT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Chrome/Chromium executable. Auto-detected if not set.
    #[arg(long, env = "INSPECTION_REPORT_CHROME")]
    chrome: Option<PathBuf>,

    /// Seconds a document may take to parse after navigation.
    #[arg(long, env = "INSPECTION_REPORT_NAV_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    nav_timeout: u64,

    /// Seconds to wait for each image before rendering without it.
    #[arg(long, env = "INSPECTION_REPORT_IMAGE_TIMEOUT", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    image_timeout: u64,

    /// Generate the report N times, reusing one browser process.
    #[arg(long, env = "INSPECTION_REPORT_RUNS", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    runs: u32,

    /// UTC offset in minutes for printed dates (e.g. -360).
    #[arg(long, env = "INSPECTION_REPORT_TZ_OFFSET", default_value_t = 0, allow_hyphen_values = true)]
    tz_offset: i32,

    /// Print the run summary as JSON on stdout.
    #[arg(long, env = "INSPECTION_REPORT_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "INSPECTION_REPORT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INSPECTION_REPORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INSPECTION_REPORT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep them out of its way.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load input ───────────────────────────────────────────────────────
    let record = load_record(&cli.input)
        .await
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("pdf"));

    // ── Build config ─────────────────────────────────────────────────────
    // Several runs share one spinner, so main clears it, not the callback.
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|cb| cb as Arc<dyn ReportProgressCallback>);
    let config = build_config(&cli, progress_cb)?;
    let pipeline = ReportPipeline::chromium(config);

    // ── Run ──────────────────────────────────────────────────────────────
    let outputs = if cli.runs == 1 {
        vec![pipeline
            .run(&record, &output_path, None)
            .await
            .context("Report generation failed")?]
    } else {
        run_repeated(&pipeline, &record, &output_path, cli.runs).await?
    };
    if let Some(spinner) = spinner {
        spinner.bar.finish_and_clear();
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&outputs).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        for (i, output) in outputs.iter().enumerate() {
            print_summary(i + 1, cli.runs, output);
        }
    }

    Ok(())
}

/// Several runs on one session; the session is disposed even when a run fails.
async fn run_repeated(
    pipeline: &ReportPipeline,
    record: &inspection_report::InspectionRecord,
    output_path: &Path,
    runs: u32,
) -> Result<Vec<ReportOutput>> {
    let session = pipeline
        .launch_session()
        .await
        .context("Failed to start the browser")?;

    let mut outputs = Vec::with_capacity(runs as usize);
    let mut failure = None;
    for run in 1..=runs {
        match pipeline.run(record, output_path, Some(&session)).await {
            Ok(output) => outputs.push(output),
            Err(e) => {
                failure = Some(anyhow::Error::new(e).context(format!("Run {run}/{runs} failed")));
                break;
            }
        }
    }

    session.dispose().await.context("Failed to stop the browser")?;
    match failure {
        Some(e) => Err(e),
        None => Ok(outputs),
    }
}

fn print_summary(run: usize, runs: u32, output: &ReportOutput) {
    let prefix = if runs > 1 {
        format!("[{run}/{runs}] ")
    } else {
        String::new()
    };
    eprintln!(
        "{}{}  {} pages ({} cover + {} body)  {}ms  →  {}",
        prefix,
        green("✔"),
        output.page_count,
        output.cover_pages,
        output.body_pages,
        output.stats.total_duration_ms,
        bold(&output.path.display().to_string()),
    );
    let abandoned = output.stats.images_abandoned();
    if abandoned > 0 {
        eprintln!(
            "   {} {} image(s) rendered without waiting for them",
            yellow("⚠"),
            abandoned
        );
    }
}

/// Map CLI args to `ReportConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReportConfig> {
    let engine = EngineConfig {
        executable: cli.chrome.clone(),
        ..Default::default()
    };

    let mut builder = ReportConfig::builder()
        .engine(engine)
        .navigation_timeout(Duration::from_secs(cli.nav_timeout))
        .image_timeout(Duration::from_secs(cli.image_timeout))
        .timezone_offset_minutes(cli.tz_offset);

    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
