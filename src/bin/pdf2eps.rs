//! CLI binary for pdf2eps.
//!
//! `serve` runs the upload service; `convert` runs the same pipeline on a
//! local file. Both are thin shims that map flags onto the library configs.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2eps::{
    convert_to_dir, engine, serve, ConversionConfig, ConversionProgressCallback, EpsEncoding,
    ProgressCallback, Rasterizer, ServerConfig,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress bar for `pdf2eps convert`.
///
/// Starts as a spinner while the PDF is opened and switches to a counted bar
/// once the page total is known.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Converting");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, eps_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{} KiB", eps_len / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(error),
        ));
        self.bar.abandon();
    }

    fn on_conversion_complete(&self, _total_pages: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the upload service on the default port (8000)
  pdf2eps serve

  # Listen on localhost only, 20 MB uploads, compressed EPS
  pdf2eps serve --bind 127.0.0.1:8080 --max-upload-mb 20 --encoding flate

  # Convert a local file into the current directory
  pdf2eps convert report.pdf

  # Convert at 150 DPI into ./out
  pdf2eps convert --dpi 150 -o out scan.pdf

OUTPUT:
  A one-page PDF produces {name}_page_1.eps.
  A multi-page PDF produces {name}_eps.zip with one EPS per page.

ENVIRONMENT VARIABLES:
  PDF2EPS_BIND            Listen address for `serve`
  PDF2EPS_MAX_UPLOAD_MB   Upload ceiling for `serve`, in MB
  PDF2EPS_DPI             Rendering resolution (72–600)
  PDF2EPS_ENCODING        EPS data encoding: hex or flate
  PDF2EPS_VERBOSE         Enable DEBUG-level logs
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Overrides the log filter entirely
"#;

/// Convert PDF pages to Encapsulated PostScript.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2eps",
    version,
    about = "Convert PDF pages to EPS, over HTTP or from the command line",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2EPS_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP upload service.
    Serve(ServeArgs),
    /// Convert a local PDF file.
    Convert(ConvertArgs),
}

/// Rendering options shared by both subcommands.
#[derive(Args, Debug)]
struct RenderArgs {
    /// Rendering DPI (72–600).
    #[arg(long, env = "PDF2EPS_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// EPS data encoding.
    #[arg(long, env = "PDF2EPS_ENCODING", value_enum, default_value = "hex")]
    encoding: EncodingArg,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "PDF2EPS_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Largest accepted upload, in MB.
    #[arg(long, env = "PDF2EPS_MAX_UPLOAD_MB", default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..=4096))]
    max_upload_mb: u64,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// PDF file to convert.
    input: PathBuf,

    /// Directory the .eps or .zip is written to.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print conversion stats as JSON on stdout instead of the output path.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EncodingArg {
    Hex,
    Flate,
}

impl From<EncodingArg> for EpsEncoding {
    fn from(v: EncodingArg) -> Self {
        match v {
            EncodingArg::Hex => EpsEncoding::Hex,
            EncodingArg::Flate => EpsEncoding::Flate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // While the progress bar is drawing, INFO lines would tear it; keep
    // library logs at warn unless --verbose asks for everything.
    let show_progress =
        matches!(&cli.command, Command::Convert(args) if !args.no_progress && !args.json);
    let filter = if cli.verbose {
        "debug"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Bind PDFium engine ───────────────────────────────────────────────
    let rasterizer: Arc<dyn Rasterizer> =
        Arc::new(engine::pdfium_rasterizer().context("PDFium engine is not available")?);

    match cli.command {
        Command::Serve(args) => run_serve(args, rasterizer).await,
        Command::Convert(args) => run_convert(args, rasterizer).await,
    }
}

async fn run_serve(args: ServeArgs, rasterizer: Arc<dyn Rasterizer>) -> Result<()> {
    let conversion = build_conversion_config(&args.render, None)?;
    let max_upload_bytes = usize::try_from(args.max_upload_mb * 1024 * 1024)
        .context("Upload limit does not fit in memory on this platform")?;

    let config = ServerConfig::builder()
        .bind(args.bind)
        .max_upload_bytes(max_upload_bytes)
        .conversion(conversion)
        .build()
        .context("Invalid server configuration")?;

    serve(config, rasterizer).await.context("Server failed")
}

async fn run_convert(args: ConvertArgs, rasterizer: Arc<dyn Rasterizer>) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if args.no_progress || args.json {
        None
    } else {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    };
    let config = build_conversion_config(&args.render, progress_cb)?;

    let (path, stats) = convert_to_dir(rasterizer, &args.input, &args.output_dir, config)
        .await
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    if args.json {
        let json = serde_json::json!({
            "output": path,
            "stats": stats,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise stats")?
        );
        return Ok(());
    }

    eprintln!(
        "{}  {} pages  {} dpi  {}ms  →  {}",
        green("✔"),
        stats.page_count,
        stats.dpi,
        stats.total_duration_ms,
        bold(&path.display().to_string()),
    );
    println!("{}", path.display());

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_conversion_config(
    args: &RenderArgs,
    progress: Option<ProgressCallback>,
) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .dpi(args.dpi)
        .encoding(args.encoding.into());

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
