//! CLI binary for zenfin-scan.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs one extraction, and prints the draft as JSON.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use zenfin_scan::config::DEFAULT_PROVIDER;
use zenfin_scan::{
    process_entry, BackendSettings, ExtractionConfig, ExtractionEngine, GenerativeCredential,
    ProcessEntryRequest,
};

const AFTER_HELP: &str = r#"EXAMPLES:
  zenfin voice "Paguei 50 reais de internet via pix"
  zenfin image nota.png
  zenfin receipt recibo1.jpg "data:image/jpeg;base64,/9j/4AAQ..."
  zenfin recurrence "Netflix todo dia 10"

ENVIRONMENT:
  GEMINI_API_KEY   API key for the generative service (API_KEY is accepted too)
  SUPABASE_URL, SUPABASE_ANON_KEY
                   Optional data backend; disabled with a warning when unset
  RUST_LOG         Override the log filter (e.g. zenfin_scan=debug)
"#;

/// Extract structured transactions from voice transcripts and receipt photos.
#[derive(Parser, Debug)]
#[command(
    name = "zenfin",
    version,
    about = "Extract structured transactions from voice transcripts and receipt photos",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// LLM model ID (e.g. gemini-3-flash-preview, gpt-4.1-mini).
    #[arg(long, global = true, env = "ZENFIN_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, global = true, env = "ZENFIN_PROVIDER")]
    provider: Option<String>,

    /// Per-call LLM timeout in seconds.
    #[arg(long, global = true, env = "ZENFIN_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Retries on a transient LLM failure (0 or 1).
    #[arg(long, global = true, env = "ZENFIN_MAX_RETRIES", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(0..=1))]
    max_retries: u32,

    /// Receipts scanned at once by `receipt`.
    #[arg(short, long, global = true, env = "ZENFIN_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Print JSON on a single line.
    #[arg(long, global = true)]
    compact: bool,

    /// Disable the spinner.
    #[arg(long, global = true, env = "ZENFIN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "ZENFIN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "ZENFIN_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract a transaction from a voice transcript.
    Voice {
        /// The transcript text.
        text: String,
    },
    /// Extract a transaction from an image file.
    Image {
        /// Path to the image.
        path: PathBuf,
        /// MIME type to send; guessed from the extension when omitted.
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Scan receipts given as file paths, data URIs or base64 strings.
    Receipt {
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Ask whether a transcript describes a recurring transaction.
    Recurrence {
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Credentials ──────────────────────────────────────────────────────
    // Providers read GEMINI_API_KEY; accept the legacy API_KEY by aliasing it
    // before the runtime starts any threads.
    if cli.provider.as_deref().unwrap_or(DEFAULT_PROVIDER) == DEFAULT_PROVIDER {
        let credential = GenerativeCredential::from_env()?;
        if credential.source == GenerativeCredential::FALLBACK_VAR {
            std::env::set_var(GenerativeCredential::PRIMARY_VAR, &credential.api_key);
        }
    }
    let backend = BackendSettings::from_env();
    debug!(
        "Backend: {}",
        backend.as_ref().map_or("disabled", |_| "enabled")
    );

    tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut builder = ExtractionConfig::builder()
        .api_timeout_secs(cli.api_timeout)
        .max_retries(cli.max_retries)
        .concurrency(cli.concurrency);
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    let config = builder.build()?;
    let engine = ExtractionEngine::from_config(config)?;
    let show_progress = !cli.quiet && !cli.no_progress;

    match cli.command {
        Command::Voice { text } => {
            let draft = with_spinner(
                show_progress,
                "Reading transcript…",
                process_entry(&engine, ProcessEntryRequest::voice(text)),
            )
            .await;
            match draft {
                Ok(d) => print_json(&d, cli.compact)?,
                Err(e) => bail!("{} ({}, HTTP {})", e.detail(), e.code(), e.status_code()),
            }
        }
        Command::Image { path, mime_type } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Cannot read image '{}'", path.display()))?;
            let mime = mime_type.unwrap_or_else(|| guess_mime_type(&path));
            let draft = with_spinner(
                show_progress,
                "Reading image…",
                process_entry(&engine, ProcessEntryRequest::image(bytes, mime)),
            )
            .await;
            match draft {
                Ok(d) => print_json(&d, cli.compact)?,
                Err(e) => bail!("{} ({}, HTTP {})", e.detail(), e.code(), e.status_code()),
            }
        }
        Command::Receipt { inputs } => {
            let message = format!("Scanning {} receipt(s)…", inputs.len());
            let drafts = with_spinner(show_progress, &message, engine.scan_receipts(&inputs)).await;
            let failed = drafts.iter().filter(|d| d.is_none()).count();
            if failed == drafts.len() {
                bail!("No receipt could be scanned");
            }
            if inputs.len() == 1 {
                print_json(&drafts[0], cli.compact)?;
            } else {
                print_json(&drafts, cli.compact)?;
            }
            if failed > 0 && !cli.quiet {
                eprintln!("{failed}/{} receipts could not be scanned", drafts.len());
            }
        }
        Command::Recurrence { text } => {
            let recurrence =
                with_spinner(show_progress, "Classifying…", engine.classify_recurrence(&text))
                    .await;
            print_json(&serde_json::json!({ "recurrence": recurrence }), cli.compact)?;
        }
    }

    Ok(())
}

/// Await `fut` while a spinner runs on stderr.
async fn with_spinner<F: Future>(enabled: bool, message: &str, fut: F) -> F::Output {
    if !enabled {
        return fut.await;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    spinner.finish_and_clear();
    out
}

fn print_json<T: serde::Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}

/// MIME type from the file extension; JPEG when unknown.
fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or(mime_guess::mime::IMAGE_JPEG)
        .essence_str()
        .to_string()
}
