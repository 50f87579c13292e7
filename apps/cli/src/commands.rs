//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use leadrefresh_core::batch::{self, BatchReporter, BatchSummary};
use leadrefresh_core::input;
use leadrefresh_core::pipeline::Pipeline;
use leadrefresh_shared::{
    AppConfig, Credentials, RecordReport, RefreshError, init_config, load_config,
    load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lead-refresh — enrich CRM leads from cached company profiles.
#[derive(Parser)]
#[command(
    name = "lead-refresh",
    version,
    about = "Refresh CRM leads with employee count, addresses, funding and company details from cached profiles.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.lead-refresh/lead-refresh.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Refresh every lead listed in the CSV file.
    Run {
        /// CSV lead list (defaults to `input.path` from config).
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Only process the first N records.
        #[arg(long)]
        limit: Option<usize>,

        /// Locate leads and plan updates without sending them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve one company profile URL and print the updates it would produce.
    Resolve {
        /// Company profile URL.
        url: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Crates whose logs are shown by default.
const LOG_TARGETS: &[&str] = &[
    "lead_refresh",
    "leadrefresh_core",
    "leadrefresh_crm",
    "leadrefresh_scrape_cache",
    "leadrefresh_shared",
];

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            input,
            limit,
            dry_run,
        } => cmd_run(config_path, input.as_deref(), limit, dry_run).await,
        Command::Resolve { url } => cmd_resolve(config_path, &url).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    input_path: Option<&Path>,
    limit: Option<usize>,
    dry_run: bool,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let credentials = Credentials::from_env(&config)?;

    let input_path = input_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.input.path));
    let mut records = input::read_records(&input_path, &config.input.url_column)?;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    info!(
        input = %input_path.display(),
        records = records.len(),
        dry_run,
        "refreshing leads"
    );

    let pipeline = Pipeline::new(&config, &credentials)?.with_dry_run(dry_run);
    let reporter = CliProgress::new(records.len());
    let summary = batch::run_batch(&records, &pipeline, &reporter).await;

    // Print summary
    println!();
    println!("  Batch complete");
    println!("  Records:         {}", summary.total);
    if dry_run {
        println!("  Planned:         {}", summary.planned);
    } else {
        println!("  Updated:         {}", summary.updated);
    }
    println!("  Lead not found:  {}", summary.lead_not_found);
    println!("  Failed:          {}", summary.failed);
    println!("  Time:            {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_resolve(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = resolve_config(config_path)?;
    let credentials = Credentials::from_env(&config)?;
    let pipeline = Pipeline::new(&config, &credentials)?;

    let (resolved, plan) = pipeline.inspect(url).await?;

    let updates: Vec<serde_json::Value> = plan
        .iter()
        .map(|planned| match &planned.payload {
            Ok(update) => serde_json::json!({
                "group": planned.group.as_str(),
                "update": update,
            }),
            Err(e) => serde_json::json!({
                "group": planned.group.as_str(),
                "error": e.to_string(),
            }),
        })
        .collect();

    let output = serde_json::json!({
        "primary_tag": resolved.key.primary_tag,
        "secondary_tag": resolved.key.secondary_tag,
        "updates": updates,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI batch reporter using an indicatif progress bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl BatchReporter for CliProgress {
    fn record_started(&self, index: usize, total: usize, url: &str) {
        self.bar
            .set_message(format!("🏗️  ({index}/{total}) Updating {url}..."));
    }

    fn record_succeeded(&self, index: usize, total: usize, url: &str, report: &RecordReport) {
        self.bar.println(success_line(index, total, url, report));
        self.bar.inc(1);
    }

    fn record_failed(&self, index: usize, total: usize, url: &str, error: &RefreshError) {
        self.bar.println(format!(
            "❌ ({index}/{total}) Could not update {url} because of error : {error}"
        ));
        self.bar.inc(1);
    }

    fn done(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

/// Progress line for a record that completed without error.
fn success_line(index: usize, total: usize, url: &str, report: &RecordReport) -> String {
    match report {
        RecordReport::LeadNotFound => {
            format!("🔎 ({index}/{total}) No lead found for {url}, skipped.")
        }
        RecordReport::DryRun { planned } => {
            format!("📝 ({index}/{total}) Would update {url} : {planned} update(s) planned.")
        }
        RecordReport::Updated(status) => {
            format!("✅ ({index}/{total}) Successfully updated {url} : {status}.")
        }
    }
}
