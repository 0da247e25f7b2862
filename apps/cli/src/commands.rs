//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use paperatlas_annotate::OpenRouterClient;
use paperatlas_core::{
    EnrichmentProgress, category_distribution, enrich_authors, enrich_papers, select_key_authors,
};
use paperatlas_shared::{
    EngineConfig, RunSummary, init_config, load_config, validate_api_key,
};
use paperatlas_source::load_papers;
use paperatlas_store::CheckpointStore;

/// Papers processed when `--dry-run` is set.
const DRY_RUN_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// PaperAtlas — enrich scraped conference papers with LLM annotations.
#[derive(Parser)]
#[command(
    name = "paperatlas",
    version,
    about = "Incrementally enrich conference papers and key authors with LLM annotations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Enrich papers from a scraped CSV export.
    EnrichPapers {
        /// Path to the scraped papers CSV.
        #[arg(short, long)]
        input: PathBuf,

        /// Checkpoint store path. Defaults to enriched.json, or
        /// enriched_dry_run.json under --dry-run so a throwaway pass
        /// never touches the real store.
        #[arg(long)]
        store: Option<PathBuf>,

        /// Process only the first few papers to sanity-check the setup.
        #[arg(long)]
        dry_run: bool,

        /// Cap the number of papers processed this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Override the configured worker pool size.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Enrich the key authors of a scraped paper set.
    EnrichAuthors {
        /// Path to the scraped papers CSV.
        #[arg(short, long)]
        input: PathBuf,

        /// Checkpoint store path.
        #[arg(long, default_value = "enriched_authors.json")]
        store: PathBuf,

        /// List the selected key authors without calling the service.
        #[arg(long)]
        dry_run: bool,

        /// Override the configured worker pool size.
        #[arg(long)]
        workers: Option<usize>,
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

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "paperatlas=info",
        1 => "paperatlas=debug",
        _ => "paperatlas=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::EnrichPapers {
            input,
            store,
            dry_run,
            limit,
            workers,
        } => {
            let store = resolve_paper_store(store, dry_run);
            cmd_enrich_papers(&input, &store, dry_run, limit, workers).await
        }
        Command::EnrichAuthors {
            input,
            store,
            dry_run,
            workers,
        } => cmd_enrich_authors(&input, &store, dry_run, workers).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enrich_papers(
    input: &PathBuf,
    store_path: &PathBuf,
    dry_run: bool,
    limit: Option<usize>,
    workers: Option<usize>,
) -> Result<()> {
    // Validate API key before doing anything
    let config = load_config()?;
    let api_key = validate_api_key(&config)?;

    let mut papers = load_papers(input)?;
    if let Some(limit) = limit {
        papers.truncate(limit);
    }
    if dry_run {
        papers.truncate(DRY_RUN_LIMIT);
        println!("  Dry run: processing only the first {} papers.", papers.len());
    }

    let engine_config = with_worker_override(EngineConfig::for_papers(&config), workers);
    info!(
        input = %input.display(),
        papers = papers.len(),
        workers = engine_config.workers,
        "enriching papers"
    );

    let store = Arc::new(CheckpointStore::open(store_path).await?);
    let annotator = Arc::new(OpenRouterClient::new(
        &config.openrouter,
        api_key,
        &config.enrichment,
    )?);

    let progress = Arc::new(CliProgress::new("papers"));
    let (summary, taxonomy) = enrich_papers(
        &papers,
        annotator,
        store.clone(),
        engine_config,
        progress.clone(),
    )
    .await?;
    progress.finish();

    println!();
    println!("  Paper enrichment finished.");
    print_summary(&summary);

    println!("  Categories ({}):", taxonomy.len());
    let snapshot = store.snapshot().await;
    for (category, count) in category_distribution(&snapshot) {
        println!("    {count:>4}  {category}");
    }
    println!();

    Ok(())
}

async fn cmd_enrich_authors(
    input: &PathBuf,
    store_path: &PathBuf,
    dry_run: bool,
    workers: Option<usize>,
) -> Result<()> {
    let config = load_config()?;

    let papers = load_papers(input)?;
    let threshold = config.enrichment.highly_relevant_threshold;

    if dry_run {
        let authors = select_key_authors(&papers, threshold);
        println!();
        println!("  Key authors ({}):", authors.len());
        for author in authors {
            println!(
                "    {} — {} papers, {} highly relevant, avg {:.1}",
                author.name, author.paper_count, author.highly_relevant_count, author.avg_score
            );
        }
        println!();
        return Ok(());
    }

    let api_key = validate_api_key(&config)?;
    let engine_config = with_worker_override(EngineConfig::for_authors(&config), workers);
    info!(
        input = %input.display(),
        papers = papers.len(),
        workers = engine_config.workers,
        "enriching key authors"
    );

    let store = Arc::new(CheckpointStore::open(store_path).await?);
    let annotator = Arc::new(OpenRouterClient::new(
        &config.openrouter,
        api_key,
        &config.enrichment,
    )?);

    let progress = Arc::new(CliProgress::new("authors"));
    let summary = enrich_authors(
        &papers,
        threshold,
        annotator,
        store,
        engine_config,
        progress.clone(),
    )
    .await?;
    progress.finish();

    println!();
    println!("  Author enrichment finished.");
    print_summary(&summary);
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Dry runs write to their own store by default: a taxonomy generated
/// from a 10-paper sample must not be persisted where a later full run
/// would reuse it.
fn resolve_paper_store(store: Option<PathBuf>, dry_run: bool) -> PathBuf {
    store.unwrap_or_else(|| {
        if dry_run {
            PathBuf::from("enriched_dry_run.json")
        } else {
            PathBuf::from("enriched.json")
        }
    })
}

fn with_worker_override(mut config: EngineConfig, workers: Option<usize>) -> EngineConfig {
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }
    config
}

fn print_summary(summary: &RunSummary) {
    println!("  Total:     {}", summary.total_items);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Succeeded: {}", summary.succeeded);
    println!("  Failed:    {}", summary.failed);
    if !summary.failures.is_empty() {
        println!("  Failures:");
        for failure in &summary.failures {
            println!("    {} — {}", failure.item_id, failure.error);
        }
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Progress bar over the pending portion of a run.
struct CliProgress {
    bar: ProgressBar,
    label: &'static str,
}

impl CliProgress {
    fn new(label: &'static str) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("=> "),
        );
        Self { bar, label }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl EnrichmentProgress for CliProgress {
    fn begin(&self, total: usize, skipped: usize) {
        self.bar.set_length((total - skipped) as u64);
        self.bar.set_message(format!(
            "{} ({} already complete)",
            self.label, skipped
        ));
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(std::time::Duration::from_millis(80));
    }

    fn item_finished(&self, _item_id: &str, _success: bool) {
        self.bar.inc(1);
    }
}
