use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use omdb_client::OmdbClient;
use recall_archive::{
    renderer_from_config, BookshelfScraper, Caches, CatalogResolver, KnowledgeGraphResolver,
    RetryPolicy, WikiPlots, WorkIndex,
};
use recall_common::Config;
use recall_linker::{
    load_threads, BookLinker, GroundTruthDriver, Interrupts, MentionResolver, MovieLinker,
    NegativeMiner, RunStats,
};
use wikimedia_client::WikimediaClient;

#[derive(Parser)]
#[command(name = "recall", about = "Link remembered-but-unnamed threads to catalog entities")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the solved path of every movie thread
    MoviesGt(RunArgs),
    /// Mine every movie candidate linked anywhere in each thread
    MoviesNegatives(RunArgs),
    /// Resolve the solved path of every book thread
    BooksGt(RunArgs),
    /// Mine every book candidate linked anywhere in each thread
    BooksNegatives(RunArgs),
    /// Build (or rebuild) the persisted work index from BOOKGRAPH_DIR
    BuildWorkIndex,
}

#[derive(Args)]
struct RunArgs {
    /// Thread dump: JSON map, array, single thread, or JSON lines
    #[arg(long)]
    input: PathBuf,
    /// Directory receiving one `<thread_id>.json` per thread
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy)]
enum Mode {
    GroundTruth,
    Negatives,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("recall=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.log_redacted();

    let caches = Caches::open(&config.cache_dir)?;
    let retry = RetryPolicy::new(config.http_max_attempts, config.retry_base);

    let stats = match cli.command {
        Command::MoviesGt(args) => {
            let linker = movie_linker(&config, &caches, retry)?;
            run(&linker, &args, Mode::GroundTruth, &config).await?
        }
        Command::MoviesNegatives(args) => {
            let linker = movie_linker(&config, &caches, retry)?;
            run(&linker, &args, Mode::Negatives, &config).await?
        }
        Command::BooksGt(args) => {
            let linker = book_linker(&config, &caches, retry)?;
            run(&linker, &args, Mode::GroundTruth, &config).await?
        }
        Command::BooksNegatives(args) => {
            let linker = book_linker(&config, &caches, retry)?;
            run(&linker, &args, Mode::Negatives, &config).await?
        }
        Command::BuildWorkIndex => {
            let dir = config
                .bookgraph_dir
                .as_deref()
                .context("BOOKGRAPH_DIR environment variable is required")?;
            let index = WorkIndex::build(dir, &caches.bookgraph)?;
            info!(works = index.work_count(), "Work index built");
            return Ok(());
        }
    };

    info!("{stats}");
    if stats.interrupted {
        std::process::exit(130);
    }
    Ok(())
}

async fn run(
    resolver: &dyn MentionResolver,
    args: &RunArgs,
    mode: Mode,
    config: &Config,
) -> Result<RunStats> {
    let threads = load_threads(&args.input)?;
    let mut interrupts = Interrupts::listen();
    let stats = match mode {
        Mode::GroundTruth => {
            let driver = GroundTruthDriver::new(resolver, &args.out)?;
            driver.run(&threads, &mut interrupts).await?
        }
        Mode::Negatives => {
            let miner = NegativeMiner::new(resolver, &args.out, config.interrupt_grace)?;
            miner.run(&threads, &mut interrupts).await?
        }
    };
    Ok(stats)
}

fn knowledge_graph(config: &Config, caches: &Caches, retry: RetryPolicy) -> KnowledgeGraphResolver {
    let client = WikimediaClient::new(&config.wikipedia_api_url, &config.wikidata_api_url);
    KnowledgeGraphResolver::new(
        Arc::new(client),
        caches,
        retry,
        config.kg_search_limit,
        &config.kg_language,
    )
}

fn movie_linker(config: &Config, caches: &Caches, retry: RetryPolicy) -> Result<MovieLinker> {
    let key = config.require_omdb_api_key()?;
    let omdb = OmdbClient::with_base_url(&config.omdb_base_url, key.to_string());
    let catalog = CatalogResolver::new(Arc::new(omdb), caches.catalog.clone(), retry);

    let wikiplots = match &config.wikiplots_path {
        Some(dir) => Some(load_wikiplots(dir)?),
        None => {
            warn!("WIKIPLOTS_PATH not set, plots come from encyclopedia pages only");
            None
        }
    };

    Ok(MovieLinker::new(
        catalog,
        knowledge_graph(config, caches, retry),
        wikiplots,
    ))
}

fn load_wikiplots(dir: &Path) -> Result<WikiPlots> {
    let plots = WikiPlots::load(dir)
        .with_context(|| format!("Failed to load plot corpus from {}", dir.display()))?;
    info!(plots = plots.len(), "Loaded plot corpus");
    Ok(plots)
}

fn book_linker(config: &Config, caches: &Caches, retry: RetryPolicy) -> Result<BookLinker> {
    let scraper = BookshelfScraper::new(renderer_from_config(config), caches.bookshelf.clone(), retry);

    let works = match &config.bookgraph_dir {
        Some(dir) => {
            let index = WorkIndex::open(dir, &caches.bookgraph)
                .with_context(|| format!("Failed to open work index for {}", dir.display()))?;
            info!(works = index.work_count(), "Loaded work index");
            Some(index)
        }
        None => None,
    };

    Ok(BookLinker::new(
        scraper,
        knowledge_graph(config, caches, retry),
        works,
    ))
}
