use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use thread_scraper::config::{DuplicatePolicy, Settings};
use thread_scraper::db::{default_store_path, Store};
use thread_scraper::fetch::canonical_thread_url;
use thread_scraper::report::{self, Report};
use tracing::{error, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "thread_scraper", about = "Download a forum thread into SQLite and report on it")]
struct Cli {
    /// Link to the first page of the thread
    #[arg(required_unless_present = "report")]
    thread_url: Option<String>,

    /// Database file (default: derived from the thread title)
    database: Option<PathBuf>,

    /// Report on an existing database without downloading
    #[arg(long, value_name = "DATABASE", conflicts_with_all = ["thread_url", "database"])]
    report: Option<PathBuf>,

    /// What to do with posts already in the database
    #[arg(long, value_enum)]
    policy: Option<DuplicatePolicy>,

    /// Stop after this many pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Number of top posters to list
    #[arg(long, default_value = "10")]
    top: usize,

    /// Width of the posts-per-day bars
    #[arg(long, default_value = "50")]
    width: usize,

    /// Skip the report after downloading
    #[arg(long)]
    no_report: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<thread_scraper::Error>()
                .map(thread_scraper::Error::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let t0 = Instant::now();

    if let Some(path) = &cli.report {
        anyhow::ensure!(path.exists(), "{:?} does not exist", path);
        let store = Store::open_read_only(path)
            .map_err(thread_scraper::Error::from)
            .with_context(|| format!("opening {:?}", path))?;
        if !cli.json {
            let threads = store.threads().map_err(thread_scraper::Error::from)?;
            println!("{:?} holds {} thread(s):", path, threads.len());
            for t in &threads {
                println!("  {}", t);
            }
        }
        return print_report(&store, None, path, &cli);
    }

    let mut settings = Settings::load().context("loading settings")?;
    if let Some(policy) = cli.policy {
        settings.duplicate_policy = policy;
    }
    if let Some(n) = cli.max_pages {
        settings.max_pages = n;
    }

    // clap guarantees the url when --report is absent
    let thread_url = cli.thread_url.clone().unwrap_or_default();
    let thread = Url::parse(&thread_url)
        .map(|u| canonical_thread_url(&u))
        .map_err(|e| thread_scraper::Error::from(thread_scraper::FetchError::from(e)))
        .with_context(|| format!("parsing {:?}", thread_url))?;
    let db_path = cli
        .database
        .clone()
        .unwrap_or_else(|| default_store_path(&thread));

    let stats = thread_scraper::download(thread.as_str(), &db_path, &settings)
        .with_context(|| format!("downloading {}", thread))?;

    if stats.duplicates > 0 {
        warn!(duplicates = stats.duplicates, "posts already stored were left unchanged");
    }
    if !cli.json {
        println!(
            "Stored {} new posts from {} pages in {:?} ({} replaced, {} already present, {} non-post blocks) in {:.1}s",
            stats.inserted,
            stats.pages,
            db_path,
            stats.replaced,
            stats.duplicates,
            stats.skipped_blocks,
            t0.elapsed().as_secs_f64(),
        );
    }

    if cli.no_report {
        return Ok(());
    }
    let store = Store::open_read_only(&db_path).map_err(thread_scraper::Error::from)?;
    print_report(&store, Some(thread.as_str()), &db_path, &cli)
}

fn print_report(store: &Store, thread: Option<&str>, path: &std::path::Path, cli: &Cli) -> Result<()> {
    let report = Report::build(store, thread, cli.top).map_err(thread_scraper::Error::from)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("\nTop posters in {} ({} posts):", name, report.total_posts);
    print!("{}", report::render_top_posters(&report.top_posters));
    println!("\nPosts per day for {}:", name);
    print!("{}", report::render_histogram(&report.posts_per_day, cli.width));
    Ok(())
}
