//! Leetcode Timer CLI
//!
//! Times problem files from first open to the save that ends them with the
//! completion marker, and posts the result to a chat.

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use leetcode_timer::config::{self, ConfigFile, Overrides};
use leetcode_timer::tracker::unix_now;
use leetcode_timer::watcher::{handle_event, FolderWatcher, IgnoreList};
use leetcode_timer::{ProblemStore, TelegramNotifier, TextDocument, TimerConfig, Tracker};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Leetcode Timer - time coding problems and report solves
#[derive(Parser, Debug)]
#[command(name = "leetcode-timer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Problem folder (overrides config)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Path to the data file (overrides config)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Completion marker (overrides config)
    #[arg(long, global = true)]
    marker: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// A problem file was opened in the editor
    Open {
        file: PathBuf,
    },
    /// A problem file was saved in the editor
    Save {
        file: PathBuf,
    },
    /// Watch the problem folder and treat new files as opened, writes as saved
    Watch,
    /// List running timers and solved problems
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli).await?;
    info!("Problem folder: {:?}", config.problem_dir);
    info!("Data file: {:?}", config.data_file);

    let store = ProblemStore::new(config.data_file.clone());
    let notifier = TelegramNotifier::new(&config)?;
    let tracker = Tracker::new(&config, store, notifier);

    match cli.command {
        Command::Open { file } => {
            let document = TextDocument::new(absolute(&file).await, String::new());
            tracker.document_opened(&document, unix_now()).await?;
        }
        Command::Save { file } => {
            let path = absolute(&file).await;
            let text = tokio::fs::read_to_string(&path).await?;
            let outcome = tracker
                .document_saved(&TextDocument::new(path, text), unix_now())
                .await?;
            if let Some(message) = outcome.message(tracker.marker()) {
                println!("{}", message);
            }
        }
        Command::Watch => run_watch(&config, &tracker).await?,
        Command::Status => print_status(&tracker).await,
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_config(cli: &Cli) -> anyhow::Result<TimerConfig> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let file = ConfigFile::load(&config_path).await?;

    let overrides = Overrides {
        problem_dir: cli.dir.clone(),
        data_file: cli.data_file.clone(),
        marker: cli.marker.clone(),
    };
    let mut config = config::resolve(file, |key| std::env::var(key).ok(), overrides)?;
    config.problem_dir = absolute(&config.problem_dir).await;
    Ok(config)
}

/// Canonical form of `path`, or `path` joined onto the working directory
/// when it cannot be canonicalized.
async fn absolute(path: &Path) -> PathBuf {
    match tokio::fs::canonicalize(path).await {
        Ok(path) => path,
        Err(_) => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf()),
    }
}

async fn run_watch(
    config: &TimerConfig,
    tracker: &Tracker<TelegramNotifier>,
) -> anyhow::Result<()> {
    let ignore = IgnoreList::new(&config.ignore)?;
    let watcher = FolderWatcher::start(&config.problem_dir, ignore)?;

    loop {
        tokio::select! {
            batch = watcher.next_batch() => {
                let Some(batch) = batch else { break };
                for event in batch {
                    match handle_event(tracker, &event, unix_now()).await {
                        Ok(Some(message)) => println!("{}", message),
                        Ok(None) => {}
                        Err(e) => error!("Failed to handle {:?}: {}", event, e),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watcher");
                break;
            }
        }
    }

    Ok(())
}

async fn print_status(tracker: &Tracker<TelegramNotifier>) {
    let document = tracker.store().snapshot().await;
    let now = unix_now();

    println!("Running ({}):", document.problems.len());
    for problem in document.problems.values() {
        let opened = Local
            .timestamp_millis_opt((problem.time * 1000.0) as i64)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "  {}  opened {}  ({})",
            problem.title,
            opened,
            leetcode_timer::tracker::format_elapsed(now - problem.time)
        );
    }

    println!("Solved ({}):", document.solutions.len());
    for solution in document.solutions.values() {
        println!("  {}  x{}", solution.title, solution.completeness);
    }
}
