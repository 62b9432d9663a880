mod batch;
mod browser;
mod config;
mod confirm;
mod db;
mod error;
mod executor;
mod models;
mod platform;
mod profile;
mod recorder;
mod report;
mod selector;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use batch::{BatchController, ThreadSleeper};
use browser::WebDriverBackend;
use clap::{Args, Parser, Subcommand};
use config::Config;
use db::Database;
use executor::ApplyExecutor;
use models::JobPosting;
use selector::WorkSelector;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "batch-apply")]
#[command(about = "Apply to queued job postings in one paced, sequential batch")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the jobs database (overrides config and BATCH_APPLY_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct RunArgs {
    /// Maximum number of eligible jobs to select
    #[arg(short, long)]
    limit: Option<usize>,

    /// Submit without asking for confirmation
    #[arg(long)]
    unattended: bool,

    /// Run the apply flow but don't write outcomes to the database
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many jobs (overrides config)
    #[arg(long)]
    hard_cap: Option<usize>,

    /// Don't write the JSON run report
    #[arg(long)]
    no_report: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Show the eligible queue without applying
    Queue {
        /// Number of jobs to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write the queue's URLs to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Show the application record for a job
    Show {
        /// Job ID
        job_id: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,batch_apply=debug"
    } else {
        "warn,batch_apply=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.db {
        config.database = path;
    }
    let db = Database::new(&config.database);

    match cli.command {
        Some(Commands::Init) => {
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Some(Commands::Queue { limit, export }) => {
            db.ensure_initialized()?;
            let selector = WorkSelector::new(&config.selection);
            let jobs = selector.select(&db, limit)?;
            if jobs.is_empty() {
                println!("No eligible jobs.");
            } else {
                print_queue(&jobs);
            }
            if let Some(path) = export {
                export_urls(&jobs, &path)?;
                println!("\nSaved job URLs to: {}", path.display());
            }
        }

        Some(Commands::Show { job_id }) => {
            db.ensure_initialized()?;
            match db.get_application(&job_id)? {
                Some(record) => {
                    println!("Job #{}", record.job_id);
                    println!("Status: {}", record.status);
                    if let Some(platform) = &record.platform {
                        println!("Platform: {}", platform);
                    }
                    if let Some(applied_at) = record.applied_at {
                        println!("Applied: {}", applied_at.format("%Y-%m-%d %H:%M:%S UTC"));
                    }
                    if let Some(notes) = &record.notes {
                        println!("Notes: {}", notes);
                    }
                    if let Some(path) = &record.screenshot_path {
                        println!("Screenshot: {}", path);
                    }
                    println!("Updated: {}", record.updated_at);
                }
                None => {
                    println!("No application record for job #{}.", job_id);
                }
            }
        }

        None => run_batch(&config, &db, cli.run)?,
    }

    Ok(())
}

fn run_batch(config: &Config, db: &Database, args: RunArgs) -> Result<()> {
    db.ensure_initialized()?;

    let mut batch = config.batch.clone();
    batch.unattended |= args.unattended;
    batch.dry_run = args.dry_run;
    if args.hard_cap.is_some() {
        batch.hard_cap = args.hard_cap;
    }

    info!(
        database = %db.path().display(),
        unattended = batch.unattended,
        dry_run = batch.dry_run,
        "starting batch"
    );

    let selector = WorkSelector::new(&config.selection);
    let backend = WebDriverBackend::new(config.browser.clone())?;
    let mut executor = ApplyExecutor::new(
        backend,
        confirm::gate_for(batch.unattended),
        config.profile.clone(),
    )
    .with_screenshots(&config.screenshots_dir);
    let mut sleeper = ThreadSleeper;

    let report = {
        let mut controller =
            BatchController::new(&batch, db, &selector, &mut executor, &mut sleeper);
        if !args.no_report {
            controller = controller.with_reports_dir(&config.reports_dir);
        }
        controller.run(args.limit)?
    };

    report.print_summary();

    if let Err(e) = executor.into_backend().close() {
        warn!(error = %format!("{:#}", e), "browser did not shut down cleanly");
    }
    Ok(())
}

fn print_queue(jobs: &[JobPosting]) {
    println!(
        "{:<5} {:<10} {:<30} {:<20} {:>6} {:<12}",
        "RANK", "ID", "TITLE", "COMPANY", "SCORE", "PLATFORM"
    );
    println!("{}", "-".repeat(88));
    for (i, job) in jobs.iter().enumerate() {
        let score = job
            .match_score
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<5} {:<10} {:<30} {:<20} {:>6} {:<12}",
            i + 1,
            truncate(&job.id, 8),
            truncate(&job.title, 28),
            truncate(&job.company, 18),
            score,
            platform::classify(&job.url)
        );
    }
    println!("\nTotal: {}", jobs.len());
}

fn export_urls(jobs: &[JobPosting], path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writeln!(file, "Eligible jobs - URLs")?;
    writeln!(file, "{}\n", "=".repeat(80))?;
    for (i, job) in jobs.iter().enumerate() {
        writeln!(file, "{}. {} - {}", i + 1, job.company, job.title)?;
        writeln!(file, "   URL: {}", job.url)?;
        if let Some(location) = &job.location {
            writeln!(file, "   Location: {}", location)?;
        }
        if let Some(score) = job.match_score {
            writeln!(file, "   Match Score: {:.2}", score)?;
        }
        writeln!(file)?;
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
