use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use canvaspal::config::ScoringConfig;
use canvaspal::models::{Category, PriorityBucket, WorkItem};
use canvaspal::observer::{InstrumentedScorer, TimingCollector, TracingObserver};
use canvaspal::priority::{filter_ranked, rank_items, PriorityEngine};
use canvaspal::{db, ingest, report};

#[derive(Parser)]
#[command(name = "canvaspal")]
#[command(about = "Priority ranking for course assignments and grades", long_about = None)]
struct Cli {
    /// Scoring config file (defaults to ./canvaspal.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ViewArgs {
    #[arg(long, value_enum)]
    bucket: Option<PriorityBucket>,
    #[arg(long, value_enum)]
    category: Option<Category>,
    #[arg(long, default_value_t = 10)]
    limit: usize,
    /// Print the ranking as JSON
    #[arg(long)]
    json: bool,
    /// Log a timing summary of the scoring pass
    #[arg(long)]
    timings: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample work items
    Seed,
    /// Import work items from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Rank work items from a CSV file without a database
    Rank {
        #[arg(long)]
        csv: PathBuf,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Rank stored work items
    Score {
        #[arg(long)]
        group: Option<String>,
        #[command(flatten)]
        view: ViewArgs,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        group: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Mark a stored work item as completed
    Complete {
        #[arg(long)]
        source_key: String,
        /// Mark the item as not completed instead
        #[arg(long)]
        undo: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn show_ranking(engine: PriorityEngine, items: &[WorkItem], view: &ViewArgs) -> anyhow::Result<()> {
    let now = Utc::now();
    let collector = TimingCollector::new();
    let ranked = if view.timings {
        let scorer = InstrumentedScorer::new(engine, (TracingObserver, &collector));
        rank_items(&scorer, items, now)
    } else {
        rank_items(&engine, items, now)
    };
    let ranked = filter_ranked(ranked, view.bucket, view.category);

    if view.json {
        let shown: Vec<_> = ranked.iter().take(view.limit).collect();
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else if ranked.is_empty() {
        println!("No work items match these filters.");
    } else {
        println!("Top work items by priority:");
        for scored in ranked.iter().take(view.limit) {
            println!("- {}", report::format_item_line(scored));
        }
    }

    for summary in collector.report() {
        tracing::info!(
            metric = %summary.name,
            count = summary.count,
            total = summary.total,
            average = summary.average,
            max = summary.max,
            min = summary.min,
            "scoring timings"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ScoringConfig::load(cli.config.as_deref())?;
    let engine = PriorityEngine::from_config(&config).context("unusable scoring config")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let inserted = db::seed(&connect().await?).await?;
            println!("Seed data inserted ({inserted} new work items).");
        }
        Commands::Import { csv } => {
            let counts = db::import_csv(&connect().await?, &csv).await?;
            println!(
                "Imported {} new and {} updated work items from {}.",
                counts.inserted,
                counts.updated,
                csv.display()
            );
        }
        Commands::Rank { csv, view } => {
            let items: Vec<WorkItem> = ingest::read_work_items(&csv)?
                .into_iter()
                .map(|imported| imported.item)
                .collect();
            tracing::info!(count = items.len(), path = %csv.display(), "ranking work items");
            show_ranking(engine, &items, &view)?;
        }
        Commands::Score { group, view } => {
            let items = db::fetch_items(&connect().await?, group.as_deref()).await?;
            show_ranking(engine, &items, &view)?;
        }
        Commands::Report { group, out } => {
            let items = db::fetch_items(&connect().await?, group.as_deref()).await?;
            let now = Utc::now();
            let ranked = rank_items(&engine, &items, now);
            let report = report::build_report(group.as_deref(), now, &ranked);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Complete { source_key, undo } => {
            let found = db::set_completed(&connect().await?, &source_key, !undo).await?;
            if found {
                let state = if undo { "open" } else { "completed" };
                println!("Marked {source_key} as {state}.");
            } else {
                tracing::warn!(%source_key, "no work item with this source key");
                println!("No work item found for {source_key}.");
            }
        }
    }

    Ok(())
}
