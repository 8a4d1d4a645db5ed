use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod analysis;
mod batch;
mod db;
mod error;
mod extract;
mod models;
mod pipeline;
mod report;
mod server;
mod subjects;
mod usage;

use extract::GradeExtractor;
use pipeline::{CheckResponse, GradeChecker, PdfTextExtractor};
use subjects::SubjectCatalog;
use usage::{MemoryUsageStore, UsageTracker, MAX_FREE_USES};

#[derive(Parser)]
#[command(name = "cbc-grade-checker")]
#[command(about = "Reads CBC report cards and summarizes learner performance", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single report card PDF
    Analyze {
        pdf: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Subject names to look for (defaults to the CBC junior school catalog)
        #[arg(long, value_delimiter = ',')]
        subjects: Vec<String>,
    },
    /// Analyze every PDF in a directory and export a CSV summary
    Batch {
        dir: PathBuf,
        #[arg(long, default_value = "results.csv")]
        out: PathBuf,
        #[arg(long, value_delimiter = ',')]
        subjects: Vec<String>,
    },
    /// Serve the upload endpoint over HTTP
    Serve {
        #[arg(long, env = "CBC_LISTEN_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        #[arg(long, value_enum, default_value_t = UsageBackend::Disabled)]
        usage: UsageBackend,
        #[arg(long, default_value_t = MAX_FREE_USES, value_parser = clap::value_parser!(i64).range(1..))]
        free_uses: i64,
        #[arg(long, default_value_t = 10 * 1024 * 1024)]
        max_upload_bytes: usize,
        #[arg(long, value_delimiter = ',')]
        subjects: Vec<String>,
    },
    /// Create or upgrade the usage tracking schema
    InitDb,
    /// Show free checks used by a client
    Usage {
        #[arg(long)]
        client: String,
        #[arg(long, default_value_t = MAX_FREE_USES, value_parser = clap::value_parser!(i64).range(1..))]
        free_uses: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum UsageBackend {
    #[value(name = "none")]
    Disabled,
    Memory,
    Postgres,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            pdf,
            format,
            out,
            subjects,
        } => {
            let checker = build_checker(&subjects)?;
            let bytes =
                std::fs::read(&pdf).with_context(|| format!("failed to read {}", pdf.display()))?;
            let outcome = checker
                .check(bytes)
                .await
                .with_context(|| format!("failed to analyze {}", pdf.display()))?;

            let rendered = match format {
                OutputFormat::Markdown => report::build_report(
                    &display_name(&pdf),
                    Utc::now().date_naive(),
                    &outcome,
                ),
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&CheckResponse::from(outcome))? + "\n"
                }
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Batch { dir, out, subjects } => {
            let checker = build_checker(&subjects)?;
            let rows = batch::run(&checker, &dir).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            batch::write_csv(file, &rows)?;
            println!("Wrote {} rows to {}.", rows.len(), out.display());
        }
        Commands::Serve {
            addr,
            usage,
            free_uses,
            max_upload_bytes,
            subjects,
        } => {
            let checker = Arc::new(build_checker(&subjects)?);
            match usage {
                UsageBackend::Disabled => {
                    let state = server::AppState::<MemoryUsageStore> {
                        checker,
                        usage: None,
                        max_upload_bytes,
                    };
                    server::serve(addr, state).await?;
                }
                UsageBackend::Memory => {
                    info!(free_uses, "tracking free usage in memory");
                    let tracker = UsageTracker::new(MemoryUsageStore::default(), free_uses);
                    let state = server::AppState {
                        checker,
                        usage: Some(Arc::new(tracker)),
                        max_upload_bytes,
                    };
                    server::serve(addr, state).await?;
                }
                UsageBackend::Postgres => {
                    info!(free_uses, "tracking free usage in Postgres");
                    let pool = db::connect().await?;
                    let tracker = UsageTracker::new(db::PgUsageStore::new(pool), free_uses);
                    let state = server::AppState {
                        checker,
                        usage: Some(Arc::new(tracker)),
                        max_upload_bytes,
                    };
                    server::serve(addr, state).await?;
                }
            }
        }
        Commands::InitDb => {
            let pool = db::connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Usage { client, free_uses } => {
            let pool = db::connect().await?;
            let tracker = UsageTracker::new(db::PgUsageStore::new(pool), free_uses);
            let used = tracker.usage_count(&client).await?;
            let remaining = tracker.remaining_uses(&client).await?;
            println!("{client}: {used} checks used, {remaining} free checks remaining.");
            if tracker.has_reached_limit(&client).await? {
                println!("Free limit reached; further checks require an account.");
            }
        }
    }

    Ok(())
}

fn build_checker(subjects: &[String]) -> anyhow::Result<GradeChecker> {
    let catalog = if subjects.is_empty() {
        SubjectCatalog::cbc()
    } else {
        SubjectCatalog::from_names(subjects)?
    };
    let grades = GradeExtractor::new(&catalog).context("failed to compile subject patterns")?;
    Ok(GradeChecker::new(Arc::new(PdfTextExtractor), grades))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
