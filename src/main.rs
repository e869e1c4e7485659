use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use jobscan::{
    AdzunaProvider, ExtractionResult, HttpPageFetcher, JobService, ListFilter, Settings,
    SqliteStore,
};

#[derive(Parser)]
#[command(name = "jobscan", about = "Job posting ingestion and heuristic attribute extraction")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch recent postings from the provider and store new ones
    Ingest {
        /// City to search (default: nationwide)
        #[arg(short, long)]
        city: Option<String>,
        /// Only postings from the last N days
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Extract skills, experience, work mode and salary from a posting
    Analyze {
        /// Stored posting id
        #[arg(long, conflicts_with_all = ["text", "file"])]
        id: Option<i64>,
        /// Posting text
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// Read posting text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Fetch the live page and prefer its text
        #[arg(long)]
        url: Option<String>,
        /// Extra skills to look for, comma separated
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,
    },
    /// List stored postings, newest first
    List {
        /// Only postings from the last N days
        #[arg(short, long, default_value = "3")]
        days: u32,
        #[arg(short, long)]
        city: Option<String>,
        /// remote, hybrid, onsite or unknown
        #[arg(short, long)]
        mode: Option<String>,
        /// Keyword over title, company, city and description
        #[arg(short, long)]
        query: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: usize,
        #[arg(short = 'n', long, default_value = "20")]
        page_size: usize,
    },
    /// Show storage statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("loading settings")?;

    let store = SqliteStore::open(&settings.database.path).with_context(|| {
        format!("opening database {}", settings.database.path.display())
    })?;
    let fetcher = HttpPageFetcher::new(&settings.fetch)?;
    let service = JobService::new(settings.clone(), Arc::new(store), Arc::new(fetcher))?;

    match cli.command {
        Commands::Ingest { city, days } => {
            let provider = AdzunaProvider::new(&settings.provider)?;
            let service = service.with_provider(Arc::new(provider));
            let added = service
                .run_ingestion_cycle(city.as_deref(), days)
                .await
                .context("ingestion cycle failed")?;
            if cli.json {
                println!("{}", serde_json::json!({ "added": added }));
            } else {
                println!("Added {} new postings", added);
            }
        }
        Commands::Analyze { id, text, file, url, skills } => {
            let result = match (id, text, file) {
                (Some(id), _, _) => match service.analyze_stored(id, &skills).await? {
                    Some(r) => r,
                    None => bail!("no posting with id {}", id),
                },
                (None, Some(text), _) => {
                    service.analyze_posting(&text, url.as_deref(), &skills).await
                }
                (None, None, Some(path)) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    service.analyze_posting(&text, url.as_deref(), &skills).await
                }
                (None, None, None) => match url.as_deref() {
                    Some(u) => service.analyze_posting("", Some(u), &skills).await,
                    None => bail!("one of --id, --text, --file or --url is required"),
                },
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_extraction(&result);
            }
        }
        Commands::List { days, city, mode, query, page, page_size } => {
            let filter = ListFilter {
                days: Some(days),
                city,
                work_mode: mode,
                keyword: query,
                page,
                page_size,
                ..Default::default()
            };
            let (rows, total) = service.store().list_postings(&filter)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({ "total": total, "items": rows }))?
                );
                return Ok(());
            }
            if rows.is_empty() {
                println!("No postings found.");
                return Ok(());
            }

            println!(
                "{:>6} | {:<36} | {:<22} | {:<14} | {:<7} | {:<10}",
                "Id", "Title", "Company", "City", "Mode", "Posted"
            );
            println!("{}", "-".repeat(110));
            for p in &rows {
                let r = &p.record;
                let posted = r
                    .posted_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>6} | {:<36} | {:<22} | {:<14} | {:<7} | {:<10}",
                    p.id,
                    truncate(r.title.as_deref().unwrap_or("-"), 36),
                    truncate(r.company.as_deref().unwrap_or("-"), 22),
                    truncate(r.city.as_deref().unwrap_or("-"), 14),
                    r.work_mode,
                    posted
                );
            }
            println!(
                "\nPage {} ({} of {} postings)",
                filter.page.max(1),
                rows.len(),
                total
            );
        }
        Commands::Stats => {
            let s = service.store().stats()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&s)?);
                return Ok(());
            }
            println!("Total:     {}", s.total);
            println!("\nBy source:");
            for (source, n) in &s.by_source {
                println!("  {:<12} {}", source, n);
            }
            println!("\nBy work mode:");
            for (mode, n) in &s.by_work_mode {
                println!("  {:<12} {}", mode, n);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 && !cli.json {
        println!("\nDone in {}", format_duration(elapsed));
    }

    Ok(())
}

fn print_extraction(r: &ExtractionResult) {
    let skills = if r.skills.is_empty() {
        "-".to_string()
    } else {
        r.skills.join(", ")
    };
    println!("Skills:     {}", skills);
    println!("Experience: {}", r.years_experience_required);
    println!("Work mode:  {}", r.work_mode);
    println!("Salary:     {}", r.salary);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
