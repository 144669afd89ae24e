use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hansard_client::HansardClient;
use hansard_collector::{writer, Classifier, Corpus, CorpusQuery, Crawler, Lexicon};
use hansard_common::{Config, Frame};

#[derive(Parser)]
#[command(
    name = "hansard-collector",
    about = "Collect and frame-classify migration/labour quotes from historic Hansard"
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory (overrides config and HANSARD_OUTPUT_DIR)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run or resume the crawl
    Crawl {
        #[arg(long)]
        start_year: Option<i32>,
        #[arg(long)]
        end_year: Option<i32>,
        /// Exact first day (YYYY-MM-DD); overrides --start-year
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Exact last day (YYYY-MM-DD); overrides --end-year
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        min_request_spacing_ms: Option<u64>,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        confidence_threshold: Option<u8>,
        /// Only fetch debates whose titles look relevant
        #[arg(long)]
        relevant_titles_only: bool,
        #[arg(long)]
        skip_weekends: bool,
    },
    /// Read rows from the corpus, highest confidence first
    Query {
        #[arg(long)]
        from_year: Option<i32>,
        #[arg(long)]
        to_year: Option<i32>,
        #[arg(long)]
        frame: Option<Frame>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_confidence: Option<u8>,
        #[arg(long)]
        limit: Option<usize>,
        /// Print rows as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Regenerate quotes.csv from quotes.jsonl
    RebuildCsv,
    /// Classify a piece of text and explain the result
    Classify {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("hansard=info".parse()?);
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    match cli.command {
        Command::Crawl {
            start_year,
            end_year,
            start_date,
            end_date,
            window,
            min_request_spacing_ms,
            max_retries,
            confidence_threshold,
            relevant_titles_only,
            skip_weekends,
        } => {
            if start_year.is_some() || end_year.is_some() {
                config.set_years(
                    start_year.unwrap_or(config.start_date.year()),
                    end_year.unwrap_or(config.end_date.year()),
                )?;
            }
            if let Some(d) = start_date {
                config.start_date = d;
            }
            if let Some(d) = end_date {
                config.end_date = d;
            }
            if let Some(v) = window {
                config.window = v;
            }
            if let Some(v) = min_request_spacing_ms {
                config.min_request_spacing_ms = v;
            }
            if let Some(v) = max_retries {
                config.max_retries = v;
            }
            if let Some(v) = confidence_threshold {
                config.confidence_threshold = v;
            }
            config.relevant_titles_only |= relevant_titles_only;
            config.skip_weekends |= skip_weekends;
            crawl(config).await
        }
        Command::Query {
            from_year,
            to_year,
            frame,
            search,
            min_confidence,
            limit,
            json,
        } => {
            let query = CorpusQuery {
                from_year,
                to_year,
                frame,
                search,
                min_confidence,
                limit,
            };
            let rows = Corpus::new(&config.output_dir).query(&query)?;
            for row in &rows {
                if json {
                    println!("{}", serde_json::to_string(row)?);
                } else {
                    let c = &row.candidate;
                    println!(
                        "[{:>2}] {:<13} {} {} ({}): {}",
                        row.confidence,
                        row.frame.as_str(),
                        c.date,
                        c.member,
                        c.house,
                        c.quote
                    );
                }
            }
            info!(rows = rows.len(), "Query complete");
            Ok(())
        }
        Command::RebuildCsv => {
            let rows = writer::rebuild_csv(&config.output_dir)?;
            info!(rows, dir = %config.output_dir.display(), "quotes.csv rebuilt");
            Ok(())
        }
        Command::Classify { text } => {
            config.validate()?;
            let classifier = Classifier::new(Lexicon::from_config(config.lexicon.as_ref()));
            let result = classifier.classify_detailed(&text.join(" "));
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}

async fn crawl(config: Config) -> Result<()> {
    config.validate()?;
    url::Url::parse(&config.base_url)
        .with_context(|| format!("Invalid base URL: {}", config.base_url))?;
    config.log_summary();

    let client = HansardClient::new(&config.base_url, &config.user_agent, config.request_timeout())?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping after the current debate");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let mut crawler = Crawler::new(client, &config)?.with_stop_flag(stop);
    let stats = crawler.run().await?;
    info!("{stats}");
    Ok(())
}
