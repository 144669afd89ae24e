//! Crawl orchestrator.
//!
//! Walks the configured date range one day at a time:
//! `Idle → FetchingIndex → FetchingDebates → AdvanceDate → ... → Complete`.
//! Every outbound fetch (and every cache hit) goes through one rate limiter,
//! so there is never more than one request in flight.
//!
//! The checkpoint only moves after a whole day commits. A day or debate that
//! exhausts its retries is logged to `failed_units.jsonl` and freezes the
//! checkpoint at the day before it; later days are still crawled and a re-run
//! picks the failed unit up again, with dedup suppressing what was already written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use hansard_client::{with_retry, FetchOutcome, RateLimiter, RetryPolicy};
use hansard_common::{ClassifiedQuote, Config, DebateRef, House};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::assembler::Assembler;
use crate::classifier::Classifier;
use crate::lexicon::Lexicon;
use crate::sitting::{is_relevant_title, parse_sitting_index};
use crate::state::{Checkpoint, DedupStore, FailedUnit, FailureLog, IndexCache};
use crate::stats::CrawlStats;
use crate::traits::HansardSource;
use crate::walker::{walk, DebateNode};
use crate::writer::{read_jsonl, IncrementalWriter, QUOTES_JSONL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    FetchingIndex(NaiveDate),
    FetchingDebates(NaiveDate),
    AdvanceDate(NaiveDate),
    Complete,
    /// Stop flag observed; the interrupted day was not committed.
    Stopped,
}

/// How a single day ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// Weekend, not fetched.
    Skipped,
    /// No sitting (index absent) or no debates listed.
    Empty,
    Completed { debates: usize, written: usize },
    /// Some debates exhausted their retries.
    Partial { failed: usize, written: usize },
    /// The sitting index itself exhausted its retries.
    Failed,
    Interrupted,
}

impl DayOutcome {
    /// Whether the day may be checkpointed.
    pub fn is_complete(&self) -> bool {
        matches!(
            self,
            DayOutcome::Skipped | DayOutcome::Empty | DayOutcome::Completed { .. }
        )
    }
}

enum IndexFetch {
    Found(Value),
    NoSitting,
    Failed,
}

pub struct Crawler<S: HansardSource> {
    source: S,
    start: NaiveDate,
    end: NaiveDate,
    skip_weekends: bool,
    relevant_titles_only: bool,
    confidence_threshold: u8,
    limiter: RateLimiter,
    retry: RetryPolicy,
    assembler: Assembler,
    classifier: Classifier,
    writer: IncrementalWriter,
    dedup: DedupStore,
    checkpoint: Checkpoint,
    cache: IndexCache,
    failures: FailureLog,
    stats: CrawlStats,
    /// First day that did not fully commit in this run.
    frozen_at: Option<NaiveDate>,
    stop: Arc<AtomicBool>,
    state: CrawlState,
}

impl<S: HansardSource> Crawler<S> {
    /// Open on-disk state under `config.output_dir` and build the pipeline.
    pub fn new(source: S, config: &Config) -> Result<Self> {
        let dir = config.output_dir.as_path();
        let writer = IncrementalWriter::open(dir)
            .with_context(|| format!("Failed to open corpus in {}", dir.display()))?;
        let existing = read_jsonl(&dir.join(QUOTES_JSONL)).context("Failed to read corpus")?;
        let dedup = DedupStore::open(dir, &existing).context("Failed to load dedup keys")?;
        info!(
            records = existing.len(),
            dedup_keys = dedup.len(),
            dir = %dir.display(),
            "Corpus opened"
        );

        let lexicon = Lexicon::from_config(config.lexicon.as_ref());
        Ok(Self {
            assembler: Assembler::new(lexicon.clone(), config.window, source.base_url()),
            classifier: Classifier::new(lexicon),
            source,
            start: config.start_date,
            end: config.end_date,
            skip_weekends: config.skip_weekends,
            relevant_titles_only: config.relevant_titles_only,
            confidence_threshold: config.confidence_threshold,
            limiter: RateLimiter::new(config.min_request_spacing(), config.max_jitter()),
            retry: RetryPolicy::new(config.max_retries, config.retry_base(), config.max_jitter()),
            writer,
            dedup,
            checkpoint: Checkpoint::new(dir),
            cache: IndexCache::new(dir),
            failures: FailureLog::new(dir),
            stats: CrawlStats::default(),
            frozen_at: None,
            stop: Arc::new(AtomicBool::new(false)),
            state: CrawlState::Idle,
        })
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share a stop flag (set from a signal handler) with the crawler.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// First day to crawl: the day after the checkpoint, or the configured start.
    pub fn resume_date(&self) -> Result<NaiveDate> {
        let checkpoint = self.checkpoint.load().context("Failed to read checkpoint")?;
        Ok(match checkpoint.and_then(|d| d.succ_opt()) {
            Some(next) if next > self.start => {
                info!(checkpoint = ?checkpoint, resume = %next, "Resuming from checkpoint");
                next
            }
            _ => self.start,
        })
    }

    /// Crawl from the resume point to the end date, or until stopped.
    pub async fn run(&mut self) -> Result<CrawlStats> {
        self.state = CrawlState::Idle;
        let mut date = self.resume_date()?;
        info!(from = %date, to = %self.end, "Crawl starting");

        while date <= self.end {
            if self.stop_requested() {
                break;
            }

            let outcome = self.process_day(date).await?;
            if outcome == DayOutcome::Interrupted {
                break;
            }
            self.commit_day(date, &outcome)?;

            self.state = CrawlState::AdvanceDate(date);
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }

        // A stop raised after the last day committed still counts as complete.
        self.state = if self.stop_requested() && date <= self.end {
            info!(at = %date, "Crawl stopped; re-run to continue");
            CrawlState::Stopped
        } else {
            CrawlState::Complete
        };
        if let Some(frozen) = self.frozen_at {
            warn!(
                %frozen,
                "Some units failed; checkpoint held before this day. See failed_units.jsonl"
            );
        }
        Ok(self.stats.clone())
    }

    fn commit_day(&mut self, date: NaiveDate, outcome: &DayOutcome) -> Result<()> {
        self.stats.days_processed += 1;
        if outcome.is_complete() {
            if self.frozen_at.is_none() {
                self.checkpoint
                    .save(date)
                    .with_context(|| format!("Failed to write checkpoint for {date}"))?;
            }
        } else if self.frozen_at.is_none() {
            warn!(%date, ?outcome, "Day incomplete; checkpoint will not advance past it");
            self.frozen_at = Some(date);
        }
        match outcome {
            DayOutcome::Completed { debates, written } => {
                info!(%date, debates, written, "Day complete");
            }
            DayOutcome::Partial { failed, written } => {
                info!(%date, failed, written, "Day partially complete");
            }
            other => debug!(%date, outcome = ?other, "Day done"),
        }
        Ok(())
    }

    /// Fetch, walk, match, classify and write one day. Does not touch the checkpoint.
    pub async fn process_day(&mut self, date: NaiveDate) -> Result<DayOutcome> {
        if self.skip_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            self.stats.days_skipped += 1;
            return Ok(DayOutcome::Skipped);
        }

        self.state = CrawlState::FetchingIndex(date);
        let index = match self.fetch_index(date).await? {
            IndexFetch::Found(index) => index,
            IndexFetch::NoSitting => {
                debug!(%date, "No sitting");
                self.stats.days_empty += 1;
                return Ok(DayOutcome::Empty);
            }
            IndexFetch::Failed => return Ok(DayOutcome::Failed),
        };

        let debates = parse_sitting_index(date, &index);
        if debates.is_empty() {
            self.stats.days_empty += 1;
            return Ok(DayOutcome::Empty);
        }

        self.state = CrawlState::FetchingDebates(date);
        let mut fetched = 0;
        let mut failed = 0;
        let mut written = 0;
        for debate in &debates {
            if self.stop_requested() {
                info!(%date, "Stop requested mid-day; day will be redone");
                return Ok(DayOutcome::Interrupted);
            }
            if self.relevant_titles_only && !is_relevant_title(&debate.title) {
                self.stats.debates_filtered += 1;
                continue;
            }

            let source = &self.source;
            let href = debate.href.as_str();
            let outcome =
                with_retry(&self.retry, &mut self.limiter, href, || source.debate(href)).await;
            match outcome {
                FetchOutcome::Fetched(document) => {
                    self.stats.debates_fetched += 1;
                    fetched += 1;
                    written += self.process_debate(date, debate, &document)?;
                }
                FetchOutcome::Absent => {
                    self.stats.debates_absent += 1;
                    debug!(%date, href, "Debate document absent");
                }
                FetchOutcome::Failed { attempts, error } => {
                    warn!(%date, href, attempts, error = %error, "Debate failed after retries");
                    self.failures
                        .record(&FailedUnit::debate(date, href, error.to_string()))
                        .context("Failed to record failed debate")?;
                    self.stats.debates_failed += 1;
                    failed += 1;
                }
            }
        }

        Ok(if failed > 0 {
            DayOutcome::Partial { failed, written }
        } else {
            DayOutcome::Completed {
                debates: fetched,
                written,
            }
        })
    }

    async fn fetch_index(&mut self, date: NaiveDate) -> Result<IndexFetch> {
        if let Some(index) = self.cache.get(date) {
            // Politeness holds even when nothing goes over the wire.
            self.limiter.wait().await;
            debug!(%date, "Sitting index from cache");
            return Ok(IndexFetch::Found(index));
        }

        let source = &self.source;
        let outcome = with_retry(&self.retry, &mut self.limiter, "sitting index", || {
            source.sitting_index(date)
        })
        .await;
        match outcome {
            FetchOutcome::Fetched(index) => {
                if let Err(e) = self.cache.put(date, &index) {
                    warn!(%date, error = %e, "Failed to cache sitting index");
                }
                Ok(IndexFetch::Found(index))
            }
            FetchOutcome::Absent => Ok(IndexFetch::NoSitting),
            FetchOutcome::Failed { attempts, error } => {
                warn!(%date, attempts, error = %error, "Sitting index failed after retries");
                self.failures
                    .record(&FailedUnit::day(date, error.to_string()))
                    .context("Failed to record failed day")?;
                self.stats.days_failed += 1;
                Ok(IndexFetch::Failed)
            }
        }
    }

    /// Walk one debate and write every new qualifying quote. Returns records written.
    fn process_debate(&mut self, date: NaiveDate, debate: &DebateRef, document: &Value) -> Result<usize> {
        let root = DebateNode::parse(document);
        let title = if debate.title.is_empty() {
            root.title().unwrap_or_default()
        } else {
            debate.title.as_str()
        };
        let house = House::from_href(&debate.href).unwrap_or(debate.house);

        let mut written = 0;
        for speech in walk(&root, house, title) {
            self.stats.speeches_walked += 1;
            let Some(candidate) = self.assembler.assemble(date, debate, &speech) else {
                continue;
            };
            self.stats.candidates += 1;

            let key = candidate.dedup_key();
            if self.dedup.contains(&key) {
                self.stats.duplicates += 1;
                debug!(member = candidate.member.as_str(), "Duplicate quote suppressed");
                continue;
            }

            let (frame, confidence) = self.classifier.classify(&candidate.quote);
            let record = ClassifiedQuote::new(candidate, frame, confidence);
            // Record before key: a crash in between is healed by the key union on load.
            self.writer.append(&record).context("Failed to append quote")?;
            self.dedup.insert(&key).context("Failed to persist dedup key")?;

            self.stats.records_written += 1;
            self.stats.count_frame(frame);
            if confidence >= self.confidence_threshold {
                self.stats.high_confidence += 1;
            }
            written += 1;
        }
        Ok(written)
    }
}
