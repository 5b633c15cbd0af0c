//! Sweep controller.
//!
//! Walks the catalog's page space in order. For every page it fetches the
//! records, normalizes and encodes each one, and appends the resulting
//! points to the batch buffer, flushing it to the vector index whenever the
//! threshold is reached. A failed page or a failed flush is recorded and
//! the sweep moves on; only startup problems abort the run.
//!
//! Every step is awaited in sequence: one page in flight, one flush at a
//! time, points written in page order and API order within a page.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use ingest_catalog::{CatalogPage, CatalogSource};
use ingest_embeddings::EmbeddingModel;
use ingest_types::{CatalogRecord, Distance, FlushFailurePolicy, IndexPoint, Settings};
use ingest_vector::{ProvisionOutcome, VectorIndexWriter};

use crate::buffer::BatchBuffer;
use crate::checkpoint::SweepCheckpoint;
use crate::error::PipelineError;
use crate::normalize::normalize;
use crate::progress::{SweepProgress, SweepReport, SweepState};

/// Sweep configuration.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Target collection
    pub collection: String,
    /// Collection vector size; must match the encoder
    pub vector_size: usize,
    /// Collection distance metric
    pub distance: Distance,
    /// First page (inclusive)
    pub start_page: u32,
    /// Last page (inclusive)
    pub end_page: u32,
    /// Points per flush
    pub batch_size: usize,
    /// Pause after every page
    pub page_delay: Duration,
    /// What to do with a batch the store rejected
    pub flush_failure: FlushFailurePolicy,
    /// Consecutive failed flushes a retained batch survives before it is dropped
    pub max_flush_retries: u32,
    /// Stop after the last page the catalog reports
    pub respect_total_pages: bool,
    /// Checkpoint file
    pub checkpoint_path: Option<PathBuf>,
    /// Start from the checkpoint instead of `start_page`
    pub resume: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SweepConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            collection: settings.vector.collection.clone(),
            vector_size: settings.vector.vector_size,
            distance: settings.vector.distance,
            start_page: settings.sweep.start_page,
            end_page: settings.sweep.end_page,
            batch_size: settings.sweep.batch_size,
            page_delay: Duration::from_millis(settings.sweep.page_delay_ms),
            flush_failure: settings.sweep.flush_failure,
            max_flush_retries: settings.sweep.max_flush_retries,
            respect_total_pages: settings.sweep.respect_total_pages,
            checkpoint_path: settings.sweep.expanded_checkpoint_path(),
            resume: false,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.collection.trim().is_empty() {
            return Err(PipelineError::Config("collection must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("batch_size must be at least 1".into()));
        }
        if self.end_page == u32::MAX {
            return Err(PipelineError::Config(format!(
                "end_page must be < {}",
                u32::MAX
            )));
        }
        if self.start_page == 0 || self.start_page > self.end_page {
            return Err(PipelineError::Config(format!(
                "invalid page range {}..={}",
                self.start_page, self.end_page
            )));
        }
        if self.resume && self.checkpoint_path.is_none() {
            return Err(PipelineError::Config(
                "resume requested without a checkpoint path".into(),
            ));
        }
        Ok(())
    }
}

/// Drives catalog pages through normalize, encode, buffer and upsert.
pub struct SweepController {
    source: Arc<dyn CatalogSource>,
    encoder: Arc<dyn EmbeddingModel>,
    writer: VectorIndexWriter,
    config: SweepConfig,
}

/// Mutable state of one run.
struct Run {
    progress: SweepProgress,
    buffer: BatchBuffer,
    checkpoint: Option<(PathBuf, SweepCheckpoint)>,
    /// `total_added` when each page not yet behind the checkpoint started
    page_totals: BTreeMap<u32, u64>,
    /// Failed flushes in a row while a batch is retained
    retained_failures: u32,
}

impl SweepController {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        encoder: Arc<dyn EmbeddingModel>,
        writer: VectorIndexWriter,
        config: SweepConfig,
    ) -> Self {
        Self {
            source,
            encoder,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Startup checks: encoder dimension, then collection provisioning.
    pub async fn prepare(&self) -> Result<ProvisionOutcome, PipelineError> {
        self.config.validate()?;

        let encoder_dim = self.encoder.info().dimension;
        if encoder_dim != self.config.vector_size {
            return Err(PipelineError::DimensionMismatch {
                encoder: encoder_dim,
                collection: self.config.vector_size,
            });
        }

        let outcome = self
            .writer
            .ensure_collection(
                &self.config.collection,
                self.config.vector_size,
                self.config.distance,
            )
            .await?;
        Ok(outcome)
    }

    /// Run one sweep over the configured page range.
    pub async fn run(&self) -> Result<SweepReport, PipelineError> {
        let started = Instant::now();
        self.prepare().await?;

        let mut run = self.start_run()?;
        let first_page = run.progress.current_page;
        let mut last_page = self.config.end_page;

        info!(
            collection = %self.config.collection,
            first_page,
            last_page,
            batch_size = self.config.batch_size,
            model = %self.encoder.info().name,
            "Starting sweep"
        );

        let mut page = first_page;
        while page <= last_page {
            run.progress.current_page = page;
            run.progress.state = SweepState::Running(page);
            run.page_totals.insert(page, run.progress.total_added);

            match self.source.fetch_page(page).await {
                Ok(fetched) => {
                    if self.config.respect_total_pages {
                        if let Some(total) = fetched.total_pages {
                            let clamped = last_page.min(total.max(page));
                            if clamped < last_page {
                                info!(page, total_pages = total, "Catalog ends early");
                                last_page = clamped;
                            }
                        }
                    }
                    self.process_page(&mut run, page, fetched).await;
                    run.progress.pages_fetched += 1;
                    run.progress.state = SweepState::PageSucceeded(page);
                }
                Err(e) => {
                    error!(page, error = %e, "Page failed, skipping");
                    run.progress.failed_pages.insert(page);
                    run.progress.state = SweepState::PageFailed(page);
                }
            }

            self.save_checkpoint(&mut run, page + 1);

            if !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
            page += 1;
        }

        // Final flush of whatever is left; nothing survives past this point.
        self.flush(&mut run).await;
        if !run.buffer.is_empty() {
            let lost = run.buffer.drain();
            error!(points = lost.len(), pages = ?lost.page_set(), "Unflushed points lost at end of sweep");
            run.progress.points_dropped += lost.len() as u64;
            run.progress.dropped_pages.extend(lost.page_set());
        }
        run.progress.state = SweepState::Completed;
        self.save_checkpoint(&mut run, last_page.max(first_page.saturating_sub(1)) + 1);

        let report = run
            .progress
            .into_report(&self.config.collection, first_page, started.elapsed());

        info!(
            total_added = report.total_added,
            failed_pages = ?report.failed_pages,
            dropped_pages = ?report.dropped_pages,
            skipped = report.skipped,
            malformed = report.malformed,
            encode_failures = report.encode_failures,
            flushes = report.flushes,
            failed_flushes = report.failed_flushes,
            elapsed_ms = report.elapsed_ms,
            "Sweep complete"
        );
        Ok(report)
    }

    fn start_run(&self) -> Result<Run, PipelineError> {
        let mut progress = SweepProgress::new(self.config.start_page);
        let buffer = BatchBuffer::new(self.config.batch_size);

        let checkpoint = match &self.config.checkpoint_path {
            Some(path) => {
                let existing = if self.config.resume {
                    SweepCheckpoint::load(path)?
                } else {
                    None
                };
                let checkpoint = match existing {
                    Some(cp) if cp.collection == self.config.collection => {
                        let resume_at = cp.next_page.max(self.config.start_page);
                        info!(
                            path = ?path,
                            next_page = resume_at,
                            total_added = cp.total_added,
                            "Resuming from checkpoint"
                        );
                        progress.current_page = resume_at;
                        progress.total_added = cp.total_added;
                        // pages from resume_at on are fetched again
                        progress.failed_pages = pages_before(&cp.failed_pages, resume_at);
                        progress.dropped_pages = pages_before(&cp.dropped_pages, resume_at);
                        cp
                    }
                    Some(cp) => {
                        warn!(
                            path = ?path,
                            checkpoint_collection = %cp.collection,
                            collection = %self.config.collection,
                            "Ignoring checkpoint for another collection"
                        );
                        SweepCheckpoint::new(&self.config.collection, self.config.start_page)
                    }
                    None => SweepCheckpoint::new(&self.config.collection, self.config.start_page),
                };
                Some((path.clone(), checkpoint))
            }
            None => None,
        };

        Ok(Run {
            progress,
            buffer,
            checkpoint,
            page_totals: BTreeMap::new(),
            retained_failures: 0,
        })
    }

    async fn process_page(&self, run: &mut Run, page: u32, fetched: CatalogPage) {
        run.progress.malformed += fetched.malformed as u64;
        let records = fetched.records.len();

        for record in fetched.records {
            let Some(point) = self.to_point(run, &record) else {
                continue;
            };
            run.buffer.append(page, point);
            run.progress.total_added += 1;

            if run.buffer.should_flush() {
                self.flush(run).await;
            }
        }

        debug!(
            page,
            records,
            buffered = run.buffer.len(),
            total_added = run.progress.total_added,
            "Page processed"
        );
    }

    fn to_point(&self, run: &mut Run, record: &CatalogRecord) -> Option<IndexPoint> {
        let Some(text) = normalize(record) else {
            debug!(id = record.id, "Skipping record without text");
            run.progress.skipped += 1;
            return None;
        };

        match self.encoder.encode(text.as_str()) {
            Ok(vector) => Some(IndexPoint::new(record.id, vector, record.payload())),
            Err(e) => {
                warn!(id = record.id, error = %e, "Failed to encode record, skipping");
                run.progress.encode_failures += 1;
                None
            }
        }
    }

    async fn flush(&self, run: &mut Run) {
        if run.buffer.is_empty() {
            return;
        }
        let batch = run.buffer.drain();

        match self.writer.upsert(&self.config.collection, &batch.points).await {
            Ok(()) => {
                run.progress.flushes += 1;
                run.retained_failures = 0;
                info!(
                    points = batch.len(),
                    total_added = run.progress.total_added,
                    "Flushed batch"
                );
            }
            Err(e) => {
                run.progress.failed_flushes += 1;
                let retain = self.config.flush_failure == FlushFailurePolicy::Retain
                    && run.retained_failures < self.config.max_flush_retries;
                if retain {
                    run.retained_failures += 1;
                    warn!(
                        error = %e,
                        points = batch.len(),
                        attempt = run.retained_failures,
                        "Batch kept for next flush"
                    );
                    run.buffer.requeue(batch);
                } else {
                    run.retained_failures = 0;
                    error!(error = %e, points = batch.len(), pages = ?batch.page_set(), "Batch dropped");
                    run.progress.points_dropped += batch.len() as u64;
                    run.progress.dropped_pages.extend(batch.page_set());
                }
            }
        }
    }

    /// Persist the checkpoint if the first unflushed page moved forward.
    fn save_checkpoint(&self, run: &mut Run, next_if_flushed: u32) {
        let Some((path, checkpoint)) = run.checkpoint.as_mut() else {
            return;
        };

        let next_page = run
            .buffer
            .oldest_page()
            .unwrap_or(next_if_flushed)
            .max(checkpoint.next_page);
        // Everything from next_page on is refetched by a resumed sweep, so the
        // checkpoint only describes pages before it.
        let total_added = run
            .page_totals
            .get(&next_page)
            .copied()
            .unwrap_or(run.progress.total_added);
        run.page_totals = run.page_totals.split_off(&next_page);

        let failed_pages = pages_before(&run.progress.failed_pages, next_page);
        let dropped_pages = pages_before(&run.progress.dropped_pages, next_page);
        if next_page == checkpoint.next_page
            && failed_pages == checkpoint.failed_pages
            && dropped_pages == checkpoint.dropped_pages
        {
            return;
        }

        checkpoint.next_page = next_page;
        checkpoint.failed_pages = failed_pages;
        checkpoint.dropped_pages = dropped_pages;
        checkpoint.total_added = total_added;
        if let Err(e) = checkpoint.save(path) {
            warn!(path = ?path, error = %e, "Failed to write checkpoint");
        }
    }
}

fn pages_before(pages: &BTreeSet<u32>, page: u32) -> BTreeSet<u32> {
    pages.range(..page).copied().collect()
}
