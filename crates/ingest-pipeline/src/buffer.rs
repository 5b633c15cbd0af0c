//! Batch buffer between the encoder and the vector index writer.
//!
//! Points are kept in append order together with the page they came from,
//! so a failed batch can be attributed to pages and the checkpoint never
//! moves past a page whose points are still unflushed.

use std::collections::BTreeSet;

use ingest_types::IndexPoint;

/// Points drained from the buffer for one upsert.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub points: Vec<IndexPoint>,
    /// Source page of each point, parallel to `points`
    pub pages: Vec<u32>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Distinct pages covered by the batch.
    pub fn page_set(&self) -> BTreeSet<u32> {
        self.pages.iter().copied().collect()
    }
}

/// Ordered, bounded collection of points awaiting flush.
#[derive(Debug)]
pub struct BatchBuffer {
    threshold: usize,
    flush_at: usize,
    batch: Batch,
}

impl BatchBuffer {
    /// Create a buffer that asks for a flush at `threshold` points.
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            threshold,
            flush_at: threshold,
            batch: Batch::default(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn append(&mut self, page: u32, point: IndexPoint) {
        self.batch.points.push(point);
        self.batch.pages.push(page);
    }

    /// Whether enough points are buffered to flush.
    pub fn should_flush(&self) -> bool {
        self.len() >= self.flush_at
    }

    /// Take every buffered point, leaving the buffer empty.
    pub fn drain(&mut self) -> Batch {
        self.flush_at = self.threshold;
        std::mem::take(&mut self.batch)
    }

    /// Put a batch that failed to flush back ahead of newer points.
    ///
    /// The next flush is requested once another `threshold` points have
    /// arrived, so a failing store is not retried on every append.
    pub fn requeue(&mut self, mut batch: Batch) {
        batch.points.append(&mut self.batch.points);
        batch.pages.append(&mut self.batch.pages);
        self.batch = batch;
        self.flush_at = self.len() + self.threshold;
    }

    /// Earliest page with a point still in the buffer.
    pub fn oldest_page(&self) -> Option<u32> {
        self.batch.pages.iter().copied().min()
    }
}
