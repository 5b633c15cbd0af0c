//! Sweep progress tracking and the final report.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Serialize;

/// Sweep controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "page")]
pub enum SweepState {
    Idle,
    Running(u32),
    PageSucceeded(u32),
    PageFailed(u32),
    Completed,
}

impl SweepState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SweepState::Completed)
    }
}

/// Counters maintained while a sweep runs.
#[derive(Debug, Clone)]
pub struct SweepProgress {
    pub state: SweepState,
    /// Page being processed (last processed once completed)
    pub current_page: u32,
    /// Points appended to the batch buffer
    pub total_added: u64,
    /// Pages whose fetch failed
    pub failed_pages: BTreeSet<u32>,
    /// Pages with points lost to failed flushes
    pub dropped_pages: BTreeSet<u32>,
    /// Pages fetched successfully
    pub pages_fetched: u32,
    /// Records without usable text
    pub skipped: u64,
    /// Entries the catalog returned that failed to decode
    pub malformed: u64,
    /// Records the encoder rejected
    pub encode_failures: u64,
    /// Successful upserts
    pub flushes: u64,
    /// Rejected upserts
    pub failed_flushes: u64,
    /// Points lost to failed flushes
    pub points_dropped: u64,
}

impl SweepProgress {
    pub fn new(start_page: u32) -> Self {
        Self {
            state: SweepState::Idle,
            current_page: start_page,
            total_added: 0,
            failed_pages: BTreeSet::new(),
            dropped_pages: BTreeSet::new(),
            pages_fetched: 0,
            skipped: 0,
            malformed: 0,
            encode_failures: 0,
            flushes: 0,
            failed_flushes: 0,
            points_dropped: 0,
        }
    }

    /// Freeze the counters into a report.
    pub fn into_report(self, collection: &str, first_page: u32, elapsed: Duration) -> SweepReport {
        SweepReport {
            collection: collection.to_string(),
            first_page,
            last_page: self.current_page,
            total_added: self.total_added,
            failed_pages: self.failed_pages,
            dropped_pages: self.dropped_pages,
            pages_fetched: self.pages_fetched,
            skipped: self.skipped,
            malformed: self.malformed,
            encode_failures: self.encode_failures,
            flushes: self.flushes,
            failed_flushes: self.failed_flushes,
            points_dropped: self.points_dropped,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Outcome of a completed sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub collection: String,
    pub first_page: u32,
    pub last_page: u32,
    pub total_added: u64,
    pub failed_pages: BTreeSet<u32>,
    pub dropped_pages: BTreeSet<u32>,
    pub pages_fetched: u32,
    pub skipped: u64,
    pub malformed: u64,
    pub encode_failures: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub points_dropped: u64,
    pub elapsed_ms: u64,
}

impl SweepReport {
    /// Points known to have reached the index.
    pub fn points_written(&self) -> u64 {
        self.total_added.saturating_sub(self.points_dropped)
    }

    /// Whether every page was fetched and every batch written.
    pub fn is_complete(&self) -> bool {
        self.failed_pages.is_empty() && self.dropped_pages.is_empty()
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ingested {} points into '{}' (pages {}-{}); failed pages: {:?}",
            self.total_added, self.collection, self.first_page, self.last_page, self.failed_pages
        )?;
        if !self.dropped_pages.is_empty() {
            write!(
                f,
                "; {} points dropped from pages {:?}",
                self.points_dropped, self.dropped_pages
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_from_progress() {
        let mut progress = SweepProgress::new(1);
        progress.current_page = 5;
        progress.total_added = 420;
        progress.failed_pages.insert(3);
        progress.points_dropped = 20;
        progress.dropped_pages.insert(4);

        let report = progress.into_report("movies", 1, Duration::from_millis(1500));
        assert_eq!(report.last_page, 5);
        assert_eq!(report.points_written(), 400);
        assert!(!report.is_complete());
        assert_eq!(report.elapsed_ms, 1500);
    }

    #[test]
    fn test_report_display() {
        let mut progress = SweepProgress::new(1);
        progress.current_page = 2;
        progress.total_added = 150;
        let report = progress.into_report("movies", 1, Duration::ZERO);
        assert_eq!(
            report.to_string(),
            "Ingested 150 points into 'movies' (pages 1-2); failed pages: {}"
        );

        let mut progress = SweepProgress::new(1);
        progress.current_page = 5;
        progress.total_added = 300;
        progress.failed_pages.insert(3);
        progress.points_dropped = 100;
        progress.dropped_pages.extend([1, 2]);
        let report = progress.into_report("movies", 1, Duration::ZERO);
        assert_eq!(
            report.to_string(),
            "Ingested 300 points into 'movies' (pages 1-5); failed pages: {3}; 100 points dropped from pages {1, 2}"
        );
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SweepState::PageFailed(3)).unwrap();
        assert_eq!(json, r#"{"state":"page_failed","page":3}"#);
        assert!(SweepState::Completed.is_terminal());
        assert!(!SweepState::Running(1).is_terminal());
    }
}
