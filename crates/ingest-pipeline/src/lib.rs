//! # ingest-pipeline
//!
//! Bulk catalog sweep: pages of catalog records are normalized, encoded
//! into vectors, buffered and written to the vector index in batches.
//!
//! ## Components
//! - [`normalize()`]: filters records without usable text, builds the
//!   canonical `"{title}: {synopsis}"` string
//! - [`BatchBuffer`]: accumulates points until the flush threshold
//! - [`SweepController`]: drives pages in order, isolates page and batch
//!   failures, paces requests and produces a [`SweepReport`]
//! - [`SweepCheckpoint`]: optional on-disk position for resumable sweeps

pub mod buffer;
pub mod checkpoint;
pub mod error;
pub mod normalize;
pub mod progress;
pub mod sweep;

pub use buffer::{Batch, BatchBuffer};
pub use checkpoint::SweepCheckpoint;
pub use error::PipelineError;
pub use normalize::{normalize, NormalizedText};
pub use progress::{SweepProgress, SweepReport, SweepState};
pub use sweep::{SweepConfig, SweepController};
