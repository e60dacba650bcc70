//! Portable snapshot of a finalized capture for persistence and transport.
//!
//! A [`CaptureSnapshot`] copies everything out of a borrowed
//! [`CaptureReport`] into owned, serde-serializable records: bucket ranges
//! with their derived means, per-channel role assignments, the boundary
//! table and the full classified pair sequence. Raw durations are not
//! stored — the sequence is index-level, and the bucket table is what gives
//! the indices meaning.
//!
//! # no_std
//!
//! This module requires the `serde` feature. It uses `alloc::vec::Vec` via
//! the `serde` feature path and is compatible with no_std + alloc
//! environments.
//!
//! [`CaptureReport`]: crate::capture::CaptureReport

extern crate alloc;

use alloc::vec::Vec;

use crate::boundary::{BoundaryInterval, RoleClassification};
use crate::bucket::Bucket;
use crate::capture::{CaptureReport, PulseSpacePair};
use crate::medium::Medium;

/// Current capture snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// A serializable snapshot of one finalized capture.
///
/// # Example
///
/// ```rust,ignore
/// use psi_core::snapshot::CaptureSnapshot;
///
/// let snapshot = CaptureSnapshot::from_report(&report);
/// let json = serde_json::to_string(&snapshot).unwrap();
/// let restored: CaptureSnapshot = serde_json::from_str(&json).unwrap();
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct CaptureSnapshot {
    /// Format version — always [`SNAPSHOT_VERSION`] for newly created
    /// snapshots.
    pub version: u16,
    /// Medium the capture was received on.
    pub medium: Medium,
    /// Caller clock at the first edge of the capture (µs).
    pub started_at_us: u64,
    /// Caller clock at finalize (µs).
    pub finished_at_us: u64,
    /// Total edges accepted into the capture.
    pub edge_count: u32,
    /// Sorted bucket table; pair indices below refer into it.
    pub buckets: Vec<BucketRecord>,
    /// Role assignment for the pulse channel.
    pub pulse: RoleClassification,
    /// Role assignment for the space channel.
    pub space: RoleClassification,
    /// Repetition-consistent package intervals into `pairs`.
    pub boundaries: Vec<BoundaryInterval>,
    /// Inferred package payload length in bits (even; 0 when no package
    /// structure was found).
    pub package_bits: u32,
    /// How many package candidates agreed on `package_bits`.
    pub match_count: u32,
    /// The classified capture sequence.
    pub pairs: Vec<PulseSpacePair>,
}

/// Serializable representation of a single timing bucket.
///
/// The running sum and sample count are reduced to the derived mean — the
/// sum is an implementation detail of live accumulation.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct BucketRecord {
    /// Shortest duration absorbed (µs).
    pub min_us: u32,
    /// Longest duration absorbed (µs).
    pub max_us: u32,
    /// Mean of the absorbed durations (µs).
    pub mean_us: u32,
    /// Classifications on the pulse channel.
    pub pulse_hits: u32,
    /// Classifications on the space channel.
    pub space_hits: u32,
}

impl From<&Bucket> for BucketRecord {
    fn from(b: &Bucket) -> Self {
        Self {
            min_us: b.min_us,
            max_us: b.max_us,
            mean_us: b.mean_us(),
            pulse_hits: b.pulse_hits,
            space_hits: b.space_hits,
        }
    }
}

impl CaptureSnapshot {
    /// Build a snapshot from a borrowed capture report.
    pub fn from_report(report: &CaptureReport<'_>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            medium: report.medium,
            started_at_us: report.started_at_us,
            finished_at_us: report.finished_at_us,
            edge_count: report.edge_count,
            buckets: report.buckets.iter().map(BucketRecord::from).collect(),
            pulse: report.analysis.pulse,
            space: report.analysis.space,
            boundaries: report.analysis.boundaries.intervals.to_vec(),
            package_bits: report.analysis.boundaries.package_bits,
            match_count: report.analysis.boundaries.match_count,
            pairs: report.pairs.to_vec(),
        }
    }

    /// Number of pairs in the captured sequence.
    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// Number of timing buckets in the table.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
