//! Snapshot round-trip tests for the `serde` feature.
//!
//! Run with: `cargo test --features serde`

#![cfg(feature = "serde")]

use psi_core::capture::{
    CaptureReport, CaptureSink, PulseTrainAccumulator, END_MARKER_US,
};
use psi_core::medium::Medium;
use psi_core::snapshot::{CaptureSnapshot, SNAPSHOT_VERSION};

/// Sink that snapshots the report the moment it is delivered.
#[derive(Default)]
struct SnapshotSink {
    snapshot: Option<CaptureSnapshot>,
}

impl CaptureSink for SnapshotSink {
    fn capture_complete(&mut self, report: &CaptureReport<'_>) {
        self.snapshot = Some(CaptureSnapshot::from_report(report));
    }
}

/// Three repetitions of a short two-timing package over RF.
fn captured_snapshot() -> CaptureSnapshot {
    let mut acc = PulseTrainAccumulator::new(Medium::Rf);
    let mut sink = SnapshotSink::default();
    let mut now: u64 = 10_000;
    for _ in 0..3 {
        for k in 0..12 {
            let (pulse_us, space_us) = if k % 2 == 0 { (320, 980) } else { (980, 320) };
            now += pulse_us as u64;
            acc.ingest_edge(pulse_us, true, 50, now, &mut sink);
            now += space_us as u64;
            acc.ingest_edge(space_us, false, 50, now, &mut sink);
        }
        now += 5_100;
        acc.ingest_edge(5_100, false, 50, now, &mut sink);
        now += 320;
        acc.ingest_edge(320, true, 50, now, &mut sink);
    }
    acc.ingest_edge(END_MARKER_US, false, 0, now + 30_000, &mut sink);
    sink.snapshot.expect("capture should complete")
}

#[test]
fn test_snapshot_captures_report_fields() {
    let snapshot = captured_snapshot();

    assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    assert_eq!(snapshot.medium, Medium::Rf);
    assert!(snapshot.finished_at_us > snapshot.started_at_us);
    assert_eq!(snapshot.bucket_count(), 3); // short, long, gap
    assert_eq!(snapshot.pair_count(), snapshot.pairs.len());
    assert!(snapshot.edge_count > 48);

    // Records carry derived means, inside their own ranges.
    for b in &snapshot.buckets {
        assert!(b.min_us <= b.mean_us && b.mean_us <= b.max_us);
    }
}

#[test]
fn test_snapshot_json_round_trip() {
    let snapshot = captured_snapshot();

    let json = serde_json::to_string(&snapshot).expect("serialize");
    let restored: CaptureSnapshot = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored, snapshot);
    assert_eq!(restored.pulse, snapshot.pulse);
    assert_eq!(restored.boundaries, snapshot.boundaries);
}
