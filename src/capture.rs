//! Bounded pulse-train accumulation — the edge-fed capture state machine.
//!
//! A [`PulseTrainAccumulator`] turns a stream of alternating pulse/space
//! durations into a bounded sequence of classified [`PulseSpacePair`]s, owns
//! the per-capture [`BucketSet`], and decides when a capture is complete.
//! Finalizing runs the sort/merge pass and the frame-boundary analyzer, then
//! hands the result to a [`CaptureSink`] collaborator.
//!
//! # Invariants
//!
//! - The accumulator is the sole mutator of bucket and sequence state while
//!   accumulating; sort, merge and analysis run only from the finalize
//!   transition, never interleaved with new edges.
//!
//! - All bucket and sequence state is reset when a capture starts — nothing
//!   leaks across captures except [`last_signal_at_us`].
//!
//! - The very first pulse/space pair of a capture may carry truncated timing
//!   from before the receiver AGC settled, so it is held unclassified and
//!   only written into slot 0 at finalize.
//!
//! - No timer is scheduled here: the caller polls
//!   [`no_change_timeout_us`] against its own clock and invokes
//!   [`finalize`] when the receiver has gone quiet.
//!
//! [`last_signal_at_us`]: PulseTrainAccumulator::last_signal_at_us
//! [`no_change_timeout_us`]: PulseTrainAccumulator::no_change_timeout_us
//! [`finalize`]: PulseTrainAccumulator::finalize

use heapless::Vec;

use crate::boundary::{self, FrameAnalysis};
use crate::bucket::{BucketSet, Channel, OVERFLOW_INDEX};
use crate::medium::{Medium, EDGE_TIMEOUT_US};
use crate::merge::Remap;

/// Capacity of the capture sequence, in pulse/space pairs.
pub const MAX_PAIRS: usize = 256;

/// Shortest edge accepted as signal (µs); anything at or below is glitch
/// noise from the receiver.
pub const MIN_EDGE_US: u32 = 75;

/// Fake one-microsecond edge used as an explicit end-of-transmission marker
/// when it arrives with zero signal strength.
pub const END_MARKER_US: u32 = 1;

/// One classified bit-time: bucket indices for a pulse and its trailing
/// space, each in `0..=15`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseSpacePair {
    /// Bucket id of the pulse duration.
    pub pulse: u8,
    /// Bucket id of the space duration.
    pub space: u8,
}

impl PulseSpacePair {
    /// Placeholder occupying slot 0 until the deferred first pair is
    /// classified at finalize.
    const PENDING: Self = Self {
        pulse: OVERFLOW_INDEX,
        space: OVERFLOW_INDEX,
    };

    /// The index on one channel.
    pub fn channel(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Pulse => self.pulse,
            Channel::Space => self.space,
        }
    }
}

/// Everything a finalized capture hands to downstream collaborators.
///
/// Borrows from the accumulator for the duration of the
/// [`CaptureSink::capture_complete`] call; collaborators copy out what they
/// need to keep.
#[derive(Debug)]
pub struct CaptureReport<'a> {
    /// Medium the capture was received on.
    pub medium: Medium,
    /// Sorted (and, for RF, merged) timing buckets.
    pub buckets: &'a BucketSet,
    /// The classified capture sequence, indices consistent with `buckets`.
    pub pairs: &'a [PulseSpacePair],
    /// Channel roles and package boundaries.
    pub analysis: &'a FrameAnalysis,
    /// Caller clock at the first edge of the capture (µs).
    pub started_at_us: u64,
    /// Caller clock at finalize (µs).
    pub finished_at_us: u64,
    /// Total edges accepted into the capture.
    pub edge_count: u32,
}

/// Collaborator notified of capture lifecycle events.
///
/// The rendering/decoding side of the pipeline implements this; the
/// accumulator stays free of any output concern.
pub trait CaptureSink {
    /// A new capture has started — reset any displayed signal indicator.
    fn capture_started(&mut self) {}

    /// A capture finalized with enough edges; the analyzer has run.
    fn capture_complete(&mut self, report: &CaptureReport<'_>);

    /// A capture finalized below the minimum edge count and was dropped as
    /// noise without invoking the analyzer.
    fn capture_discarded(&mut self, edge_count: u32) {
        let _ = edge_count;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Accumulating,
}

/// The capture state machine: feeds edges to the classifier, defers the
/// first pair, and finalizes on capacity, end marker or external timeout.
#[derive(Debug)]
pub struct PulseTrainAccumulator {
    medium: Medium,
    state: State,
    buckets: BucketSet,
    pairs: Vec<PulseSpacePair, MAX_PAIRS>,
    /// Edges accepted this capture; even counts mean the next edge is a pulse.
    edge_count: u32,
    /// Raw durations of the deferred first pair, classified only at finalize.
    pending_first: Option<(u32, u32)>,
    /// Pulse duration waiting for its trailing space.
    last_pulse_us: u32,
    started_at_us: u64,
    last_edge_at_us: u64,
    last_signal_at_us: Option<u64>,
}

impl PulseTrainAccumulator {
    /// A fresh, idle accumulator for the given medium.
    pub fn new(medium: Medium) -> Self {
        Self {
            medium,
            state: State::Idle,
            buckets: BucketSet::new(),
            pairs: Vec::new(),
            edge_count: 0,
            pending_first: None,
            last_pulse_us: 0,
            started_at_us: 0,
            last_edge_at_us: 0,
            last_signal_at_us: None,
        }
    }

    /// Medium this accumulator was configured for.
    pub fn medium(&self) -> Medium {
        self.medium
    }

    /// `true` while a capture is in progress.
    pub fn is_accumulating(&self) -> bool {
        self.state == State::Accumulating
    }

    /// Edges accepted into the current capture.
    pub fn edge_count(&self) -> u32 {
        self.edge_count
    }

    /// Caller clock of the most recent accepted edge, if accumulating.
    pub fn last_edge_at_us(&self) -> Option<u64> {
        match self.state {
            State::Accumulating => Some(self.last_edge_at_us),
            State::Idle => None,
        }
    }

    /// Caller clock of the last finalize that produced an analyzed capture.
    ///
    /// Persists across captures; display-only.
    pub fn last_signal_at_us(&self) -> Option<u64> {
        self.last_signal_at_us
    }

    /// How long (µs) the receiver may stay edge-free before the caller
    /// should invoke [`finalize`](Self::finalize).
    ///
    /// Pure query — no timer is armed. Returns the per-medium constant until
    /// 16 edges are pending, then the common edge timeout. (An adaptive
    /// timeout derived from the largest observed bucket was tried upstream
    /// and left disabled; this stays deliberately fixed.)
    pub fn no_change_timeout_us(&self) -> u32 {
        if self.edge_count < 16 {
            self.medium.signal_timeout_us()
        } else {
            EDGE_TIMEOUT_US
        }
    }

    /// Feed one edge.
    ///
    /// `duration_us` is the time since the previous transition,
    /// `carrier` the level the receiver output settled at (accepted for
    /// interface fidelity, not consulted), `strength` the current signal
    /// strength reading. `now_us` is the caller's monotonic clock.
    ///
    /// A duration of [`END_MARKER_US`] with zero `strength` finalizes the
    /// capture in place of a real edge. Durations outside
    /// `MIN_EDGE_US..EDGE_TIMEOUT_US` are ignored.
    ///
    /// Always returns `false` — "do not skip downstream decoders" — for
    /// compatibility with decoder-chaining callers.
    pub fn ingest_edge<S: CaptureSink>(
        &mut self,
        duration_us: u32,
        carrier: bool,
        strength: u8,
        now_us: u64,
        sink: &mut S,
    ) -> bool {
        let _ = carrier;

        if duration_us > MIN_EDGE_US && duration_us < EDGE_TIMEOUT_US {
            if self.state == State::Idle {
                self.begin_capture(now_us, sink);
            }

            if self.edge_count & 1 == 1 {
                // Odd edge: `duration_us` is the space completing a pair.
                if self.edge_count == 1 {
                    self.pending_first = Some((self.last_pulse_us, duration_us));
                    // Reserve slot 0 for the deferred pair.
                    let _ = self.pairs.push(PulseSpacePair::PENDING);
                } else {
                    let pair = self.classify_pair(self.last_pulse_us, duration_us);
                    let _ = self.pairs.push(pair);
                }
                if self.pairs.is_full() {
                    self.edge_count += 1;
                    self.finalize(now_us, sink);
                    return false;
                }
            } else {
                self.last_pulse_us = duration_us;
            }
            self.edge_count += 1;
            self.last_edge_at_us = now_us;
        }

        if strength == 0 && duration_us == END_MARKER_US {
            self.finalize(now_us, sink);
        }

        false
    }

    /// Finalize the current capture.
    ///
    /// Called internally on capacity and on the end marker; called by the
    /// owner when [`no_change_timeout_us`](Self::no_change_timeout_us) has
    /// elapsed without an edge. The deferred first pair is classified into
    /// slot 0; then either the capture clears the per-medium minimum edge
    /// count and is sorted, merged (RF) and analyzed, or it is dropped as
    /// noise. Either way the accumulator returns to idle.
    pub fn finalize<S: CaptureSink>(&mut self, now_us: u64, sink: &mut S) {
        if let Some((pulse_us, space_us)) = self.pending_first.take() {
            let first = self.classify_pair(pulse_us, space_us);
            self.pairs[0] = first;
        }

        if self.edge_count > self.medium.min_edges() {
            let sort_remap = self.buckets.sort_ascending();
            self.apply_remap(&sort_remap);
            if self.medium.merges_adjacent() {
                let merge_remap = self.buckets.merge_adjacent();
                self.apply_remap(&merge_remap);
            }

            let analysis = boundary::analyze(&self.buckets, &self.pairs, self.medium);
            sink.capture_complete(&CaptureReport {
                medium: self.medium,
                buckets: &self.buckets,
                pairs: &self.pairs,
                analysis: &analysis,
                started_at_us: self.started_at_us,
                finished_at_us: now_us,
                edge_count: self.edge_count,
            });
            self.last_signal_at_us = Some(now_us);
        } else if self.state == State::Accumulating {
            sink.capture_discarded(self.edge_count);
        }

        self.state = State::Idle;
        self.edge_count = 0;
        self.pairs.clear();
        self.buckets = BucketSet::new();
    }

    fn begin_capture<S: CaptureSink>(&mut self, now_us: u64, sink: &mut S) {
        self.state = State::Accumulating;
        self.buckets = BucketSet::new();
        self.pairs.clear();
        self.pending_first = None;
        self.edge_count = 0;
        self.started_at_us = now_us;
        self.last_edge_at_us = now_us;
        sink.capture_started();
    }

    fn classify_pair(&mut self, pulse_us: u32, space_us: u32) -> PulseSpacePair {
        PulseSpacePair {
            pulse: self.buckets.classify(pulse_us, Channel::Pulse),
            space: self.buckets.classify(space_us, Channel::Space),
        }
    }

    fn apply_remap(&mut self, remap: &Remap) {
        for pair in self.pairs.iter_mut() {
            pair.pulse = remap.apply(pair.pulse);
            pair.space = remap.apply(pair.space);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
