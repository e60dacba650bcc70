//! Frame-boundary analysis of a classified capture.
//!
//! OOK protocols repeat their package several times so that at least one copy
//! arrives after the receiver AGC has settled, separated by gaps that are
//! clearly longer than any data timing. Nothing here knows any protocol:
//! roles are assigned purely from hit-frequency statistics, and package
//! boundaries are found by watching for indices beyond the data range.
//!
//! Per channel, the most frequent bucket is the long data timing and the
//! runner-up the short one; anything above the long timing is a gap
//! candidate. The boundary scan then walks the pair sequence, treating every
//! gap-classified index as a package edge and recording repeated runs of
//! matching bit length into a bounded [`BoundaryTable`].
//!
//! The output — role classification, gap thresholds and the boundary table —
//! is the contract handed to rendering and decoding collaborators; it is not
//! interpreted further here.

use heapless::Vec;

use crate::bucket::{BucketSet, Channel};
use crate::capture::PulseSpacePair;
use crate::medium::Medium;

/// Capacity of the boundary table.
pub const MAX_BOUNDARIES: usize = 8;

/// Start/end of a package may be garbled; runs within this many bit
/// positions of the reference length still count as a match.
pub const BOUNDARY_TOLERANCE_BITS: u32 = 4;

/// Short/long/gap role assignment for one channel, from hit frequencies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleClassification {
    /// Bucket id of the short data timing.
    pub data_short: u8,
    /// Bucket id of the long data timing. Ids above this are gaps.
    pub data_long: u8,
    /// Hits recorded for the short data timing.
    pub short_hits: u32,
    /// Hits recorded for the long data timing.
    pub long_hits: u32,
    /// Number of buckets busy enough to count as data timing classes.
    pub data_bucket_count: u32,
    /// Highest hit count among the gap candidates.
    pub gap_hit_max: u32,
}

impl RoleClassification {
    /// Assign roles for one channel of a sorted, merged bucket set.
    ///
    /// Ranks buckets by per-channel hit count. The top bucket is the long
    /// data timing; the runner-up (preferring the lower id, i.e. the shorter
    /// timing) is the short one. Buckets above the long timing are gap
    /// candidates. When even the long timing is no busier than the busiest
    /// gap candidate, the channel collapses to a single timing class: real
    /// data must repeat more often than inter-package gaps do.
    pub fn classify(set: &BucketSet, channel: Channel, medium: Medium) -> Self {
        let hits = |id: u8| set.channel_hits(id, channel);

        let mut data_short: u8 = 0;
        let mut short_hits = hits(0);
        let mut data_long: u8 = 1;
        let mut long_hits = hits(1);
        let mut gap_hit_max: u32 = 0;

        for i in 2..set.len() as u8 {
            let c = hits(i);
            if c > long_hits {
                // New top frequency; the old long becomes the short timing
                // only if it genuinely out-hit the current short.
                if long_hits > short_hits {
                    data_short = data_long;
                    short_hits = long_hits;
                }
                data_long = i;
                long_hits = c;
                gap_hit_max = 0;
            } else if c > short_hits {
                // New runner-up: the longer timing takes the long role.
                data_short = data_long;
                short_hits = long_hits;
                data_long = i;
                long_hits = c;
                gap_hit_max = 0;
            } else if c > gap_hit_max {
                gap_hit_max = c;
            }
        }

        let mut data_bucket_count = (0..set.len() as u8)
            .filter(|&i| hits(i) > medium.min_data_hits())
            .count() as u32;

        if long_hits <= gap_hit_max {
            // Single-timing-class protocol: fold short into long.
            data_short = data_long;
            long_hits += short_hits;
            short_hits = 0;
            data_bucket_count = 1;
        }

        Self {
            data_short,
            data_long,
            short_hits,
            long_hits,
            data_bucket_count,
            gap_hit_max,
        }
    }

    /// `true` if this classified index is a gap on this channel.
    pub fn is_gap(&self, id: u8) -> bool {
        id > self.data_long
    }
}

/// One candidate package: a half-open range of bit positions into the
/// capture sequence (pair `p` occupies positions `2p` and `2p + 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryInterval {
    /// First bit position of the run.
    pub start: u32,
    /// Bit position of the terminating gap edge (exclusive).
    pub end: u32,
}

/// Bounded table of candidate package boundaries found in one capture.
#[derive(Clone, Debug, Default)]
pub struct BoundaryTable {
    /// Recorded `{start, end}` intervals, oldest first. Runs beyond the
    /// table capacity still count toward `match_count`.
    pub intervals: Vec<BoundaryInterval, MAX_BOUNDARIES>,
    /// Number of runs that matched the reference length (± tolerance),
    /// whether or not an interval slot was free — the likely package count.
    pub match_count: u32,
    /// Inferred package bit length (reference run length, rounded to even).
    pub package_bits: u32,
}

/// The most-agreed-upon package among the recorded intervals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackageVote {
    /// Index into [`BoundaryTable::intervals`] of the representative package.
    pub interval: usize,
    /// Number of intervals (including the representative) carrying an
    /// identical classified bit sequence.
    pub votes: u32,
}

impl BoundaryTable {
    /// The classified bucket index at a bit position, if in range.
    fn index_at(pairs: &[PulseSpacePair], position: u32) -> Option<u8> {
        let pair = pairs.get(position as usize / 2)?;
        Some(if position % 2 == 0 { pair.pulse } else { pair.space })
    }

    /// Do two recorded intervals carry an identical classified bit sequence?
    fn intervals_match(&self, pairs: &[PulseSpacePair], a: usize, b: usize) -> bool {
        let (ia, ib) = (self.intervals[a], self.intervals[b]);
        if ia.end - ia.start != ib.end - ib.start {
            return false;
        }
        (0..ia.end - ia.start).all(|off| {
            Self::index_at(pairs, ia.start + off) == Self::index_at(pairs, ib.start + off)
        })
    }

    /// Majority vote across the recorded intervals: which package content
    /// occurs most often?
    ///
    /// Intervals vote for each other when they span the same bit length and
    /// every position carries the same classified index. Returns the
    /// earliest interval of the winning content and its vote count, or
    /// `None` when the table is empty. A result with `votes >= 2` means the
    /// same package was received at least twice — the usual acceptance bar
    /// for checksum-less OOK sensors.
    pub fn majority_vote(&self, pairs: &[PulseSpacePair]) -> Option<PackageVote> {
        let n = self.intervals.len();
        let mut best: Option<PackageVote> = None;

        for a in 0..n {
            let votes = (0..n)
                .filter(|&b| a == b || self.intervals_match(pairs, a, b))
                .count() as u32;
            if best.map_or(true, |w| votes > w.votes) {
                best = Some(PackageVote { interval: a, votes });
            }
        }

        best
    }
}

/// Full analyzer output for one finalized capture.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    /// Role assignment for the pulse channel.
    pub pulse: RoleClassification,
    /// Role assignment for the space channel.
    pub space: RoleClassification,
    /// Candidate package boundaries.
    pub boundaries: BoundaryTable,
}

/// Classify channel roles and scan for package boundaries.
///
/// Expects the bucket set already sorted (and merged, for RF) so that bucket
/// ids ascend with timing value.
pub fn analyze(set: &BucketSet, pairs: &[PulseSpacePair], medium: Medium) -> FrameAnalysis {
    let pulse = RoleClassification::classify(set, Channel::Pulse, medium);
    let space = RoleClassification::classify(set, Channel::Space, medium);
    let boundaries = scan_boundaries(pairs, &pulse, &space, medium);
    FrameAnalysis {
        pulse,
        space,
        boundaries,
    }
}

/// Walk the pair sequence and record repeated-package boundaries.
///
/// Maintains the run length in bit positions since the last gap. Every
/// gap-classified index ends the current run: a run longer than the tracked
/// reference becomes the new reference (a jump beyond the tolerance discards
/// earlier matches as fragments), and any run within
/// [`BOUNDARY_TOLERANCE_BITS`] of the reference is recorded as a package.
pub fn scan_boundaries(
    pairs: &[PulseSpacePair],
    pulse: &RoleClassification,
    space: &RoleClassification,
    medium: Medium,
) -> BoundaryTable {
    let mut table = BoundaryTable::default();
    let mut reference_bits = medium.min_package_bits();
    let mut pairs_since_gap: u32 = 0;

    for (i, pair) in pairs.iter().enumerate() {
        for (roles, id, offset) in [
            (pulse, pair.pulse, Channel::Pulse.offset()),
            (space, pair.space, Channel::Space.offset()),
        ] {
            if !roles.is_gap(id) {
                continue;
            }

            let run_bits = pairs_since_gap * 2 + offset;
            if run_bits > reference_bits {
                if run_bits > reference_bits + BOUNDARY_TOLERANCE_BITS {
                    // Earlier, much shorter runs were fragments.
                    table.match_count = 0;
                    table.intervals.clear();
                }
                reference_bits = run_bits;
            }
            if run_bits + BOUNDARY_TOLERANCE_BITS >= reference_bits {
                let gap_position = i as u32 * 2 + offset;
                let _ = table.intervals.push(BoundaryInterval {
                    start: gap_position - run_bits,
                    end: gap_position,
                });
                table.match_count += 1;
            }
            pairs_since_gap = 0;
        }
        pairs_since_gap += 1;
    }

    table.package_bits = reference_bits & !1;
    table
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::OVERFLOW_INDEX;

    /// Bucket set with the given per-channel hit counts, ranges ascending.
    fn set_with_hits(hits: &[(u32, u32)]) -> BucketSet {
        let mut set = BucketSet::new();
        for (i, &(pulse_hits, space_hits)) in hits.iter().enumerate() {
            let base = 200 + i as u32 * 700;
            set.buckets[i] = crate::bucket::Bucket {
                min_us: base,
                max_us: base + 100,
                sum_us: base * (pulse_hits + space_hits).max(1),
                sample_count: (pulse_hits + space_hits).max(1),
                pulse_hits,
                space_hits,
            };
            set.len += 1;
        }
        set
    }

    fn data_pair() -> PulseSpacePair {
        PulseSpacePair { pulse: 1, space: 1 }
    }

    fn gap_pair() -> PulseSpacePair {
        PulseSpacePair { pulse: 1, space: 3 }
    }

    #[test]
    fn test_roles_two_timing_classes() {
        // Pulse channel: bucket 1 most frequent, bucket 0 runner-up,
        // bucket 2 a sparse gap.
        let set = set_with_hits(&[(20, 18), (25, 27), (3, 3)]);
        let roles = RoleClassification::classify(&set, Channel::Pulse, Medium::Rf);
        assert_eq!(roles.data_short, 0);
        assert_eq!(roles.data_long, 1);
        assert_eq!(roles.short_hits, 20);
        assert_eq!(roles.long_hits, 25);
        assert_eq!(roles.gap_hit_max, 3);
        assert_eq!(roles.data_bucket_count, 2);
        assert!(roles.is_gap(2));
        assert!(roles.is_gap(OVERFLOW_INDEX));
        assert!(!roles.is_gap(1));
    }

    #[test]
    fn test_roles_longer_timing_takes_long_role() {
        // Bucket 2 out-hits bucket 1: it becomes the long timing and the old
        // long shifts to short.
        let set = set_with_hits(&[(8, 0), (20, 0), (30, 0)]);
        let roles = RoleClassification::classify(&set, Channel::Pulse, Medium::Rf);
        assert_eq!(roles.data_long, 2);
        assert_eq!(roles.data_short, 1);
        assert_eq!(roles.long_hits, 30);
        assert_eq!(roles.short_hits, 20);
    }

    #[test]
    fn test_roles_collapse_to_single_timing_class() {
        // Gap candidates are as busy as the long timing: data must be the
        // one dominant bucket, everything else is sync/gap.
        let set = set_with_hits(&[(40, 0), (4, 0), (3, 0), (4, 0)]);
        let roles = RoleClassification::classify(&set, Channel::Pulse, Medium::Rf);
        assert_eq!(roles.data_bucket_count, 1);
        assert_eq!(roles.data_short, roles.data_long);
        assert_eq!(roles.long_hits, 44);
        assert_eq!(roles.short_hits, 0);
        assert_eq!(roles.gap_hit_max, 4);
    }

    #[test]
    fn test_roles_per_medium_data_threshold() {
        // 5 hits clears the IR threshold (4) but not the RF one (16).
        let set = set_with_hits(&[(20, 0), (5, 0)]);
        let rf = RoleClassification::classify(&set, Channel::Pulse, Medium::Rf);
        let ir = RoleClassification::classify(&set, Channel::Pulse, Medium::Ir);
        assert_eq!(rf.data_bucket_count, 1);
        assert_eq!(ir.data_bucket_count, 2);
    }

    /// Three repeated 20-pair packages, each ending in a long space.
    fn repeated_packages() -> std::vec::Vec<PulseSpacePair> {
        let mut pairs = std::vec::Vec::new();
        for _ in 0..3 {
            pairs.extend(core::iter::repeat(data_pair()).take(20));
            pairs.push(gap_pair());
        }
        pairs
    }

    fn data_roles() -> RoleClassification {
        RoleClassification {
            data_short: 0,
            data_long: 1,
            short_hits: 60,
            long_hits: 66,
            data_bucket_count: 2,
            gap_hit_max: 3,
        }
    }

    #[test]
    fn test_scan_finds_repeated_packages() {
        let pairs = repeated_packages();
        let roles = data_roles();
        let table = scan_boundaries(&pairs, &roles, &roles, Medium::Rf);

        assert_eq!(table.match_count, 3);
        assert_eq!(table.intervals.len(), 3);
        // First run: 20 data pairs plus the gap pair's pulse = 41 bits.
        assert_eq!(table.intervals[0], BoundaryInterval { start: 0, end: 41 });
        // The gap pair itself counts toward the following run, so later
        // intervals start just before their predecessor's gap edge.
        assert_eq!(table.intervals[1], BoundaryInterval { start: 40, end: 83 });
        assert_eq!(table.intervals[2], BoundaryInterval { start: 82, end: 125 });
        assert_eq!(table.package_bits, 42);
    }

    #[test]
    fn test_scan_discards_fragments_before_longer_run() {
        // A short garbled fragment, then much longer real packages: the
        // fragment's match is discarded when the reference length jumps.
        let mut pairs = std::vec::Vec::new();
        pairs.extend(core::iter::repeat(data_pair()).take(9));
        pairs.push(gap_pair());
        for _ in 0..2 {
            pairs.extend(core::iter::repeat(data_pair()).take(30));
            pairs.push(gap_pair());
        }
        let roles = data_roles();
        let table = scan_boundaries(&pairs, &roles, &roles, Medium::Rf);

        // The 9-pair fragment matched first (19 bits > RF seed 16) but was
        // discarded when the 30-pair run took over.
        assert_eq!(table.match_count, 2);
        assert_eq!(table.intervals.len(), 2);
        assert!(table.package_bits >= 60);
    }

    #[test]
    fn test_scan_table_is_bounded() {
        let mut pairs = std::vec::Vec::new();
        for _ in 0..12 {
            pairs.extend(core::iter::repeat(data_pair()).take(20));
            pairs.push(gap_pair());
        }
        let roles = data_roles();
        let table = scan_boundaries(&pairs, &roles, &roles, Medium::Rf);

        assert_eq!(table.intervals.len(), MAX_BOUNDARIES);
        // Every match still counts, even without a free slot.
        assert_eq!(table.match_count, 12);
    }

    #[test]
    fn test_majority_vote_picks_repeated_content() {
        let pairs = repeated_packages();
        let roles = data_roles();
        let table = scan_boundaries(&pairs, &roles, &roles, Medium::Rf);
        assert_eq!(table.intervals.len(), 3);

        // Packages 2 and 3 span identical 43-bit runs with identical
        // content; package 1 is 41 bits and cannot vote with them.
        let vote = table.majority_vote(&pairs).unwrap();
        assert_eq!(vote.votes, 2);
        assert_eq!(vote.interval, 1);
    }

    #[test]
    fn test_majority_vote_corruption_breaks_agreement() {
        let mut pairs = repeated_packages();
        // Corrupt one data bit inside the third package.
        pairs[50] = PulseSpacePair { pulse: 0, space: 1 };
        let roles = data_roles();
        let table = scan_boundaries(&pairs, &roles, &roles, Medium::Rf);

        let vote = table.majority_vote(&pairs).unwrap();
        assert_eq!(vote.votes, 1);
    }

    #[test]
    fn test_majority_vote_empty_table() {
        let table = BoundaryTable::default();
        assert_eq!(table.majority_vote(&[]), None);
    }

    #[test]
    fn test_analyze_combines_roles_and_scan() {
        let set = set_with_hits(&[(20, 18), (25, 27), (3, 3)]);
        let pairs = repeated_packages();
        let analysis = analyze(&set, &pairs, Medium::Rf);
        assert_eq!(analysis.pulse.data_long, 1);
        assert_eq!(analysis.space.data_long, 1);
        assert_eq!(analysis.boundaries.match_count, 3);
    }
}
