//! Bucket sort and adjacent-range merge post-processing.
//!
//! During accumulation buckets sit in insertion order and AGC settling often
//! splits one physical timing into two near-duplicate clusters. At capture
//! end the set is sorted ascending by range start, then (RF only) adjacent
//! buckets closer than [`MERGE_MIN_DIFF_US`] are collapsed into one canonical
//! timing class. Both passes return a [`Remap`] so every previously recorded
//! pair index can be rewritten to stay consistent with the new bucket ids.
//!
//! # Invariants
//!
//! - A merge preserves aggregate statistics exactly: total hit counts over
//!   the set are unchanged, and the combined running sum falls back to
//!   averaging the two means only when the addition would overflow.
//! - Sorting an already-ascending set yields the identity remap.
//! - Ids at or beyond the remap domain (notably [`OVERFLOW_INDEX`]) pass
//!   through every remap unchanged.
//!
//! [`OVERFLOW_INDEX`]: crate::bucket::OVERFLOW_INDEX

use crate::bucket::{Bucket, BucketSet};

/// Adjacent buckets whose ranges come closer than this (µs) are merged.
pub const MERGE_MIN_DIFF_US: u32 = 50;

/// An old-id → new-id rewrite table produced by a sort or merge pass.
///
/// Covers ids below the domain the pass operated on; everything else —
/// including the overflow sentinel — maps to itself.
#[derive(Clone, Copy, Debug)]
pub struct Remap {
    map: [u8; 16],
    domain: usize,
}

impl Remap {
    fn identity(domain: usize) -> Self {
        let mut map = [0u8; 16];
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self { map, domain }
    }

    /// Rewrite one bucket id.
    pub fn apply(&self, id: u8) -> u8 {
        if (id as usize) < self.domain {
            self.map[id as usize]
        } else {
            id
        }
    }

    /// `true` if this remap leaves every id unchanged.
    pub fn is_identity(&self) -> bool {
        self.map[..self.domain]
            .iter()
            .enumerate()
            .all(|(i, &m)| m == i as u8)
    }
}

impl BucketSet {
    /// Reorder the active buckets ascending by `min_us`.
    ///
    /// Stable under duplicate or overlapping ranges. Each bucket moves as a
    /// unit — bounds, sums, counts and hit counters travel together. Returns
    /// the old-id → new-id remap; the identity when the set was already
    /// ascending.
    pub fn sort_ascending(&mut self) -> Remap {
        let n = self.len;
        let mut remap = Remap::identity(n);

        // Selection by (min_us, old id): smallest remaining range start
        // first, original order breaking ties.
        let mut order: [u8; 16] = [0; 16];
        for (i, slot) in order.iter_mut().enumerate().take(n) {
            *slot = i as u8;
        }
        order[..n].sort_unstable_by_key(|&i| (self.buckets[i as usize].min_us, i));

        let mut sorted = [Bucket::default(); crate::bucket::MAX_BUCKETS];
        for (new_id, &old_id) in order[..n].iter().enumerate() {
            sorted[new_id] = self.buckets[old_id as usize];
            remap.map[old_id as usize] = new_id as u8;
        }
        self.buckets[..n].copy_from_slice(&sorted[..n]);

        remap
    }

    /// Collapse adjacent near-duplicate buckets (expects an ascending set).
    ///
    /// Scanning upward, bucket `i` folds into its predecessor when
    /// `buckets[i].min_us < predecessor.max_us + MERGE_MIN_DIFF_US`. The
    /// predecessor absorbs the range, the hit counters, and the running sum —
    /// or the average of the two running means when the sums cannot be added
    /// without overflow. The returned remap is many-to-one over the
    /// pre-merge ids; the active count shrinks by the number of merges.
    pub fn merge_adjacent(&mut self) -> Remap {
        let n = self.len;
        let mut remap = Remap::identity(n);
        let mut merge_count = 0usize;

        for i in 1..n {
            let j = i - merge_count;
            remap.map[i] = j as u8;

            if self.buckets[i].min_us < self.buckets[j - 1].max_us.saturating_add(MERGE_MIN_DIFF_US)
            {
                let absorbed = self.buckets[i];
                let target = &mut self.buckets[j - 1];

                target.max_us = absorbed.max_us;
                if u32::MAX - absorbed.sum_us > target.sum_us {
                    target.sum_us += absorbed.sum_us;
                    target.sample_count += absorbed.sample_count;
                } else {
                    // Trade precision for continued operation.
                    target.sum_us = target.mean_us() + absorbed.mean_us();
                    target.sample_count = 1;
                }
                target.pulse_hits += absorbed.pulse_hits;
                target.space_hits += absorbed.space_hits;

                remap.map[i] = (j - 1) as u8;
                merge_count += 1;
            } else if j < i {
                self.buckets[j] = self.buckets[i];
            }
        }

        self.len = n - merge_count;
        remap
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Channel, OVERFLOW_INDEX};

    /// Hand-build a set from (min, max, pulse_hits, space_hits) tuples.
    /// The classifier's tolerant extension would fold close timings together
    /// on its own, so merge tests construct ranges directly.
    fn set_of(ranges: &[(u32, u32, u32, u32)]) -> BucketSet {
        let mut set = BucketSet::new();
        for &(min_us, max_us, pulse_hits, space_hits) in ranges {
            set.buckets[set.len] = Bucket {
                min_us,
                max_us,
                sum_us: (min_us + max_us) / 2 * (pulse_hits + space_hits),
                sample_count: pulse_hits + space_hits,
                pulse_hits,
                space_hits,
            };
            set.len += 1;
        }
        set
    }

    fn total_hits(set: &BucketSet) -> u32 {
        set.iter().map(Bucket::total_hits).sum()
    }

    #[test]
    fn test_sort_orders_by_min() {
        let mut set = set_of(&[(900, 1100, 5, 5), (250, 400, 8, 8), (2500, 2600, 2, 2)]);
        let remap = set.sort_ascending();
        let mins: heapless::Vec<u32, 3> = set.iter().map(|b| b.min_us).collect();
        assert_eq!(&mins[..], &[250, 900, 2500]);
        assert_eq!(remap.apply(0), 1);
        assert_eq!(remap.apply(1), 0);
        assert_eq!(remap.apply(2), 2);
        // Stats travelled with their bucket.
        assert_eq!(set.get(0).unwrap().pulse_hits, 8);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut set = set_of(&[(250, 400, 8, 8), (900, 1100, 5, 5)]);
        set.sort_ascending();
        let remap = set.sort_ascending();
        assert!(remap.is_identity());
    }

    #[test]
    fn test_overflow_passes_through_remap() {
        let mut set = set_of(&[(900, 1100, 5, 5), (250, 400, 8, 8)]);
        let remap = set.sort_ascending();
        assert_eq!(remap.apply(OVERFLOW_INDEX), OVERFLOW_INDEX);
        assert_eq!(remap.apply(9), 9); // beyond the domain
    }

    #[test]
    fn test_merge_collapses_close_ranges() {
        let mut set = set_of(&[(340, 340, 3, 0), (370, 370, 0, 4)]);
        let remap = set.merge_adjacent();
        assert_eq!(set.len(), 1);
        let b = set.get(0).unwrap();
        assert_eq!((b.min_us, b.max_us), (340, 370));
        assert_eq!(b.pulse_hits, 3);
        assert_eq!(b.space_hits, 4);
        assert_eq!(remap.apply(1), 0);
    }

    #[test]
    fn test_merge_keeps_distant_ranges() {
        // min == max + 50 is exactly at the boundary and must not merge.
        let mut set = set_of(&[(340, 340, 3, 0), (390, 450, 0, 4)]);
        let before = total_hits(&set);
        let remap = set.merge_adjacent();
        assert_eq!(set.len(), 2);
        assert!(remap.is_identity());
        assert_eq!(total_hits(&set), before);

        let mut set = set_of(&[(340, 340, 3, 0), (450, 500, 0, 4)]);
        set.merge_adjacent();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_merge_preserves_total_hits() {
        let mut set = set_of(&[
            (300, 320, 10, 2),
            (330, 360, 4, 9),
            (980, 1020, 7, 7),
            (1040, 1060, 3, 1),
        ]);
        let before = total_hits(&set);
        set.merge_adjacent();
        assert_eq!(set.len(), 2);
        assert_eq!(total_hits(&set), before);
    }

    #[test]
    fn test_merge_chain_is_many_to_one() {
        let mut set = set_of(&[(100, 100, 1, 1), (130, 130, 1, 1), (160, 160, 1, 1)]);
        let remap = set.merge_adjacent();
        assert_eq!(set.len(), 1);
        assert_eq!((set.get(0).unwrap().min_us, set.get(0).unwrap().max_us), (100, 160));
        assert_eq!(remap.apply(0), 0);
        assert_eq!(remap.apply(1), 0);
        assert_eq!(remap.apply(2), 0);
    }

    #[test]
    fn test_merge_sum_overflow_falls_back_to_mean_average() {
        let mut set = set_of(&[(300, 320, 2, 0), (330, 350, 2, 0)]);
        set.buckets[0].sum_us = u32::MAX - 100;
        set.buckets[0].sample_count = 4;
        set.buckets[1].sum_us = 680;
        set.buckets[1].sample_count = 2;
        let expected = (u32::MAX - 100) / 4 + 680 / 2;
        set.merge_adjacent();
        let b = set.get(0).unwrap();
        assert_eq!(b.sum_us, expected);
        assert_eq!(b.sample_count, 1);
        // Hit counters still combine exactly.
        assert_eq!(b.pulse_hits, 4);
    }

    #[test]
    fn test_sort_then_merge_pipeline() {
        // Out-of-order near-duplicates: sort first, then merge collapses them.
        let mut set = BucketSet::new();
        for &(d, ch) in &[
            (1000, Channel::Pulse),
            (320, Channel::Space),
            (2600, Channel::Pulse),
            (330, Channel::Space),
        ] {
            set.classify(d, ch);
        }
        let sort_remap = set.sort_ascending();
        assert_eq!(sort_remap.apply(1), 0); // 320/330 now first
        let merge_remap = set.merge_adjacent();
        assert!(merge_remap.is_identity()); // nothing within 50 µs here
        assert_eq!(set.len(), 3);
    }
}
