//! Online timing-bucket classification of raw pulse/space durations.
//!
//! A [`BucketSet`] clusters the durations of one capture into at most
//! [`MAX_BUCKETS`] contiguous ranges, each treated as one logical timing
//! value. Classification is online and single-pass: a duration either falls
//! inside an existing bucket, stretches the closest bucket within a
//! magnitude-tiered tolerance, opens a new bucket, or is rejected with the
//! [`OVERFLOW_INDEX`] sentinel.
//!
//! # Invariants
//!
//! - Every bucket satisfies `min_us <= max_us` and covers every duration that
//!   was classified into it.
//! - The active bucket count never shrinks during a capture; only the sort and
//!   merge passes in [`crate::merge`] reorder or collapse buckets.
//! - The running sum uses a guarded add: a sample that would overflow the
//!   accumulator is left out of the average instead of wrapping.
//! - No failure is an error: invalid input maps to [`OVERFLOW_INDEX`] with no
//!   state change.

/// Maximum number of distinct timing buckets per capture.
///
/// Index 15 is reserved as the overflow sentinel, so bucket ids fit a nibble.
pub const MAX_BUCKETS: usize = 15;

/// Sentinel bucket id meaning "unclassifiable".
///
/// Returned for zero-length durations and once all [`MAX_BUCKETS`] buckets
/// are taken. An overflowed sample is lost for good — a bucket freed later by
/// a merge does not retroactively reclassify it.
pub const OVERFLOW_INDEX: u8 = 0x0F;

/// Which half of a bit-time a duration belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Channel {
    /// Carrier present.
    Pulse,
    /// Carrier absent.
    Space,
}

impl Channel {
    /// Bit-position offset of this channel within a pulse/space pair:
    /// pulses sit at even positions, spaces at odd.
    pub const fn offset(self) -> u32 {
        match self {
            Channel::Pulse => 0,
            Channel::Space => 1,
        }
    }
}

/// One timing cluster: a contiguous duration range with aggregate statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bucket {
    /// Smallest duration observed in this bucket (µs).
    pub min_us: u32,
    /// Largest duration observed in this bucket (µs).
    pub max_us: u32,
    /// Running sum of sampled durations (µs). Guarded against wrap-around.
    pub sum_us: u32,
    /// Number of samples included in `sum_us`.
    pub sample_count: u32,
    /// Hits recorded on the pulse channel.
    pub pulse_hits: u32,
    /// Hits recorded on the space channel.
    pub space_hits: u32,
}

impl Bucket {
    /// A fresh single-sample bucket at `duration_us`, seeded for `channel`.
    fn seed(duration_us: u32, channel: Channel) -> Self {
        let mut b = Bucket {
            min_us: duration_us,
            max_us: duration_us,
            sum_us: duration_us,
            sample_count: 1,
            ..Bucket::default()
        };
        match channel {
            Channel::Pulse => b.pulse_hits = 1,
            Channel::Space => b.space_hits = 1,
        }
        b
    }

    /// Total hits across both channels.
    pub fn total_hits(&self) -> u32 {
        self.pulse_hits + self.space_hits
    }

    /// Hits recorded on one channel.
    pub fn hits(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Pulse => self.pulse_hits,
            Channel::Space => self.space_hits,
        }
    }

    /// Running mean of the sampled durations (µs), 0 for an empty bucket.
    pub fn mean_us(&self) -> u32 {
        if self.sample_count == 0 {
            0
        } else {
            self.sum_us / self.sample_count
        }
    }

    /// Add one sample to the running sum, unless the add would overflow.
    ///
    /// A sample rejected here still counts as a hit — only the average is
    /// affected. Precision loss is preferred over wrap-around.
    fn add_sample(&mut self, duration_us: u32) {
        if u32::MAX - duration_us > self.sum_us {
            self.sum_us += duration_us;
            self.sample_count += 1;
        }
    }

    /// Record a hit on `channel` and fold the sample into the running sum.
    fn record(&mut self, duration_us: u32, channel: Channel) {
        match channel {
            Channel::Pulse => self.pulse_hits += 1,
            Channel::Space => self.space_hits += 1,
        }
        self.add_sample(duration_us);
    }
}

/// The tolerance (µs) within which a duration may stretch an existing bucket,
/// tiered by magnitude: short data timings are tight, multi-millisecond sync
/// and gap timings are loose.
fn extension_tolerance_us(duration_us: u32) -> u32 {
    match duration_us {
        0..=999 => 150,
        1000..=1999 => 200,
        2000..=2999 => 300,
        3000..=3999 => 400,
        4000..=4999 => 600,
        _ => 2000,
    }
}

/// Ordered collection of up to [`MAX_BUCKETS`] timing buckets.
///
/// Buckets are in insertion order during a capture; after
/// [`sort_ascending`](BucketSet::sort_ascending) they are strictly ascending
/// by `min_us`.
#[derive(Clone, Debug)]
pub struct BucketSet {
    pub(crate) buckets: [Bucket; MAX_BUCKETS],
    pub(crate) len: usize,
}

impl BucketSet {
    /// An empty bucket set.
    pub fn new() -> Self {
        Self {
            buckets: [Bucket::default(); MAX_BUCKETS],
            len: 0,
        }
    }

    /// Number of active buckets.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if no bucket has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bucket with the given id, if active.
    pub fn get(&self, id: u8) -> Option<&Bucket> {
        self.buckets[..self.len].get(id as usize)
    }

    /// Iterate over the active buckets in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets[..self.len].iter()
    }

    /// Hit count of bucket `id` on `channel`, 0 for inactive ids.
    pub fn channel_hits(&self, id: u8, channel: Channel) -> u32 {
        self.get(id).map_or(0, |b| b.hits(channel))
    }

    /// Classify one duration into a bucket id, creating or stretching a
    /// bucket as needed.
    ///
    /// Match order: exact containment, then tolerant extension of the closest
    /// bucket, then a new bucket. Returns [`OVERFLOW_INDEX`] for a zero
    /// duration or when all [`MAX_BUCKETS`] buckets are taken; neither case
    /// mutates any state.
    pub fn classify(&mut self, duration_us: u32, channel: Channel) -> u8 {
        if duration_us == 0 {
            return OVERFLOW_INDEX;
        }

        if let Some(id) = self.containment_match(duration_us) {
            self.buckets[id as usize].record(duration_us, channel);
            return id;
        }

        if let Some(id) = self.closest_extension(duration_us) {
            let b = &mut self.buckets[id as usize];
            if duration_us < b.min_us {
                b.min_us = duration_us;
            } else if duration_us > b.max_us {
                b.max_us = duration_us;
            }
            b.record(duration_us, channel);
            return id;
        }

        if self.len < MAX_BUCKETS {
            let id = self.len as u8;
            self.buckets[self.len] = Bucket::seed(duration_us, channel);
            self.len += 1;
            return id;
        }

        OVERFLOW_INDEX
    }

    /// The first active bucket whose `[min, max]` contains `duration_us`.
    fn containment_match(&self, duration_us: u32) -> Option<u8> {
        self.buckets[..self.len]
            .iter()
            .position(|b| b.min_us <= duration_us && duration_us <= b.max_us)
            .map(|i| i as u8)
    }

    /// The active bucket that `duration_us` can stretch with the smallest
    /// extension distance, if any lies within the tiered tolerance.
    ///
    /// A duration above a bucket may become its new max when it stays within
    /// tolerance of the bucket's min; a duration below may become the new min
    /// when min..=max still fits within tolerance of the duration. The
    /// asymmetry keeps a bucket's total span bounded by one tolerance tier.
    fn closest_extension(&self, duration_us: u32) -> Option<u8> {
        let tolerance = extension_tolerance_us(duration_us);
        let mut best: Option<u8> = None;
        let mut best_off_by = duration_us;

        for (k, b) in self.buckets[..self.len].iter().enumerate() {
            let off_by = if duration_us > b.max_us && duration_us <= b.min_us + tolerance {
                duration_us - b.max_us
            } else if duration_us < b.min_us && duration_us + tolerance >= b.max_us {
                b.min_us - duration_us
            } else {
                continue;
            };
            if off_by < best_off_by {
                best = Some(k as u8);
                best_off_by = off_by;
            }
        }

        best
    }
}

impl Default for BucketSet {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
