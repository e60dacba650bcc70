//! Transmission medium constants — RF vs IR.
//!
//! The classifier core is identical for both media; what differs is how much
//! signal counts as a real capture and how long the receiver may stay silent
//! before a capture is considered finished. Cheap 433 MHz superheterodyne
//! receivers emit a steady stream of AGC noise edges, so RF demands far more
//! edges before a capture is believed; IR demodulators are quiet between
//! frames, so a short burst is already meaningful.

/// Longest edge the accumulator accepts, and the RF no-change timeout, in
/// microseconds.
///
/// Anything at or above this is treated as inter-capture idle rather than a
/// pulse or space. 25 ms comfortably covers the longest documented
/// inter-package gaps of common OOK protocols (Oregon Scientific V2.1 inserts
/// ~10.9 ms between repetitions).
pub const EDGE_TIMEOUT_US: u32 = 25_000;

/// IR no-change timeout in microseconds, used until enough edges are pending.
const IR_SIGNAL_TIMEOUT_US: u32 = 10_000;

/// The physical medium a capture was received on.
///
/// Selects the constant set used by the accumulator and the boundary
/// analyzer. The timing-bucket classifier itself is medium-agnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Medium {
    /// Sub-GHz on-off-keyed radio (e.g. 433.92 MHz superheterodyne receiver).
    Rf,
    /// Demodulated infrared (e.g. 38 kHz receiver module).
    Ir,
}

impl Medium {
    /// Minimum number of edges a capture must exceed to be kept.
    ///
    /// Captures with `edges <= min_edges()` are discarded as noise without
    /// invoking the analyzer.
    pub const fn min_edges(self) -> u32 {
        match self {
            Medium::Rf => 48,
            Medium::Ir => 16,
        }
    }

    /// Minimum hit count for a bucket to count as a data timing class
    /// (doubles as the noise ceiling for gap candidates).
    pub const fn min_data_hits(self) -> u32 {
        match self {
            Medium::Rf => 16,
            Medium::Ir => 4,
        }
    }

    /// Minimum package bit length seeding the boundary scan.
    pub const fn min_package_bits(self) -> u32 {
        match self {
            Medium::Rf => 16,
            Medium::Ir => 4,
        }
    }

    /// No-change timeout before at least 16 edges are pending.
    pub const fn signal_timeout_us(self) -> u32 {
        match self {
            Medium::Rf => EDGE_TIMEOUT_US,
            Medium::Ir => IR_SIGNAL_TIMEOUT_US,
        }
    }

    /// Whether near-duplicate adjacent buckets are merged at finalize.
    ///
    /// Only RF receivers produce the AGC-settling jitter the merge pass
    /// exists to collapse; IR timings are clean enough to keep as-is.
    pub const fn merges_adjacent(self) -> bool {
        matches!(self, Medium::Rf)
    }
}
