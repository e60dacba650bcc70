//! # psi-core
//!
//! Protocol-agnostic timing classification for on-off-keyed (OOK) signals —
//! 433 MHz remote sensors, doorbells, power sockets and demodulated infrared
//! remotes — without knowing any protocol in advance.
//!
//! ---
//!
//! ## One classifier instead of one decoder per protocol
//!
//! Every OOK protocol boils down to a handful of discrete timing values:
//! a short pulse, a long pulse, a sync, an inter-package gap. Instead of
//! matching known protocols edge by edge, this crate clusters the raw edge
//! durations of a transmission into at most fifteen adaptive min/max
//! **timing buckets** and re-expresses the whole transmission as a compact
//! sequence of bucket indices. Protocol structure — preamble, repeated
//! packages, gaps — then falls out of the index statistics:
//!
//! - **Adaptive bucketing** — a duration either falls inside an existing
//!   bucket, stretches the nearest one within a duration-scaled tolerance,
//!   or founds a new bucket. Cheap receivers wobble by ±10% and more while
//!   their AGC settles; the tolerance tiers absorb that without conflating
//!   genuinely distinct timings.
//!
//! - **Sort + merge canonicalization** — at capture end buckets are sorted
//!   ascending and (for RF) near-duplicate neighbours merged, with every
//!   recorded index remapped, so that equal transmissions yield equal index
//!   sequences across captures.
//!
//! - **Statistical role assignment** — per channel, the most frequent bucket
//!   is the long data timing, the runner-up the short one, and everything
//!   longer is a gap. No protocol table anywhere.
//!
//! - **Boundary scanning** — gap-classified indices split the sequence into
//!   candidate packages; repeated runs of matching bit length are collected
//!   into a bounded boundary table, and a majority vote across them finds
//!   the package content that was received most often.
//!
//! ## The pipeline
//!
//! ```text
//! edges → PulseTrainAccumulator → BucketSet → sort/merge → FrameAnalysis
//!               ↑                     ↑            ↓            ↓
//!            Medium             classify()       Remap     CaptureSink
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`medium`] | [`Medium`] | RF vs IR constant sets (edge minima, timeouts, merge policy) |
//! | [`bucket`] | [`BucketSet`], [`Bucket`], [`Channel`] | Adaptive min/max timing buckets with tolerant classification |
//! | [`merge`] | [`Remap`] | Ascending sort and adjacent-range merge with index remapping |
//! | [`capture`] | [`PulseTrainAccumulator`], [`CaptureSink`] | Edge-fed capture state machine with bounded pair sequence |
//! | [`boundary`] | [`RoleClassification`], [`BoundaryTable`] | Short/long/gap roles and repeated-package boundary scan |
//! | [`snapshot`] | [`snapshot::CaptureSnapshot`] | Serializable capture snapshot (requires `serde` feature) |
//!
//! ## Fixed capacity, no allocation
//!
//! All state is bounded at compile time: 15 timing buckets plus an overflow
//! sentinel, 256 pulse/space pairs, 8 boundary intervals. Exhaustion is
//! expressed in-band — overflow classifications land on the sentinel index
//! and extra boundary matches keep counting without a table slot — never as
//! a panic or an allocation.
//!
//! ## `no_std`
//!
//! This crate is `#![no_std]` by default with no heap required. Enable the
//! `serde` feature for serialization support (required for
//! [`snapshot::CaptureSnapshot`]); enable `std` for the replay example.
//!
//! [`Medium`]: medium::Medium
//! [`BucketSet`]: bucket::BucketSet
//! [`Bucket`]: bucket::Bucket
//! [`Channel`]: bucket::Channel
//! [`Remap`]: merge::Remap
//! [`PulseTrainAccumulator`]: capture::PulseTrainAccumulator
//! [`CaptureSink`]: capture::CaptureSink
//! [`RoleClassification`]: boundary::RoleClassification
//! [`BoundaryTable`]: boundary::BoundaryTable

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod boundary;
pub mod bucket;
pub mod capture;
pub mod medium;
pub mod merge;
#[cfg(feature = "serde")]
pub mod snapshot;
