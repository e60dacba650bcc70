//! # OOK capture replay
//!
//! Replays a synthetic 433 MHz remote-socket transmission (a PT2262-style
//! short/long code repeated four times with inter-package gaps, plus receiver
//! jitter) through the full pipeline and prints what the analyzer made of it:
//! the bucket table, per-channel roles, the boundary table and the winning
//! package.
//!
//! Run with: `cargo run --example replay --features std`

use psi_core::boundary::BoundaryTable;
use psi_core::capture::{
    CaptureReport, CaptureSink, PulseSpacePair, PulseTrainAccumulator, END_MARKER_US,
};
use psi_core::medium::Medium;

// ── Synthetic transmission ────────────────────────────────────────────────────

/// 12-symbol tri-state code word, PT2262 style: each symbol is two pulse/space
/// pairs of short (≈350 µs) and long (≈1050 µs) timings.
const CODE: [(bool, bool); 12] = [
    (false, false),
    (true, true),
    (false, true),
    (false, false),
    (true, true),
    (true, false),
    (false, true),
    (false, false),
    (false, false),
    (true, true),
    (false, true),
    (true, false),
];

/// Deterministic ±8% receiver wobble.
fn jitter(base_us: u32, k: usize) -> u32 {
    const PERCENT: [i32; 7] = [0, 4, -8, 8, -4, 6, -6];
    (base_us as i32 + PERCENT[k % 7] * base_us as i32 / 100) as u32
}

fn symbol_pairs(bit: bool, k: usize) -> [(u32, u32); 2] {
    let short = jitter(350, k);
    let long = jitter(1_050, k + 3);
    if bit {
        [(long, short), (long, short)]
    } else {
        [(short, long), (short, long)]
    }
}

// ── Reporting sink ────────────────────────────────────────────────────────────

#[derive(Default)]
struct ConsoleSink {
    pairs: Vec<PulseSpacePair>,
    boundaries: Option<BoundaryTable>,
}

impl CaptureSink for ConsoleSink {
    fn capture_started(&mut self) {
        println!("capture started");
    }

    fn capture_complete(&mut self, report: &CaptureReport<'_>) {
        println!(
            "capture complete: {} edges, {} pairs, {} µs",
            report.edge_count,
            report.pairs.len(),
            report.finished_at_us - report.started_at_us
        );

        println!("\nbucket table:");
        for (id, b) in report.buckets.iter().enumerate() {
            println!(
                "  [{id}] {:>5}-{:<5} µs  mean {:>5}  pulse {:>3}  space {:>3}",
                b.min_us,
                b.max_us,
                b.mean_us(),
                b.pulse_hits,
                b.space_hits
            );
        }

        for (name, roles) in [
            ("pulse", &report.analysis.pulse),
            ("space", &report.analysis.space),
        ] {
            println!(
                "{name} roles: short={} long={} ({}+{} hits, {} data buckets, gap max {})",
                roles.data_short,
                roles.data_long,
                roles.short_hits,
                roles.long_hits,
                roles.data_bucket_count,
                roles.gap_hit_max
            );
        }

        let table = &report.analysis.boundaries;
        println!(
            "boundaries: {} matches, package ~{} bits",
            table.match_count, table.package_bits
        );
        for iv in table.intervals.iter() {
            println!("  bits {:>3}..{:<3}", iv.start, iv.end);
        }

        self.pairs = report.pairs.to_vec();
        self.boundaries = Some(table.clone());
    }

    fn capture_discarded(&mut self, edge_count: u32) {
        println!("capture discarded as noise ({edge_count} edges)");
    }
}

// ── Replay ────────────────────────────────────────────────────────────────────

fn main() {
    let mut acc = PulseTrainAccumulator::new(Medium::Rf);
    let mut sink = ConsoleSink::default();
    let mut now: u64 = 1_000_000;
    let mut feed = |acc: &mut PulseTrainAccumulator, d: u32, carrier: bool| {
        now += u64::from(d);
        acc.ingest_edge(d, carrier, 52, now, &mut sink);
    };

    // Four repetitions, each terminated by a ~10.8 ms sync gap.
    for rep in 0..4 {
        for (s, &(a, b)) in CODE.iter().enumerate() {
            for (pulse_us, space_us) in symbol_pairs(a, rep * 31 + s) {
                feed(&mut acc, pulse_us, true);
                feed(&mut acc, space_us, false);
            }
            for (pulse_us, space_us) in symbol_pairs(b, rep * 37 + s) {
                feed(&mut acc, pulse_us, true);
                feed(&mut acc, space_us, false);
            }
        }
        feed(&mut acc, jitter(350, rep), true);
        feed(&mut acc, 10_800, false);
    }
    acc.ingest_edge(END_MARKER_US, false, 0, now + 40_000, &mut sink);

    if let Some(table) = &sink.boundaries {
        match table.majority_vote(&sink.pairs) {
            Some(vote) => println!(
                "\nmajority vote: interval {} with {} agreeing copies",
                vote.interval, vote.votes
            ),
            None => println!("\nno package boundaries found"),
        }
    }
}
