//! Simulated rearrangements and short indels over a reference interval.
//!
//! The interval is cut at `num_rearrangements` random points, short indels are placed strictly
//! inside the resulting segments, and then the segments are shuffled and randomly inverted.
//! Every junction between two consecutive segments of the new layout is one [`BreakpointRecord`],
//! and none of them joins two segments the way the reference already does.
//! The mutated sequence itself is produced by [`replay`] from the ledger, so the ledger always
//! reproduces it.
use crate::error::{Result, SimError};
use crate::reference::ReferenceAccessor;
use crate::seq;
use definitions::*;
use log::*;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use std::collections::BTreeSet;

/// Shortest segment produced by a cut.
pub const MIN_SEGMENT_LEN: usize = 50;
pub const MAX_INDEL_LEN: usize = 20;
/// Minimum distance between an indel and a segment end, or between two indels.
pub const INDEL_MARGIN: usize = 10;
/// Placement attempts per requested edit before giving up on it.
pub const MAX_ATTEMPTS: usize = 100;
const MAX_LAYOUT_SHUFFLES: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct MutationConfig {
    num_rearrangements: usize,
    num_indels: usize,
    seed: u64,
}

impl MutationConfig {
    pub fn new(num_rearrangements: usize, num_indels: usize, seed: u64) -> Self {
        Self {
            num_rearrangements,
            num_indels,
            seed,
        }
    }
}

/// Fetch `interval` and mutate it.
pub fn simulate_genome<A: ReferenceAccessor + ?Sized>(
    accessor: &A,
    interval: &ReferenceInterval,
    config: &MutationConfig,
) -> Result<MutatedGenome> {
    let reference = accessor.fetch(interval)?;
    if reference.is_empty() {
        return Err(SimError::EmptyReference {
            interval: interval.to_string(),
        });
    }
    // Accessors clip the interval at the chromosome end.
    let end = interval.start + reference.len() as u64;
    let interval = ReferenceInterval::new(&interval.chrom, interval.start, end);
    Ok(mutate_genome(&interval, &reference, config))
}

pub fn mutate_genome(
    interval: &ReferenceInterval,
    reference: &[u8],
    config: &MutationConfig,
) -> MutatedGenome {
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let cuts = place_cuts(&mut rng, reference.len(), config.num_rearrangements);
    let segments: Vec<_> = std::iter::once(0)
        .chain(cuts.iter().copied())
        .chain(std::iter::once(reference.len()))
        .collect::<Vec<_>>()
        .windows(2)
        .map(|w| (w[0], w[1]))
        .collect();
    let mut indels = place_indels(&mut rng, &segments, config.num_indels);
    indels.sort_by_key(|indel| indel.position);
    let layout = shuffle_layout(&mut rng, &segments);
    let mut breakpoints = Vec::with_capacity(layout.len().saturating_sub(1));
    let mut post = 0;
    for pair in layout.windows(2) {
        post += segment_seq(reference, &pair[0], &indels).len();
        breakpoints.push(BreakpointRecord::new(pair[0], pair[1], post));
    }
    let mut genome = MutatedGenome {
        interval: interval.clone(),
        seq: String::new(),
        breakpoints,
        indels,
    };
    genome.seq = seq_to_string(replay(reference, &genome));
    debug!(
        "SIMGENOME\tLength\t{}\t{}",
        reference.len(),
        genome.seq.len()
    );
    genome
}

/// Rebuild the mutated sequence from the original reference and the ledger of `genome`.
pub fn replay(reference: &[u8], genome: &MutatedGenome) -> Vec<u8> {
    let layout = match genome.breakpoints.is_empty() {
        true => vec![SegmentSpan::new(0, reference.len(), Strand::Forward)],
        false => genome.layout(),
    };
    layout
        .iter()
        .flat_map(|span| segment_seq(reference, span, &genome.indels))
        .collect()
}

// The bases of one segment after its indels, oriented as in the layout.
// `indels` should be sorted by position.
fn segment_seq(reference: &[u8], span: &SegmentSpan, indels: &[IndelRecord]) -> Vec<u8> {
    let mut piece = Vec::with_capacity(span.len() + MAX_INDEL_LEN);
    let mut cursor = span.start;
    let inside = indels
        .iter()
        .filter(|indel| span.start <= indel.position && indel.position < span.end);
    for indel in inside {
        piece.extend_from_slice(&reference[cursor..indel.position]);
        match indel.indel_type {
            IndelType::Insertion => {
                piece.extend_from_slice(indel.content.as_bytes());
                cursor = indel.position;
            }
            IndelType::Deletion => cursor = (indel.position + indel.length).min(span.end),
        }
    }
    piece.extend_from_slice(&reference[cursor..span.end]);
    match span.strand {
        Strand::Forward => piece,
        Strand::Reverse => seq::revcmp(&piece),
    }
}

fn place_cuts<R: Rng>(rng: &mut R, len: usize, target: usize) -> BTreeSet<usize> {
    let mut cuts = BTreeSet::new();
    if target == 0 {
        return cuts;
    }
    if len < 2 * MIN_SEGMENT_LEN {
        warn!("SIMGENOME\tTooShort\t{len}\tNo rearrangement can be placed");
        return cuts;
    }
    let mut attempts = 0;
    while cuts.len() < target && attempts < target * MAX_ATTEMPTS {
        attempts += 1;
        let pos = rng.gen_range(MIN_SEGMENT_LEN..=len - MIN_SEGMENT_LEN);
        let lower = pos.saturating_sub(MIN_SEGMENT_LEN - 1);
        if cuts.range(lower..pos + MIN_SEGMENT_LEN).next().is_none() {
            debug!("SIMGENOME\tCut\t{pos}");
            cuts.insert(pos);
        }
    }
    if cuts.len() < target {
        warn!("SIMGENOME\tCuts\t{}\t{}\tGave up placing", cuts.len(), target);
    }
    cuts
}

fn place_indels<R: Rng>(
    rng: &mut R,
    segments: &[(usize, usize)],
    target: usize,
) -> Vec<IndelRecord> {
    let mut indels: Vec<IndelRecord> = Vec::with_capacity(target);
    let mut skipped = 0;
    for _ in 0..target {
        let placed = (0..MAX_ATTEMPTS).find_map(|_| {
            let (start, end) = segments[rng.gen_range(0..segments.len())];
            let is_insertion = rng.gen_bool(0.5);
            let length = rng.gen_range(1..=MAX_INDEL_LEN);
            let span_len = if is_insertion { 1 } else { length };
            let (lower, upper) = (start + INDEL_MARGIN, end.checked_sub(INDEL_MARGIN + span_len)?);
            if upper < lower {
                return None;
            }
            let position = rng.gen_range(lower..=upper);
            let span = position..position + span_len;
            let collides = indels.iter().any(|indel| {
                let other = indel.reference_span();
                span.start < other.end + INDEL_MARGIN && other.start < span.end + INDEL_MARGIN
            });
            if collides {
                return None;
            }
            Some(match is_insertion {
                true => IndelRecord::insertion(position, seq_to_string(seq::random_seq(rng, length))),
                false => IndelRecord::deletion(position, length),
            })
        });
        match placed {
            Some(indel) => {
                debug!(
                    "SIMGENOME\tIndel\t{}\t{}\t{}",
                    indel.indel_type, indel.position, indel.length
                );
                indels.push(indel);
            }
            None => skipped += 1,
        }
    }
    if 0 < skipped {
        warn!("SIMGENOME\tIndels\t{}\t{}\tSkipped {skipped}", indels.len(), target);
    }
    indels
}

// Shuffle and orient the segments, retrying a few times to avoid reference-adjacent junctions.
// Whatever remains is broken by inverting the downstream segment.
fn shuffle_layout<R: Rng>(rng: &mut R, segments: &[(usize, usize)]) -> Vec<SegmentSpan> {
    let forward: Vec<_> = segments
        .iter()
        .map(|&(s, e)| SegmentSpan::new(s, e, Strand::Forward))
        .collect();
    if segments.len() < 2 {
        return forward;
    }
    let adjacent = |layout: &[SegmentSpan]| {
        layout
            .windows(2)
            .filter(|w| is_reference_join(&w[0], &w[1]))
            .count()
    };
    let (mut best, mut best_adjacent) = (forward.clone(), usize::MAX);
    for _ in 0..MAX_LAYOUT_SHUFFLES {
        let mut layout = forward.clone();
        layout.shuffle(rng);
        for span in layout.iter_mut() {
            if rng.gen_bool(0.5) {
                span.strand = Strand::Reverse;
            }
        }
        let count = adjacent(&layout);
        if count < best_adjacent {
            best = layout;
            best_adjacent = count;
        }
        if best_adjacent == 0 {
            break;
        }
    }
    if 0 < best_adjacent {
        debug!("SIMGENOME	ReferenceJoins	{best_adjacent}	Inverted");
        break_reference_joins(&mut best);
    }
    best
}

fn is_reference_join(upstream: &SegmentSpan, downstream: &SegmentSpan) -> bool {
    upstream.strand == downstream.strand && upstream.exit() == downstream.entry()
}

// Left to right, so an inverted segment is never inverted back.
fn break_reference_joins(layout: &mut [SegmentSpan]) {
    for i in 1..layout.len() {
        if is_reference_join(&layout[i - 1], &layout[i]) {
            layout[i].strand = match layout[i].strand {
                Strand::Forward => Strand::Reverse,
                Strand::Reverse => Strand::Forward,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn reference(len: usize, seed: u64) -> Vec<u8> {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
        seq::random_seq(&mut rng, len)
    }
    #[test]
    fn no_reference_joins() {
        let fwd = |s, e| SegmentSpan::new(s, e, Strand::Forward);
        let mut layout = vec![fwd(0, 10), fwd(10, 20), fwd(20, 30), fwd(30, 40)];
        break_reference_joins(&mut layout);
        assert!(layout.windows(2).all(|w| !is_reference_join(&w[0], &w[1])));
        // One cut leaves few layouts, so plain shuffling often fails to avoid a reference join.
        let refr = reference(400, 2);
        let interval = ReferenceInterval::new("chr1", 0, 400);
        for seed in 0..50 {
            let genome = mutate_genome(&interval, &refr, &MutationConfig::new(1, 0, seed));
            assert_eq!(genome.breakpoints.len(), 1);
            assert!(genome
                .breakpoints
                .iter()
                .all(|bp| bp.junction != JunctionType::Reference));
            assert_eq!(replay(&refr, &genome), genome.seq());
        }
    }
    #[test]
    fn example_scenario() {
        let refr = reference(9280, 1);
        let interval = ReferenceInterval::new("chr17", 7565720, 7565720 + 9280);
        let genome = mutate_genome(&interval, &refr, &MutationConfig::new(10, 10, 42));
        assert_eq!(genome.breakpoints.len(), 10);
        assert!(genome.indels.len() <= 10);
        assert_eq!(genome.indel_rows().count(), genome.indels.len());
        assert_eq!(genome.breakpoint_report().lines().count(), 10);
        assert_eq!(replay(&refr, &genome), genome.seq());
    }
    #[test]
    fn deterministic() {
        let refr = reference(5000, 2);
        let interval = ReferenceInterval::new("1", 0, 5000);
        let config = MutationConfig::new(5, 8, 7);
        let g1 = mutate_genome(&interval, &refr, &config);
        let g2 = mutate_genome(&interval, &refr, &config);
        assert_eq!(g1.seq, g2.seq);
        assert_eq!(g1.breakpoints, g2.breakpoints);
        assert_eq!(g1.indels, g2.indels);
        let g3 = mutate_genome(&interval, &refr, &MutationConfig::new(5, 8, 8));
        assert_ne!(g1.seq, g3.seq);
    }
    #[test]
    fn ledger_accounts_for_length() {
        let refr = reference(3000, 3);
        let interval = ReferenceInterval::new("1", 0, 3000);
        for seed in 0..20 {
            let genome = mutate_genome(&interval, &refr, &MutationConfig::new(4, 6, seed));
            let inserted: usize = genome
                .indels
                .iter()
                .filter(|i| i.indel_type == IndelType::Insertion)
                .map(|i| i.length)
                .sum();
            let deleted: usize = genome
                .indels
                .iter()
                .filter(|i| i.indel_type == IndelType::Deletion)
                .map(|i| i.length)
                .sum();
            assert_eq!(genome.seq.len() + deleted, refr.len() + inserted);
            assert_eq!(replay(&refr, &genome), genome.seq());
            // The layout uses every reference base exactly once.
            let mut spans: Vec<_> = genome.layout().iter().map(|s| (s.start, s.end)).collect();
            spans.sort();
            assert_eq!(spans.first().unwrap().0, 0);
            assert_eq!(spans.last().unwrap().1, refr.len());
            assert!(spans.windows(2).all(|w| w[0].1 == w[1].0));
            // Junction positions are consistent with segment lengths.
            for bp in genome.breakpoints.iter() {
                assert!(0 < bp.post && bp.post < genome.seq.len());
            }
        }
    }
    #[test]
    fn indels_do_not_overlap() {
        let refr = reference(2000, 4);
        let interval = ReferenceInterval::new("1", 0, 2000);
        let genome = mutate_genome(&interval, &refr, &MutationConfig::new(3, 30, 11));
        for pair in genome.indels.windows(2) {
            assert!(pair[0].reference_span().end + INDEL_MARGIN <= pair[1].position);
        }
    }
    #[test]
    fn short_interval_degrades() {
        let refr = reference(60, 5);
        let interval = ReferenceInterval::new("1", 0, 60);
        let genome = mutate_genome(&interval, &refr, &MutationConfig::new(10, 10, 1));
        assert!(genome.breakpoints.is_empty());
        // 60bp leaves room for at most a couple of indels.
        assert!(genome.indels.len() < 10);
        assert_eq!(replay(&refr, &genome), genome.seq());
        let tiny = mutate_genome(&interval, &refr[..5], &MutationConfig::new(2, 2, 1));
        assert!(tiny.indels.is_empty() && tiny.breakpoints.is_empty());
        assert_eq!(tiny.seq(), &refr[..5]);
    }
    #[test]
    fn empty_reference_is_an_error() {
        let refr = crate::reference::InMemoryReference::new(vec![("1".to_string(), vec![])]);
        let interval = ReferenceInterval::new("1", 0, 0);
        let result = simulate_genome(&refr, &interval, &MutationConfig::new(1, 1, 1));
        assert!(matches!(result, Err(SimError::EmptyReference { .. })));
    }
}
