#![allow(dead_code)]
use definitions::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use readsim::assembler::{Assembler, AssemblerConfig};
use readsim::minimap2::SequenceAligner;
use readsim::reference::InMemoryReference;
use readsim::seq;
use std::collections::HashSet;

/// Reports a hit wherever a query, or its reverse complement, occurs verbatim.
pub struct ExactAligner;

impl SequenceAligner for ExactAligner {
    fn align(
        &self,
        (name, reference): (&str, &[u8]),
        queries: &[(String, Vec<u8>)],
    ) -> readsim::Result<Vec<AlignmentRecord>> {
        let find = |q: &[u8]| match q.is_empty() {
            true => None,
            false => reference.windows(q.len()).position(|w| w == q),
        };
        let hits = queries
            .iter()
            .filter_map(|(id, query)| {
                let (start, strand) = match find(query.as_slice()) {
                    Some(start) => (start, Strand::Forward),
                    None => (find(seq::revcmp(query).as_slice())?, Strand::Reverse),
                };
                Some(AlignmentRecord {
                    query: id.clone(),
                    query_len: query.len(),
                    query_start: 0,
                    query_end: query.len(),
                    strand,
                    target: name.to_string(),
                    target_len: reference.len(),
                    target_start: start,
                    target_end: start + query.len(),
                    matches: query.len(),
                    block_len: query.len(),
                    mapq: 60,
                })
            })
            .collect();
        Ok(hits)
    }
}

/// Every distinct read at least `min_overlap` long becomes a contig.
pub struct ReadsAsContigs;

impl Assembler for ReadsAsContigs {
    fn assemble(
        &self,
        config: &AssemblerConfig,
        reads: &[(String, Vec<u8>)],
    ) -> readsim::Result<Vec<Contig>> {
        let mut seen = HashSet::new();
        let contigs = reads
            .iter()
            .filter(|(_, seq)| config.min_overlap <= seq.len())
            .filter(|(_, seq)| seen.insert(seq.clone()))
            .enumerate()
            .map(|(i, (_, seq))| Contig {
                id: format!("{}_contig{i}", config.id),
                seq: seq_to_string(seq.clone()),
            })
            .collect();
        Ok(contigs)
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn random_reference(chrom: &str, len: usize, seed: u64) -> (InMemoryReference, Vec<u8>) {
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(seed);
    let seq = seq::random_seq(&mut rng, len);
    let reference = InMemoryReference::new(vec![(chrom.to_string(), seq.clone())]);
    (reference, seq)
}
