//! Consensus k-mer correction of short reads.
//!
//! k-mers seen fewer than `min_count` times across the whole read set are weak. For each read,
//! the single-base substitution that removes the most weak k-mers (net of solid k-mers it
//! breaks) is applied, and this repeats until no substitution helps or the pass budget is spent.
//! Ties go to the leftmost position, then to the base first in ACGT order.
use crate::kmer::{is_valid_k, KmerTable};
use crate::seq::BASES;
use definitions::*;
use log::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KmerCorrectionConfig {
    pub k: usize,
    pub min_count: u32,
    pub max_passes: usize,
}

impl Default for KmerCorrectionConfig {
    fn default() -> Self {
        Self {
            k: 21,
            min_count: 3,
            max_passes: 128,
        }
    }
}

impl KmerCorrectionConfig {
    pub fn new(k: usize, min_count: u32, max_passes: usize) -> Self {
        Self {
            k,
            min_count,
            max_passes,
        }
    }
}

pub trait KmerCorrection {
    /// Correct every read in place, recording the corrected sequence next to the original.
    /// Returns the number of corrected reads.
    fn correct_kmers(&mut self, config: &KmerCorrectionConfig) -> usize;
}

impl KmerCorrection for [AlignedRead] {
    fn correct_kmers(&mut self, config: &KmerCorrectionConfig) -> usize {
        let table = {
            let seqs: Vec<&[u8]> = self.iter().map(|r| r.seq()).collect();
            KmerTable::new(&seqs, config.k)
        };
        let corrected: usize = self
            .par_iter_mut()
            .map(|read| {
                read.corrected = correct_read(&table, read.seq(), config).map(seq_to_string);
                read.corrected.is_some() as usize
            })
            .sum();
        debug!("KMERCORR\tCorrected\t{corrected}\t{}", self.len());
        corrected
    }
}

/// Count k-mers over `reads` and correct each of them.
pub fn correct_reads<T: AsRef<[u8]> + Sync>(
    reads: &[T],
    config: &KmerCorrectionConfig,
) -> Vec<CorrectionResult> {
    let table = KmerTable::new(reads, config.k);
    reads
        .par_iter()
        .map(|read| {
            let read = read.as_ref();
            let original = seq_to_string(read.to_vec());
            match correct_read(&table, read, config) {
                Some(seq) => CorrectionResult {
                    corrected: true,
                    original,
                    seq: seq_to_string(seq),
                },
                None => CorrectionResult {
                    corrected: false,
                    seq: original.clone(),
                    original,
                },
            }
        })
        .collect()
}

/// The corrected sequence, or `None` if no substitution was made.
pub fn correct_read(
    table: &KmerTable,
    read: &[u8],
    config: &KmerCorrectionConfig,
) -> Option<Vec<u8>> {
    let k = table.k();
    if !is_valid_k(k) || read.len() < k {
        return None;
    }
    let is_weak = |kmer: &[u8]| table.count(kmer) < config.min_count;
    let mut seq = read.to_vec();
    let mut changed = false;
    for _ in 0..config.max_passes {
        let weak: Vec<bool> = seq.windows(k).map(is_weak).collect();
        if !weak.contains(&true) {
            break;
        }
        let mut best: Option<(usize, u8, i64)> = None;
        for pos in 0..seq.len() {
            // Windows [start, start+k) that contain `pos`.
            let windows = pos.saturating_sub(k - 1)..=pos.min(seq.len() - k);
            if !weak[windows.clone()].contains(&true) {
                continue;
            }
            let original = seq[pos];
            for &base in BASES.iter().filter(|&&b| b != original.to_ascii_uppercase()) {
                seq[pos] = base;
                let gain: i64 = windows
                    .clone()
                    .map(|s| weak[s] as i64 - is_weak(&seq[s..s + k]) as i64)
                    .sum();
                if 0 < gain && best.map(|(_, _, g)| g < gain).unwrap_or(true) {
                    best = Some((pos, base, gain));
                }
            }
            seq[pos] = original;
        }
        match best {
            Some((pos, base, gain)) => {
                trace!("KMERCORR\tFix\t{pos}\t{}\t{gain}", base as char);
                seq[pos] = base;
                changed = true;
            }
            None => break,
        }
    }
    changed.then(|| seq)
}
