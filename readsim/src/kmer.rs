//! Canonical 2-bit k-mer encoding and counting.
use log::*;
use rayon::prelude::*;
use std::collections::HashMap;

/// k-mers are packed into a u64.
pub const MAX_K: usize = 32;

pub fn is_valid_k(k: usize) -> bool {
    (1..=MAX_K).contains(&k)
}

const BASE2BITCMP: [u64; 256] = base2bitcmp();
const BASE2BIT: [u64; 256] = base2bit();

const fn base2bitcmp() -> [u64; 256] {
    let mut slots = [0; 256];
    slots[b'A' as usize] = 3;
    slots[b'a' as usize] = 3;
    slots[b'C' as usize] = 2;
    slots[b'c' as usize] = 2;
    slots[b'G' as usize] = 1;
    slots[b'g' as usize] = 1;
    slots
}

const fn base2bit() -> [u64; 256] {
    let mut slots = [0; 256];
    slots[b'C' as usize] = 1;
    slots[b'c' as usize] = 1;
    slots[b'G' as usize] = 2;
    slots[b'g' as usize] = 2;
    slots[b'T' as usize] = 3;
    slots[b't' as usize] = 3;
    slots
}

/// Canonical index of `w`: the smaller of the forward and reverse-complement encodings.
/// Returns `None` if `w` contains anything other than ACGT, or is longer than 32.
pub fn to_idx(w: &[u8]) -> Option<u64> {
    if w.len() > 32 || !w.iter().all(|&b| crate::seq::is_acgt(b)) {
        return None;
    }
    let forward: u64 = w
        .iter()
        .enumerate()
        .map(|(i, &b)| BASE2BIT[b as usize] << (2 * i))
        .sum();
    let reverse = w
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &b)| BASE2BITCMP[b as usize] << (2 * i))
        .sum();
    Some(forward.min(reverse))
}

/// k-mer occurrence counts over a read collection. Both strands are merged.
#[derive(Debug, Clone)]
pub struct KmerTable {
    k: usize,
    counts: HashMap<u64, u32>,
}

impl KmerTable {
    /// An unusable `k` gives an empty table.
    pub fn new<T: AsRef<[u8]> + Sync>(reads: &[T], k: usize) -> Self {
        if !is_valid_k(k) {
            warn!("KMER	InvalidK	{k}");
            return Self {
                k,
                counts: HashMap::new(),
            };
        }
        let counts = reads
            .par_iter()
            .fold(HashMap::new, |mut counts, read| {
                for kmer in read.as_ref().windows(k).filter_map(to_idx) {
                    *counts.entry(kmer).or_default() += 1;
                }
                counts
            })
            .reduce(HashMap::new, |mut x, y| {
                for (key, val) in y {
                    *x.entry(key).or_default() += val;
                }
                x
            });
        Self { k, counts }
    }
    pub fn k(&self) -> usize {
        self.k
    }
    pub fn count(&self, kmer: &[u8]) -> u32 {
        to_idx(kmer)
            .and_then(|idx| self.counts.get(&idx).copied())
            .unwrap_or(0)
    }
    /// Number of distinct canonical k-mers.
    pub fn len(&self) -> usize {
        self.counts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn canonical() {
        assert_eq!(to_idx(b"AAAA"), Some(0));
        assert_eq!(to_idx(b"TTTT"), Some(0));
        assert_eq!(to_idx(b"ACGT"), to_idx(b"acgt"));
        assert_eq!(to_idx(b"AACC"), to_idx(b"GGTT"));
        assert_eq!(to_idx(b"ACNT"), None);
    }
    #[test]
    fn counting() {
        let reads = vec![b"ACGTAC".to_vec(), b"GTACGT".to_vec(), b"NNNNNN".to_vec()];
        let table = KmerTable::new(&reads, 4);
        // ACGT and GTAC are their own reverse complements.
        assert_eq!(table.count(b"ACGT"), 2);
        assert_eq!(table.count(b"GTAC"), 2);
        // CGTA and TACG are each other's.
        assert_eq!(table.count(b"CGTA"), 2);
        assert_eq!(table.count(b"TACG"), 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table.count(b"AAAA"), 0);
        assert_eq!(table.count(b"NNNN"), 0);
    }
    #[test]
    fn invalid_k_is_empty() {
        let reads = vec![b"ACGTAC".to_vec()];
        assert!(KmerTable::new(&reads, 0).is_empty());
        assert!(KmerTable::new(&reads, 33).is_empty());
        assert_eq!(KmerTable::new(&reads, 0).k(), 0);
    }
}
