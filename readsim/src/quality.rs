//! Pool of real quality strings used to decorate simulated reads.
use crate::error::{Result, SimError};
use log::*;
use rand::Rng;
use std::path::Path;

/// Phred+33 'I', Q40. Used when no training data is given.
pub const DEFAULT_QUALITY: u8 = b'I';
/// At most this many strings are kept from a training file.
pub const MAX_POOL_SIZE: usize = 100_000;

#[derive(Debug, Clone, Default)]
pub struct QualityPool {
    quals: Vec<Vec<u8>>,
}

impl QualityPool {
    pub fn new(quals: Vec<Vec<u8>>) -> Self {
        let quals = quals.into_iter().filter(|q| !q.is_empty()).collect();
        Self { quals }
    }
    /// Learn quality strings from the first records of a FASTQ file.
    pub fn from_fastq<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        debug!("QUALITY\tOpening\t{:?}", path);
        let reader = bio::io::fastq::Reader::from_file(&path)
            .map_err(|why| SimError::Reference(format!("{path:?}: {why}")))?;
        let mut quals = Vec::new();
        for record in reader.records().take(MAX_POOL_SIZE) {
            let record = record.map_err(|why| {
                SimError::invalid("quality-source", format!("{path:?}: {why}"))
            })?;
            quals.push(record.qual().to_vec());
        }
        if quals.is_empty() {
            return Err(SimError::invalid(
                "quality-source",
                format!("{path:?} has no records"),
            ));
        }
        info!("QUALITY\tTrained\t{}", quals.len());
        Ok(Self::new(quals))
    }
    pub fn len(&self) -> usize {
        self.quals.len()
    }
    pub fn is_empty(&self) -> bool {
        self.quals.is_empty()
    }
    /// Draw a quality string and fit it to `len`: truncated if longer,
    /// padded with its last character if shorter.
    pub fn draw<R: Rng>(&self, rng: &mut R, len: usize) -> Vec<u8> {
        if self.quals.is_empty() {
            return vec![DEFAULT_QUALITY; len];
        }
        let qual = &self.quals[rng.gen_range(0..self.quals.len())];
        let pad = qual.last().copied().unwrap_or(DEFAULT_QUALITY);
        qual.iter()
            .copied()
            .chain(std::iter::repeat(pad))
            .take(len)
            .collect()
    }
}
