//! Single- and paired-end read sampling with substitution and indel errors.
//!
//! All randomness is drawn from the generator handed in by the caller, in a fixed order,
//! so a seeded generator gives byte-identical reads.
use crate::error::{Result, SimError};
use crate::quality::QualityPool;
use crate::seq;
use definitions::*;
use log::*;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

/// Attempts at placing one fragment before it counts as a shortfall.
pub const MAX_FRAGMENT_RETRIES: usize = 100;
/// Extra source bases read past the read end, so that a deletion still leaves a full read.
const READ_SLACK: usize = 1;
/// Sampling that yields less than this fraction of the requested reads is logged as an error
/// instead of a warning.
pub const MIN_YIELD: f64 = 0.9;

/// Per-base substitution rate, and per-read insertion/deletion rates.
/// Every rate is in [0,1], also when deserialized.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawErrorProfile")]
pub struct ErrorProfile {
    snv: f64,
    ins: f64,
    del: f64,
}

#[derive(Deserialize)]
struct RawErrorProfile {
    snv: f64,
    ins: f64,
    del: f64,
}

impl TryFrom<RawErrorProfile> for ErrorProfile {
    type Error = SimError;
    fn try_from(raw: RawErrorProfile) -> Result<Self> {
        Self::new(raw.snv, raw.ins, raw.del)
    }
}

impl ErrorProfile {
    pub fn new(snv: f64, ins: f64, del: f64) -> Result<Self> {
        for (name, rate) in [("snv", snv), ("ins", ins), ("del", del)] {
            if !(0f64..=1f64).contains(&rate) {
                return Err(SimError::invalid(name, format!("{rate} is not in [0,1]")));
            }
        }
        Ok(Self { snv, ins, del })
    }
    pub fn error_free() -> Self {
        Self {
            snv: 0f64,
            ins: 0f64,
            del: 0f64,
        }
    }
    pub fn snv(&self) -> f64 {
        self.snv
    }
    pub fn ins(&self) -> f64 {
        self.ins
    }
    pub fn del(&self) -> f64 {
        self.del
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadSimConfig {
    coverage: f64,
    read_len: usize,
    profile: ErrorProfile,
    insert_mean: f64,
    insert_sd: f64,
}

impl ReadSimConfig {
    pub fn new(coverage: f64, read_len: usize, profile: ErrorProfile) -> Self {
        Self {
            coverage,
            read_len,
            profile,
            insert_mean: 250f64,
            insert_sd: 50f64,
        }
    }
    pub fn with_insert_size(mut self, mean: f64, sd: f64) -> Self {
        self.insert_mean = mean;
        self.insert_sd = sd;
        self
    }
    pub fn read_len(&self) -> usize {
        self.read_len
    }
    fn validate(&self) -> Result<()> {
        if !(self.coverage.is_finite() && 0f64 <= self.coverage) {
            return Err(SimError::invalid("coverage", format!("{}", self.coverage)));
        }
        if self.read_len == 0 {
            return Err(SimError::invalid("read-length", "must be positive"));
        }
        Ok(())
    }
}

/// Reads produced by one sampling call, with the number that was asked for.
#[derive(Debug, Clone)]
pub struct Sampling<T> {
    pub items: Vec<T>,
    pub requested: usize,
}

impl<T> Sampling<T> {
    /// `Some(SamplingExhaustion)` if fewer items than requested could be placed.
    pub fn shortfall(&self) -> Option<SimError> {
        (self.items.len() < self.requested).then(|| SimError::SamplingExhaustion {
            requested: self.requested,
            produced: self.items.len(),
        })
    }
    pub fn below_minimum_yield(&self) -> bool {
        (self.items.len() as f64) < self.requested as f64 * MIN_YIELD
    }
    /// Log a shortfall, if any, and return the items.
    pub fn into_items_logged(self, label: &str) -> Vec<T> {
        if let Some(why) = self.shortfall() {
            match self.below_minimum_yield() {
                true => error!("READSIM\t{label}\t{why}"),
                false => warn!("READSIM\t{label}\t{why}"),
            }
        }
        self.items
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadSampler {
    alleles: Vec<Allele>,
    quality: QualityPool,
}

impl ReadSampler {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_quality(quality: QualityPool) -> Self {
        Self {
            alleles: vec![],
            quality,
        }
    }
    pub fn add_allele(&mut self, seq: &[u8], weight: f64) -> Result<()> {
        if seq.is_empty() {
            return Err(SimError::invalid("allele", "empty sequence"));
        }
        if !(weight.is_finite() && 0f64 < weight) {
            return Err(SimError::invalid("allele", format!("weight {weight}")));
        }
        let id = self.alleles.len();
        self.alleles.push(Allele {
            id,
            seq: seq_to_string(seq.to_vec()),
            weight,
        });
        Ok(())
    }
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }
    pub fn total_len(&self) -> usize {
        self.alleles.iter().map(|a| a.seq.len()).sum()
    }
    fn chooser(&self) -> Result<WeightedIndex<f64>> {
        WeightedIndex::new(self.alleles.iter().map(|a| a.weight))
            .map_err(|why| SimError::invalid("allele", format!("{why}")))
    }
    /// round(coverage * total allele length / read length) single-end reads.
    /// A read starts uniformly inside an allele and stops at the allele end if it runs out.
    pub fn sample_reads<R: Rng>(
        &self,
        rng: &mut R,
        config: &ReadSimConfig,
    ) -> Result<Sampling<SampledRead>> {
        config.validate()?;
        let chooser = self.chooser()?;
        let requested =
            (config.coverage * self.total_len() as f64 / config.read_len as f64).round() as usize;
        debug!("READSIM\tSingle\t{requested}\t{}", config.coverage);
        let items = (0..requested)
            .map(|_| self.sample_single(rng, &chooser, config))
            .collect();
        Ok(Sampling { items, requested })
    }
    fn sample_single<R: Rng>(
        &self,
        rng: &mut R,
        chooser: &WeightedIndex<f64>,
        config: &ReadSimConfig,
    ) -> SampledRead {
        let allele = &self.alleles[chooser.sample(rng)];
        let template = allele.seq();
        let start = rng.gen_range(0..template.len());
        let end = (start + config.read_len).min(template.len());
        let strand = match rng.gen_bool(0.5) {
            true => Strand::Forward,
            false => Strand::Reverse,
        };
        let window = match strand {
            Strand::Forward => template[start..end].to_vec(),
            Strand::Reverse => seq::revcmp(&template[start..end]),
        };
        let (read, errors) = match introduce_errors(rng, &window, None, &config.profile) {
            Some(res) => res,
            None => (window, vec![]),
        };
        let qual = self.quality.draw(rng, read.len());
        SampledRead {
            seq: seq_to_string(read),
            strand,
            allele: allele.id,
            offset: start,
            qual: seq_to_string(qual),
            errors,
        }
    }
    /// round(coverage * total allele length / (2 * read length)) pairs.
    /// Every pair has two reads of exactly the configured read length.
    pub fn sample_pairs<R: Rng>(
        &self,
        rng: &mut R,
        config: &ReadSimConfig,
    ) -> Result<Sampling<ReadPair>> {
        config.validate()?;
        let chooser = self.chooser()?;
        let insert = Normal::new(config.insert_mean, config.insert_sd).map_err(|why| {
            SimError::invalid(
                "insert-size",
                format!("{}({}): {why}", config.insert_mean, config.insert_sd),
            )
        })?;
        let requested = (config.coverage * self.total_len() as f64
            / (2 * config.read_len) as f64)
            .round() as usize;
        debug!("READSIM\tPaired\t{requested}\t{}", config.coverage);
        let items: Vec<_> = (0..requested)
            .filter_map(|_| {
                (0..MAX_FRAGMENT_RETRIES)
                    .find_map(|_| self.try_sample_pair(rng, &chooser, &insert, config))
            })
            .collect();
        Ok(Sampling { items, requested })
    }
    fn try_sample_pair<R: Rng>(
        &self,
        rng: &mut R,
        chooser: &WeightedIndex<f64>,
        insert: &Normal<f64>,
        config: &ReadSimConfig,
    ) -> Option<ReadPair> {
        let len = config.read_len;
        let allele = &self.alleles[chooser.sample(rng)];
        let template = allele.seq();
        let fragment_len = insert.sample(rng).round().max(len as f64) as usize;
        if template.len() < fragment_len {
            return None;
        }
        let offset = rng.gen_range(0..=template.len() - fragment_len);
        let end1 = (offset + len + READ_SLACK).min(template.len());
        let end2 = offset + fragment_len;
        let start2 = end2.saturating_sub(len + READ_SLACK);
        let source2 = seq::revcmp(&template[start2..end2]);
        let (seq1, errors1) = introduce_errors(rng, &template[offset..end1], Some(len), &config.profile)?;
        let (seq2, errors2) = introduce_errors(rng, &source2, Some(len), &config.profile)?;
        let qual1 = self.quality.draw(rng, len);
        let qual2 = self.quality.draw(rng, len);
        let read1 = SampledRead {
            seq: seq_to_string(seq1),
            strand: Strand::Forward,
            allele: allele.id,
            offset,
            qual: seq_to_string(qual1),
            errors: errors1,
        };
        let read2 = SampledRead {
            seq: seq_to_string(seq2),
            strand: Strand::Reverse,
            allele: allele.id,
            offset: end2 - len,
            qual: seq_to_string(qual2),
            errors: errors2,
        };
        Some(ReadPair {
            read1,
            read2,
            fragment_len,
        })
    }
}

/// Apply at most one deletion and one insertion (per-read events), then per-base substitutions.
/// With `target_len`, the read is cut to exactly that length, and `None` is returned when the
/// source is too short to fill it.
fn introduce_errors<R: Rng>(
    rng: &mut R,
    source: &[u8],
    target_len: Option<usize>,
    profile: &ErrorProfile,
) -> Option<(Vec<u8>, Vec<SeqError>)> {
    let mut read = source.to_vec();
    let mut errors = vec![];
    if rng.gen_bool(profile.del) && 1 < read.len() {
        let position = rng.gen_range(0..read.len());
        read.remove(position);
        errors.push(SeqError {
            position,
            kind: ErrorKind::Deletion,
        });
    }
    if rng.gen_bool(profile.ins) {
        let position = rng.gen_range(0..=read.len());
        read.insert(position, seq::random_base(rng));
        errors
            .iter_mut()
            .filter(|e| position <= e.position)
            .for_each(|e| e.position += 1);
        errors.push(SeqError {
            position,
            kind: ErrorKind::Insertion,
        });
    }
    if let Some(len) = target_len {
        if read.len() < len {
            return None;
        }
        read.truncate(len);
        errors.retain(|e| e.position < len);
    }
    for (position, base) in read.iter_mut().enumerate() {
        if rng.gen_bool(profile.snv) {
            *base = seq::substitute(*base, rng);
            errors.push(SeqError {
                position,
                kind: ErrorKind::Substitution,
            });
        }
    }
    Some((read, errors))
}
