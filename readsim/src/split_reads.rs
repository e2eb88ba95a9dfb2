//! Split a paired read set into disjoint random subsets.
//!
//! Every pair draws one uniform number and goes to the first subset whose cumulative fraction
//! exceeds it. Pairs drawing above the total are dropped. Both mates always go together.
use crate::config::SimulationContext;
use crate::error::{Result, SimError};
use bio::io::fastq;
use log::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use std::path::{Path, PathBuf};

const SUM_TOLERANCE: f64 = 1e-9;

pub fn check_fractions(fractions: &[f64]) -> Result<()> {
    if fractions.is_empty() {
        return Err(SimError::invalid("fractions", "empty list"));
    }
    if let Some(f) = fractions.iter().find(|f| !(0f64..=1f64).contains(*f)) {
        return Err(SimError::invalid("fractions", format!("{f} is not in [0,1]")));
    }
    let sum: f64 = fractions.iter().sum();
    if 1f64 + SUM_TOLERANCE < sum {
        return Err(SimError::invalid("fractions", format!("sum to {sum} > 1")));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Partitioner {
    cumulative: Vec<f64>,
}

impl Partitioner {
    pub fn new(fractions: &[f64]) -> Result<Self> {
        check_fractions(fractions)?;
        let cumulative = fractions
            .iter()
            .scan(0f64, |acc, f| {
                *acc += f;
                Some(*acc)
            })
            .collect();
        Ok(Self { cumulative })
    }
    /// Subset of the next pair, or `None` if it is dropped.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let draw: f64 = rng.gen();
        self.cumulative.iter().position(|&c| draw < c)
    }
    pub fn partition<R: Rng, T>(
        &self,
        rng: &mut R,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<Vec<T>> {
        let mut subsets: Vec<Vec<T>> = self.cumulative.iter().map(|_| vec![]).collect();
        for item in items {
            if let Some(idx) = self.pick(rng) {
                subsets[idx].push(item);
            }
        }
        subsets
    }
}

/// Output paths of each fraction: `<prefix><fraction>_subsampled_{1,2}.fastq`.
/// A fraction given more than once gets its index too, as in `<prefix>0.5_1_subsampled_1.fastq`.
pub fn subset_paths(prefix: &str, fractions: &[f64]) -> Vec<(PathBuf, PathBuf)> {
    fractions
        .iter()
        .enumerate()
        .map(|(i, fraction)| {
            let repeated = fractions.iter().filter(|&f| f == fraction).count() > 1;
            let stem = match repeated {
                true => format!("{prefix}{fraction}_{i}_subsampled"),
                false => format!("{prefix}{fraction}_subsampled"),
            };
            (
                PathBuf::from(format!("{stem}_1.fastq")),
                PathBuf::from(format!("{stem}_2.fastq")),
            )
        })
        .collect()
}

/// Split the paired FASTQ of `ctx` and return the number of pairs in each subset.
pub fn split_reads(ctx: &SimulationContext) -> Result<Vec<usize>> {
    let (input1, input2) = ctx
        .split_inputs
        .as_ref()
        .ok_or_else(|| SimError::invalid("input", "two FASTQ files are required"))?;
    let partitioner = Partitioner::new(&ctx.split_fractions)?;
    let open = |path: &Path| {
        fastq::Reader::from_file(path)
            .map_err(|why| SimError::invalid("input", format!("{path:?}: {why}")))
    };
    let malformed = |why: fastq::Error| SimError::invalid("input", why.to_string());
    let mut records1 = open(input1)?.records();
    let mut records2 = open(input2)?.records();
    let mut writers = vec![];
    for (out1, out2) in subset_paths(&ctx.prefix, &ctx.split_fractions) {
        debug!("SPLIT\tOutput\t{}\t{}", out1.display(), out2.display());
        writers.push((fastq::Writer::to_file(out1)?, fastq::Writer::to_file(out2)?));
    }
    let mut counts = vec![0; writers.len()];
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(ctx.seed);
    let mut total = 0;
    loop {
        let (r1, r2) = match (records1.next(), records2.next()) {
            (Some(r1), Some(r2)) => (r1.map_err(malformed)?, r2.map_err(malformed)?),
            (None, None) => break,
            _ => {
                return Err(SimError::invalid(
                    "input",
                    format!("{input1:?} and {input2:?} have different numbers of reads"),
                ))
            }
        };
        total += 1;
        if let Some(idx) = partitioner.pick(&mut rng) {
            let (w1, w2) = &mut writers[idx];
            w1.write_record(&r1)?;
            w2.write_record(&r2)?;
            counts[idx] += 1;
        }
    }
    for (w1, w2) in writers.iter_mut() {
        w1.flush()?;
        w2.flush()?;
    }
    for (fraction, count) in ctx.split_fractions.iter().zip(counts.iter()) {
        info!("SPLIT\t{fraction}\t{count}\t{total}");
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn fractions() {
        assert!(check_fractions(&[0.5, 0.5]).is_ok());
        assert!(check_fractions(&[0.1, 0.2, 0.7]).is_ok());
        assert!(check_fractions(&[0.6, 0.5]).is_err());
        assert!(check_fractions(&[-0.1, 0.5]).is_err());
        assert!(check_fractions(&[]).is_err());
        assert!(check_fractions(&[f64::NAN]).is_err());
    }
    #[test]
    fn proportional_and_disjoint() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(5);
        let fractions = [0.1, 0.3, 0.5];
        let partitioner = Partitioner::new(&fractions).unwrap();
        let n = 20_000;
        let pairs: Vec<_> = (0..n).map(|i| (format!("r{i}/1"), format!("r{i}/2"))).collect();
        let subsets = partitioner.partition(&mut rng, pairs.iter());
        assert_eq!(subsets.len(), 3);
        let mut seen = std::collections::HashSet::new();
        for (subset, fraction) in subsets.iter().zip(fractions.iter()) {
            let observed = subset.len() as f64 / n as f64;
            assert!((observed - fraction).abs() < 0.02, "{observed} vs {fraction}");
            for (r1, r2) in subset.iter() {
                assert_eq!(r1.trim_end_matches("/1"), r2.trim_end_matches("/2"));
                assert!(seen.insert(r1.clone()));
            }
        }
        let kept: usize = subsets.iter().map(|s| s.len()).sum();
        assert!(((n - kept) as f64 / n as f64 - 0.1).abs() < 0.02);
    }
    #[test]
    fn split_fastq() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let (in1, in2) = (dir.path().join("in_1.fq"), dir.path().join("in_2.fq"));
        let mut w1 = std::fs::File::create(&in1).unwrap();
        let mut w2 = std::fs::File::create(&in2).unwrap();
        for i in 0..500 {
            writeln!(w1, "@p{i}\nACGTACGT\n+\nIIIIIIII").unwrap();
            writeln!(w2, "@p{i}\nTTGGCCAA\n+\nIIIIIIII").unwrap();
        }
        drop((w1, w2));
        let prefix = dir.path().join("sub").to_string_lossy().to_string();
        let ctx = SimulationContext {
            mode: crate::config::Mode::SplitReads,
            seed: 3,
            prefix: prefix.clone(),
            split_inputs: Some((in1.clone(), in2.clone())),
            split_fractions: vec![0.5, 0.5],
            ..Default::default()
        };
        let counts = split_reads(&ctx).unwrap();
        assert_eq!(counts.iter().sum::<usize>(), 500);
        let paths = subset_paths(&prefix, &ctx.split_fractions);
        assert_ne!(paths[0], paths[1]);
        for ((out1, out2), count) in paths.iter().zip(counts.iter()) {
            let ids1: Vec<_> = fastq::Reader::from_file(&out1)
                .unwrap()
                .records()
                .map(|r| r.unwrap().id().to_string())
                .collect();
            let ids2: Vec<_> = fastq::Reader::from_file(&out2)
                .unwrap()
                .records()
                .map(|r| r.unwrap().id().to_string())
                .collect();
            assert_eq!(ids1.len(), *count);
            assert_eq!(ids1, ids2);
        }
        let ctx = SimulationContext {
            split_fractions: vec![0.2, 0.3],
            ..ctx
        };
        let counts = split_reads(&ctx).unwrap();
        assert!(counts.iter().sum::<usize>() < 500);
        let mut truncated = std::fs::OpenOptions::new().append(true).open(&in1).unwrap();
        writeln!(truncated, "@extra\nACGT\n+\nIIII").unwrap();
        assert!(split_reads(&ctx).is_err());
    }
}
