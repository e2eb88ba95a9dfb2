//! Assembly benchmark -- sweep coverage, error rates and correction over a local reference,
//! assemble the simulated reads, and score how much of the reference the contigs cover.
use crate::assembler::{Assembler, AssemblerConfig};
use crate::config::SimulationContext;
use crate::error::{Result, SimError};
use crate::intervals;
use crate::kmer_correction::KmerCorrection;
use crate::minimap2::{first_hits, write_fasta, SequenceAligner};
use crate::quality::QualityPool;
use crate::read_sim::{ErrorProfile, ReadSimConfig, ReadSampler};
use crate::reference::{parse_region, ReferenceAccessor};
use crate::seq;
use definitions::*;
use log::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::{BufWriter, Write};

/// Name of the local reference in every alignment.
pub const LOCAL_REF: &str = "local_ref";
const SHOWCASE_COVERAGE: f64 = 20.0;
const SHOWCASE_SNV: f64 = 0.01;

/// One combination of the parameter sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepCell {
    pub index: usize,
    pub trial: usize,
    pub coverage: f64,
    pub snv: f64,
    pub del: f64,
    pub ins: f64,
    pub kmer_corr: bool,
}

impl SweepCell {
    /// The cell whose intermediate data are dumped for manual inspection.
    pub fn is_showcase(&self) -> bool {
        self.kmer_corr && self.coverage == SHOWCASE_COVERAGE && self.snv == SHOWCASE_SNV
    }
}

/// Trials × coverages × SNV rates × deletion rates × insertion rates × correction flags,
/// in this nesting order.
pub fn sweep_cells(ctx: &SimulationContext) -> Vec<SweepCell> {
    let mut cells = vec![];
    for trial in 0..ctx.num_trials {
        for &coverage in ctx.coverages.iter() {
            for &snv in ctx.snv_rates.iter() {
                for &del in ctx.del_rates.iter() {
                    for &ins in ctx.ins_rates.iter() {
                        for &kmer_corr in ctx.kmer_corr.iter() {
                            cells.push(SweepCell {
                                index: cells.len(),
                                trial,
                                coverage,
                                snv,
                                del,
                                ins,
                                kmer_corr,
                            });
                        }
                    }
                }
            }
        }
    }
    cells
}

/// Intermediate data of the showcase cell.
#[derive(Debug, Clone, Default)]
pub struct Showcase {
    pub contig_hits: Vec<AlignmentRecord>,
    pub pairs: Vec<ReadPair>,
    pub reads: Vec<AlignedRead>,
}

#[derive(Debug, Clone)]
pub struct CellOutcome {
    pub cell: SweepCell,
    pub metric: CoverageMetric,
    pub showcase: Option<Showcase>,
}

pub struct BenchmarkDriver<'a, A: SequenceAligner, S: Assembler> {
    ctx: &'a SimulationContext,
    local_ref: Vec<u8>,
    aligner: &'a A,
    assembler: &'a S,
    quality: QualityPool,
}

impl<'a, A: SequenceAligner, S: Assembler> BenchmarkDriver<'a, A, S> {
    pub fn new(
        ctx: &'a SimulationContext,
        local_ref: Vec<u8>,
        aligner: &'a A,
        assembler: &'a S,
    ) -> Result<Self> {
        if local_ref.is_empty() {
            return Err(SimError::EmptyReference {
                interval: ctx.region.clone().unwrap_or_default(),
            });
        }
        if local_ref.len() < ctx.read_len {
            return Err(SimError::invalid(
                "region",
                format!("{}bp is shorter than a read ({})", local_ref.len(), ctx.read_len),
            ));
        }
        Ok(Self {
            ctx,
            local_ref,
            aligner,
            assembler,
            quality: QualityPool::default(),
        })
    }
    pub fn with_quality(mut self, quality: QualityPool) -> Self {
        self.quality = quality;
        self
    }
    pub fn local_ref(&self) -> &[u8] {
        &self.local_ref
    }
    /// Run every cell of the sweep. Rows come back in sweep order.
    pub fn run(&self) -> Result<Vec<CellOutcome>> {
        let cells = sweep_cells(self.ctx);
        let showcase = cells.iter().find(|c| c.is_showcase()).map(|c| c.index);
        // One generator per cell, `index + 1` jumps away from the seeded one.
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(self.ctx.seed);
        let rngs: Vec<_> = cells
            .iter()
            .map(|_| {
                rng.jump();
                rng.clone()
            })
            .collect();
        info!("BENCHMARK\tCells\t{}", cells.len());
        cells
            .par_iter()
            .zip(rngs.into_par_iter())
            .map(|(cell, mut rng)| self.run_cell(cell, &mut rng, Some(cell.index) == showcase))
            .collect()
    }
    /// Sample, align, optionally correct, assemble, align the contigs and score.
    pub fn run_cell(
        &self,
        cell: &SweepCell,
        rng: &mut Xoshiro256StarStar,
        keep: bool,
    ) -> Result<CellOutcome> {
        let ctx = self.ctx;
        let mut sampler = ReadSampler::with_quality(self.quality.clone());
        sampler.add_allele(&self.local_ref, 1f64)?;
        let profile = ErrorProfile::new(cell.snv, cell.ins, cell.del)?;
        let config = ReadSimConfig::new(cell.coverage, ctx.read_len, profile)
            .with_insert_size(ctx.assembly_insert_mean, ctx.assembly_insert_sd);
        let label = format!("Cell{}", cell.index);
        let reads = sampler.sample_reads(rng, &config)?.into_items_logged(&label);
        let pairs = sampler.sample_pairs(rng, &config)?.into_items_logged(&label);
        // Reads with an ambiguous base never reach the aligner.
        let queries: Vec<(String, Vec<u8>)> = reads
            .iter()
            .filter(|read| !seq::has_ambiguous_base(read.seq()))
            .enumerate()
            .map(|(i, read)| (format!("read_{}", i + 1), read.seq().to_vec()))
            .collect();
        let mut aligned = self.align_reads(&queries)?;
        if cell.kmer_corr {
            aligned.correct_kmers(&ctx.kmer);
        }
        let asm_config =
            AssemblerConfig::for_reads(&ctx.id, cell.kmer_corr, ctx.min_overlap, ctx.read_len);
        let asm_reads: Vec<_> = aligned
            .iter()
            .map(|read| (read.id.clone(), read.assembly_seq().to_vec()))
            .collect();
        let contigs = self.assembler.assemble(&asm_config, &asm_reads)?;
        let contig_seqs: Vec<_> = contigs
            .iter()
            .map(|c| (c.id.clone(), c.seq().to_vec()))
            .collect();
        let contig_hits = match contig_seqs.is_empty() {
            true => vec![],
            false => self.aligner.align((LOCAL_REF, self.local_ref.as_slice()), &contig_seqs)?,
        };
        let merged = intervals::merge_hits(&contig_hits);
        let contig_coverage = intervals::widest(&merged) as f64 / self.local_ref.len() as f64;
        let metric = CoverageMetric {
            coverage: cell.coverage,
            num_reads: aligned.len(),
            num_contigs: contigs.len(),
            num_final: merged.len(),
            contig_coverage,
            kmer_corr: cell.kmer_corr,
            error_rate: cell.snv,
        };
        info!("BENCHMARK\tCell\t{}\t{}", cell.index, metric);
        let showcase = keep.then(|| Showcase {
            contig_hits,
            pairs,
            reads: aligned,
        });
        Ok(CellOutcome {
            cell: *cell,
            metric,
            showcase,
        })
    }
    // First hit of each read, joined back to its sequence.
    fn align_reads(&self, queries: &[(String, Vec<u8>)]) -> Result<Vec<AlignedRead>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }
        let hits = self.aligner.align((LOCAL_REF, self.local_ref.as_slice()), queries)?;
        let seqs: HashMap<_, _> = queries.iter().map(|(id, seq)| (id.as_str(), seq)).collect();
        let aligned = first_hits(hits)
            .into_iter()
            .filter_map(|hit| {
                let seq = seqs.get(hit.query.as_str())?;
                Some(AlignedRead {
                    id: hit.query.clone(),
                    seq: seq_to_string(seq.to_vec()),
                    hit,
                    corrected: None,
                })
            })
            .collect();
        Ok(aligned)
    }
}

/// Write the metrics table, header first.
pub fn write_metrics<W: Write>(wtr: &mut W, metrics: &[CoverageMetric]) -> Result<()> {
    writeln!(wtr, "{}", CoverageMetric::HEADER)?;
    for metric in metrics {
        writeln!(wtr, "{metric}")?;
    }
    Ok(())
}

/// Dump the showcase cell next to `<prefix>`.
pub fn write_showcase(ctx: &SimulationContext, showcase: &Showcase) -> Result<()> {
    let mut wtr = BufWriter::new(std::fs::File::create(ctx.output("contigs_to_ref.paf"))?);
    for hit in showcase.contig_hits.iter() {
        writeln!(wtr, "{hit}")?;
    }
    wtr.flush()?;
    let names: Vec<_> = (0..showcase.pairs.len()).map(|i| format!("r{i}")).collect();
    for (artifact, is_first) in [("paired_end1.fa", true), ("paired_end2.fa", false)] {
        let records = names.iter().zip(showcase.pairs.iter()).map(|(name, pair)| {
            let read = if is_first { &pair.read1 } else { &pair.read2 };
            (name.as_str(), read.seq())
        });
        write_fasta(ctx.output(artifact), records)?;
    }
    let mut wtr = BufWriter::new(std::fs::File::create(ctx.output("reads_to_ref.paf"))?);
    for read in showcase.reads.iter() {
        writeln!(wtr, "{}", read.hit)?;
    }
    wtr.flush()?;
    let mut wtr = BufWriter::new(std::fs::File::create(ctx.output("reads_to_ref.corrected.tsv"))?);
    writeln!(wtr, "id\tcorrected\toriginal\tsequence")?;
    for read in showcase.reads.iter() {
        let corrected = read.corrected.is_some() as u8;
        let seq = std::str::from_utf8(read.assembly_seq()).unwrap_or("");
        writeln!(wtr, "{}\t{corrected}\t{}\t{seq}", read.id, read.seq)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The whole assembly test: fetch the region, write `<prefix>.local_ref.fa`,
/// run the sweep, write the showcase files, and print the metrics table to `out`.
pub fn assembly_test<R, A, S, W>(
    ctx: &SimulationContext,
    reference: &R,
    aligner: &A,
    assembler: &S,
    out: &mut W,
) -> Result<Vec<CoverageMetric>>
where
    R: ReferenceAccessor + ?Sized,
    A: SequenceAligner,
    S: Assembler,
    W: Write,
{
    let region = ctx.region.as_deref().ok_or(SimError::MissingRegion)?;
    let interval = parse_region(region)?;
    let local_ref = reference.fetch(&interval)?;
    info!("BENCHMARK\tLocalRef\t{interval}\t{}", local_ref.len());
    let quality = match ctx.quality_source.as_ref() {
        Some(path) => QualityPool::from_fastq(path)?,
        None => QualityPool::default(),
    };
    let driver = BenchmarkDriver::new(ctx, local_ref, aligner, assembler)?.with_quality(quality);
    write_fasta(
        ctx.output("local_ref.fa"),
        std::iter::once((LOCAL_REF, driver.local_ref())),
    )?;
    let outcomes = driver.run()?;
    if let Some(showcase) = outcomes.iter().find_map(|o| o.showcase.as_ref()) {
        write_showcase(ctx, showcase)?;
    }
    let metrics: Vec<_> = outcomes.into_iter().map(|o| o.metric).collect();
    write_metrics(out, &metrics)?;
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn sweep_order() {
        let ctx = SimulationContext {
            num_trials: 2,
            coverages: vec![10.0, 20.0],
            snv_rates: vec![0.0, 0.01],
            kmer_corr: vec![false, true],
            ..Default::default()
        };
        let cells = sweep_cells(&ctx);
        assert_eq!(cells.len(), 2 * 2 * 2 * 2);
        assert!(cells.iter().enumerate().all(|(i, c)| c.index == i));
        assert_eq!((cells[0].coverage, cells[0].snv, cells[0].kmer_corr), (10.0, 0.0, false));
        assert_eq!((cells[1].coverage, cells[1].snv, cells[1].kmer_corr), (10.0, 0.0, true));
        assert_eq!(cells[8].trial, 1);
        let showcase: Vec<_> = cells.iter().filter(|c| c.is_showcase()).collect();
        assert_eq!(showcase.len(), 2);
        assert_eq!(showcase[0].index, 7);
    }
    #[test]
    fn metrics_table() {
        let metric = CoverageMetric {
            coverage: 20.0,
            num_reads: 10,
            num_contigs: 1,
            num_final: 1,
            contig_coverage: 1.0,
            kmer_corr: false,
            error_rate: 0.0,
        };
        let mut out = vec![];
        write_metrics(&mut out, &[metric]).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], CoverageMetric::HEADER);
        assert_eq!(lines[1], "20\t10\t1\t1\t1\t0\t0");
    }
}
