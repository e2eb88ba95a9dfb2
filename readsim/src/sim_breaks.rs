//! Breakpoint simulation: mutate a region, then sample paired-end reads from the result.
use crate::config::SimulationContext;
use crate::error::{Result, SimError};
use crate::minimap2::write_fasta;
use crate::mutate_genome::{simulate_genome, MutationConfig};
use crate::quality::QualityPool;
use crate::read_sim::{ErrorProfile, ReadSimConfig, ReadSampler};
use crate::reference::{parse_region, ReferenceAccessor};
use bio::io::fastq;
use definitions::*;
use log::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct SimBreaksOutput {
    pub genome: MutatedGenome,
    pub pairs: Vec<ReadPair>,
}

/// Mutate the region and sample read pairs at the first coverage and error rates of `ctx`.
pub fn simulate_breaks<R: ReferenceAccessor + ?Sized>(
    ctx: &SimulationContext,
    reference: &R,
) -> Result<SimBreaksOutput> {
    let region = ctx.region.as_deref().ok_or(SimError::MissingRegion)?;
    let interval = parse_region(region)?;
    info!("SIMBREAKS\tRegion\t{interval}");
    info!("SIMBREAKS\tBreaks\t{}", ctx.num_rearrangements);
    info!("SIMBREAKS\tIndels\t{}", ctx.num_indels);
    let config = MutationConfig::new(ctx.num_rearrangements, ctx.num_indels, ctx.seed);
    let genome = simulate_genome(reference, &interval, &config)?;
    let quality = match ctx.quality_source.as_ref() {
        Some(path) => QualityPool::from_fastq(path)?,
        None => QualityPool::default(),
    };
    let mut sampler = ReadSampler::with_quality(quality);
    sampler.add_allele(genome.seq(), 1f64)?;
    let first = |xs: &[f64], name: &str| {
        xs.first()
            .copied()
            .ok_or_else(|| SimError::invalid(name, "empty list"))
    };
    let coverage = first(&ctx.coverages, "coverages")?;
    let profile = ErrorProfile::new(
        first(&ctx.snv_rates, "snv-rates")?,
        first(&ctx.ins_rates, "ins-rates")?,
        first(&ctx.del_rates, "del-rates")?,
    )?;
    let read_config = ReadSimConfig::new(coverage, ctx.read_len, profile)
        .with_insert_size(ctx.insert_mean, ctx.insert_sd);
    // The mutation drew from a generator seeded the same way. Step away from it.
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(ctx.seed);
    rng.jump();
    let pairs = sampler
        .sample_pairs(&mut rng, &read_config)?
        .into_items_logged("SimBreaks");
    info!("SIMBREAKS\tPairs\t{}", pairs.len());
    Ok(SimBreaksOutput { genome, pairs })
}

/// Write every artifact of the breakpoint simulation next to `<prefix>`.
pub fn write_outputs(ctx: &SimulationContext, output: &SimBreaksOutput) -> Result<()> {
    let genome = &output.genome;
    let mut wtr = BufWriter::new(std::fs::File::create(ctx.output("indels.tsv"))?);
    for row in genome.indel_rows() {
        writeln!(wtr, "{row}")?;
    }
    wtr.flush()?;
    std::fs::write(ctx.output("connections.tsv"), genome.breakpoint_report())?;
    let mut wtr = BufWriter::new(std::fs::File::create(ctx.output("genome.json"))?);
    serde_json::to_writer_pretty(&mut wtr, genome)?;
    wtr.flush()?;
    let name = genome.interval.to_string();
    write_fasta(ctx.output("mutated.fa"), std::iter::once((name.as_str(), genome.seq())))?;
    let (pe1, pe2) = (ctx.output("paired_end1.fastq"), ctx.output("paired_end2.fastq"));
    write_fastq(&pe1, output.pairs.iter().map(|p| &p.read1))?;
    write_fastq(&pe2, output.pairs.iter().map(|p| &p.read2))?;
    info!(
        "SIMBREAKS\tSuggest\tminimap2 -ax sr <reference.fa> {} {} | samtools sort -o {}.bam",
        pe1.display(),
        pe2.display(),
        ctx.prefix
    );
    Ok(())
}

/// FASTQ with `@r<index>` headers, 0-based.
pub fn write_fastq<'a, P, I>(path: P, reads: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a SampledRead>,
{
    let mut wtr = fastq::Writer::to_file(path)?;
    for (i, read) in reads.into_iter().enumerate() {
        wtr.write(&format!("r{i}"), None, read.seq(), read.qual())?;
    }
    wtr.flush()?;
    Ok(())
}
