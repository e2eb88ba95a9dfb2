//! Pipelines -- run one mode of the benchmark from a resolved [`SimulationContext`].
//!
//! The context comes either from the flags of a subcommand ([`context_from_matches`]) or
//! from a TOML profile given to `pipeline -p`. Both routes end in [`run_pipeline`].
use clap::ArgMatches;
use log::*;
use readsim::config::{parse_rate_list, Mode, SimulationContext};
use readsim::sim_breaks::{simulate_breaks, write_outputs};
use readsim::split_reads::split_reads;
use readsim::{
    assembly_test, ExternalAssembler, FastaReference, KmerCorrectionConfig, Minimap2Aligner,
    Result, SimError,
};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Build the context of `mode` from the flags of its subcommand.
pub fn context_from_matches(mode: Mode, matches: &ArgMatches) -> Result<SimulationContext> {
    let mut ctx = SimulationContext {
        mode,
        verbose: matches.get_count("verbose") as usize,
        ..Default::default()
    };
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        ctx.threads = threads;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        ctx.seed = seed;
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        ctx.prefix = prefix.clone();
    }
    match mode {
        Mode::AssemblyTest | Mode::SimBreaks => simulation_flags(&mut ctx, matches)?,
        Mode::SplitReads => {
            let read1: &String = matches
                .get_one("read1")
                .ok_or_else(|| SimError::invalid("read1", "missing"))?;
            let read2: &String = matches
                .get_one("read2")
                .ok_or_else(|| SimError::invalid("read2", "missing"))?;
            ctx.split_inputs = Some((PathBuf::from(read1), PathBuf::from(read2)));
            if let Some(fractions) = matches.get_one::<String>("fractions") {
                ctx.split_fractions = parse_rate_list("fractions", fractions)?;
            }
        }
    }
    match mode {
        Mode::AssemblyTest => assembly_flags(&mut ctx, matches),
        Mode::SimBreaks => {
            if let Some(&breaks) = matches.get_one::<usize>("num_breaks") {
                ctx.num_rearrangements = breaks;
            }
            if let Some(&indels) = matches.get_one::<usize>("num_indels") {
                ctx.num_indels = indels;
            }
            if let Some(&mean) = matches.get_one::<f64>("insert_mean") {
                ctx.insert_mean = mean;
            }
            if let Some(&sd) = matches.get_one::<f64>("insert_sd") {
                ctx.insert_sd = sd;
            }
        }
        Mode::SplitReads => {}
    }
    Ok(ctx)
}

fn simulation_flags(ctx: &mut SimulationContext, matches: &ArgMatches) -> Result<()> {
    ctx.region = matches.get_one::<String>("region").cloned();
    ctx.reference = matches.get_one::<String>("reference").map(PathBuf::from);
    ctx.quality_source = matches.get_one::<String>("quality").map(PathBuf::from);
    if let Some(&read_len) = matches.get_one::<usize>("read_len") {
        ctx.read_len = read_len;
    }
    let lists = [
        ("coverages", &mut ctx.coverages),
        ("snv_rates", &mut ctx.snv_rates),
        ("ins_rates", &mut ctx.ins_rates),
        ("del_rates", &mut ctx.del_rates),
    ];
    for (name, slot) in lists {
        if let Some(list) = matches.get_one::<String>(name) {
            *slot = parse_rate_list(name, list)?;
        }
    }
    Ok(())
}

fn assembly_flags(ctx: &mut SimulationContext, matches: &ArgMatches) {
    if let Some(&trials) = matches.get_one::<usize>("num_trials") {
        ctx.num_trials = trials;
    }
    ctx.kmer_corr = match matches.get_one::<String>("correction").map(|x| x.as_str()) {
        Some("on") => vec![true],
        Some("off") => vec![false],
        _ => vec![false, true],
    };
    let k = matches.get_one::<usize>("kmer_size").copied();
    let min_count = matches.get_one::<u32>("min_count").copied();
    let default = KmerCorrectionConfig::default();
    ctx.kmer = KmerCorrectionConfig::new(
        k.unwrap_or(default.k),
        min_count.unwrap_or(default.min_count),
        default.max_passes,
    );
    if let Some(&overlap) = matches.get_one::<usize>("min_overlap") {
        ctx.min_overlap = overlap;
    }
    if let Some(id) = matches.get_one::<String>("id") {
        ctx.id = id.clone();
    }
    if let Some(aligner) = matches.get_one::<String>("aligner") {
        ctx.aligner = aligner.clone();
    }
    ctx.assembler = matches.get_one::<String>("assembler").cloned();
    ctx.assembler_args = matches
        .get_many::<String>("assembler_arg")
        .map(|args| args.cloned().collect())
        .unwrap_or_default();
}

pub fn init_logger(verbose: usize) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn set_threads(threads: usize) {
    debug!("Set Threads\t{}", threads);
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        debug!("{:?} The global pool is already built. Harmless.", why);
    }
}

/// Validate the context, then run its mode. The logger should be set up before.
pub fn run_pipeline(ctx: &SimulationContext) -> Result<()> {
    let ctx = ctx.with_resolved_seed();
    ctx.validate()?;
    set_threads(ctx.threads);
    ctx.banner();
    // The resolved profile replays this run through `pipeline -p`.
    let profile = toml::to_string(&ctx).map_err(|why| SimError::invalid("profile", why.to_string()))?;
    std::fs::write(ctx.output("profile.toml"), profile)?;
    debug!("START\t{}", ctx.mode);
    match ctx.mode {
        Mode::AssemblyTest => {
            let reference = open_reference(&ctx)?;
            let aligner = Minimap2Aligner::new(&ctx.aligner, "sr", 1);
            let program = ctx
                .assembler
                .as_deref()
                .ok_or_else(|| SimError::invalid("assembler", "missing"))?;
            let assembler = ExternalAssembler::new(program, &ctx.assembler_args);
            let stdout = std::io::stdout();
            let mut wtr = BufWriter::new(stdout.lock());
            assembly_test(&ctx, &reference, &aligner, &assembler, &mut wtr)?;
            wtr.flush()?;
        }
        Mode::SimBreaks => {
            let reference = open_reference(&ctx)?;
            let output = simulate_breaks(&ctx, &reference)?;
            write_outputs(&ctx, &output)?;
        }
        Mode::SplitReads => {
            let counts = split_reads(&ctx)?;
            for (fraction, count) in ctx.split_fractions.iter().zip(counts.iter()) {
                info!("SPLIT\t{fraction}\t{count}");
            }
        }
    }
    debug!("END\t{}", ctx.mode);
    Ok(())
}

fn open_reference(ctx: &SimulationContext) -> Result<FastaReference> {
    let path = ctx
        .reference
        .as_ref()
        .ok_or_else(|| SimError::invalid("reference", "a reference FASTA is required"))?;
    FastaReference::from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asmbench_commands::asmbench_parser;
    fn sub_matches(args: &[&str]) -> (Mode, ArgMatches) {
        let matches = asmbench_parser().try_get_matches_from(args.iter().copied()).unwrap();
        let (name, sub_m) = matches.subcommand().unwrap();
        (name.parse().unwrap(), sub_m.clone())
    }
    #[test]
    fn assembly_test_flags() {
        let (mode, m) = sub_matches(&[
            "asmbench",
            "assembly-test",
            "-r",
            "chr17:7,565,721-7,575,000",
            "-g",
            "hg19.fa",
            "-c",
            "10,20",
            "-e",
            "0.0,0.01",
            "--correction",
            "on",
            "-k",
            "15",
            "--assembler",
            "asm",
            "--assembler-arg",
            "--fast",
            "-v",
        ]);
        let ctx = context_from_matches(mode, &m).unwrap();
        assert_eq!(ctx.mode, Mode::AssemblyTest);
        assert_eq!(ctx.coverages, vec![10.0, 20.0]);
        assert_eq!(ctx.snv_rates, vec![0.0, 0.01]);
        assert_eq!(ctx.ins_rates, vec![0.05]);
        assert_eq!(ctx.kmer_corr, vec![true]);
        assert_eq!(ctx.kmer.k, 15);
        assert_eq!(ctx.assembler.as_deref(), Some("asm"));
        assert_eq!(ctx.assembler_args, vec!["--fast".to_string()]);
        assert_eq!(ctx.verbose, 1);
        assert!(ctx.validate().is_ok());
    }
    #[test]
    fn bad_rate_is_rejected() {
        let (mode, m) = sub_matches(&[
            "asmbench",
            "sim-breaks",
            "-r",
            "chr1:1-100",
            "-g",
            "x.fa",
            "-e",
            "0.x",
        ]);
        let error = context_from_matches(mode, &m).unwrap_err();
        assert!(error.is_configuration_error());
    }
    #[test]
    fn split_flags() {
        let (mode, m) = sub_matches(&[
            "asmbench",
            "split-reads",
            "-1",
            "a_1.fq",
            "-2",
            "a_2.fq",
            "-f",
            "0.1,0.5",
            "-o",
            "out/a",
        ]);
        let ctx = context_from_matches(mode, &m).unwrap();
        assert_eq!(ctx.split_fractions, vec![0.1, 0.5]);
        assert_eq!(ctx.prefix, "out/a");
        assert!(ctx.validate().is_ok());
    }
}
