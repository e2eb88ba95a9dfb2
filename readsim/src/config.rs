//! The simulation context -- every user-settable parameter of a run.
//!
//! The context is built once, from command line flags or a TOML profile, validated, and then
//! passed by reference into every stage. Nothing in the crate keeps global mutable state.
use crate::error::{Result, SimError};
use crate::kmer_correction::KmerCorrectionConfig;
use log::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    AssemblyTest,
    SimBreaks,
    SplitReads,
}

impl std::str::FromStr for Mode {
    type Err = SimError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "assembly-test" => Ok(Mode::AssemblyTest),
            "sim-breaks" => Ok(Mode::SimBreaks),
            "split-reads" => Ok(Mode::SplitReads),
            _ => Err(SimError::invalid("mode", format!("unknown mode {s}"))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mode = match self {
            Mode::AssemblyTest => "assembly-test",
            Mode::SimBreaks => "sim-breaks",
            Mode::SplitReads => "split-reads",
        };
        write!(f, "{mode}")
    }
}

/// Largest seed a TOML profile can hold. TOML integers are signed 64 bit.
pub const MAX_SEED: u64 = i64::MAX as u64;

/// The configuration of a run.
/// Unset fields in a TOML profile take the defaults below.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SimulationContext {
    pub mode: Mode,
    /// 0 means "take it from the clock". See [`SimulationContext::resolve_seed`].
    /// At most [`MAX_SEED`].
    pub seed: u64,
    pub threads: usize,
    pub verbose: usize,
    /// A BED file or a locus string.
    pub region: Option<String>,
    /// Indexed FASTA of the reference genome.
    pub reference: Option<PathBuf>,
    /// Output files are named `<prefix>.<artifact>`.
    pub prefix: String,
    /// Identifier handed to the assembler.
    pub id: String,
    pub read_len: usize,
    pub coverages: Vec<f64>,
    pub snv_rates: Vec<f64>,
    pub ins_rates: Vec<f64>,
    pub del_rates: Vec<f64>,
    /// Which correction settings to sweep over.
    pub kmer_corr: Vec<bool>,
    pub num_trials: usize,
    /// Insert size of the breakpoint simulation.
    pub insert_mean: f64,
    pub insert_sd: f64,
    /// Insert size inside the assembly sweep.
    pub assembly_insert_mean: f64,
    pub assembly_insert_sd: f64,
    pub num_rearrangements: usize,
    pub num_indels: usize,
    pub kmer: KmerCorrectionConfig,
    pub min_overlap: usize,
    /// FASTQ file to learn quality strings from.
    pub quality_source: Option<PathBuf>,
    pub aligner: String,
    pub assembler: Option<String>,
    pub assembler_args: Vec<String>,
    /// Paired FASTQ input of `split-reads`.
    pub split_inputs: Option<(PathBuf, PathBuf)>,
    pub split_fractions: Vec<f64>,
}

impl Default for SimulationContext {
    fn default() -> Self {
        Self {
            mode: Mode::AssemblyTest,
            seed: 0,
            threads: 1,
            verbose: 0,
            region: None,
            reference: None,
            prefix: "noid".to_string(),
            id: "noid".to_string(),
            read_len: 101,
            coverages: vec![10.0],
            snv_rates: vec![0.01],
            ins_rates: vec![0.05],
            del_rates: vec![0.05],
            kmer_corr: vec![false, true],
            num_trials: 100,
            insert_mean: 250.0,
            insert_sd: 50.0,
            assembly_insert_mean: 350.0,
            assembly_insert_sd: 50.0,
            num_rearrangements: 10,
            num_indels: 10,
            kmer: KmerCorrectionConfig::default(),
            min_overlap: crate::assembler::DEFAULT_MIN_OVERLAP,
            quality_source: None,
            aligner: "minimap2".to_string(),
            assembler: None,
            assembler_args: vec![],
            split_inputs: None,
            split_fractions: vec![],
        }
    }
}

impl SimulationContext {
    pub fn from_toml_str(profile: &str) -> Result<Self> {
        Ok(toml::from_str(profile)?)
    }
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let profile = std::fs::read_to_string(path)?;
        Self::from_toml_str(&profile)
    }
    /// The output path of one artifact.
    pub fn output(&self, artifact: &str) -> PathBuf {
        PathBuf::from(format!("{}.{artifact}", self.prefix))
    }
    /// The seed to use: `seed` itself, or one taken from the clock when it is 0.
    pub fn resolve_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64 & MAX_SEED)
            .unwrap_or(1);
        now.max(1)
    }
    /// A copy with the seed fixed, so the run can be replayed.
    pub fn with_resolved_seed(&self) -> Self {
        let seed = self.resolve_seed();
        if self.seed == 0 {
            info!("CONFIG\tSeed\t{seed}\tFrom the clock");
        }
        Self {
            seed,
            ..self.clone()
        }
    }
    /// Check every value before any simulation work starts.
    pub fn validate(&self) -> Result<()> {
        if MAX_SEED < self.seed {
            return Err(SimError::invalid("seed", format!("{} is above {MAX_SEED}", self.seed)));
        }
        let lists = [
            ("snv-rates", &self.snv_rates),
            ("ins-rates", &self.ins_rates),
            ("del-rates", &self.del_rates),
        ];
        for (name, rates) in lists {
            if rates.is_empty() {
                return Err(SimError::invalid(name, "empty list"));
            }
            if let Some(rate) = rates.iter().find(|r| !(0f64..=1f64).contains(*r)) {
                return Err(SimError::invalid(name, format!("{rate} is not in [0,1]")));
            }
        }
        if self.coverages.is_empty() {
            return Err(SimError::invalid("coverages", "empty list"));
        }
        if let Some(c) = self.coverages.iter().find(|&&c| !(c > 0f64 && c.is_finite())) {
            return Err(SimError::invalid("coverages", format!("{c} is not positive")));
        }
        if self.kmer_corr.is_empty() {
            return Err(SimError::invalid("kmer-corr", "empty list"));
        }
        if self.read_len == 0 {
            return Err(SimError::invalid("read-len", "must be positive"));
        }
        if self.num_trials == 0 {
            return Err(SimError::invalid("num-trials", "must be positive"));
        }
        if !crate::kmer::is_valid_k(self.kmer.k) {
            let reason = format!("k={} not in 1..={}", self.kmer.k, crate::kmer::MAX_K);
            return Err(SimError::invalid("kmer", reason));
        }
        let inserts = [
            ("insert", self.insert_mean, self.insert_sd),
            ("assembly-insert", self.assembly_insert_mean, self.assembly_insert_sd),
        ];
        for (name, mean, sd) in inserts {
            if !(mean > 0f64 && mean.is_finite() && sd >= 0f64 && sd.is_finite()) {
                return Err(SimError::invalid(name, format!("{mean}+-{sd}")));
            }
        }
        if self.threads == 0 {
            return Err(SimError::invalid("threads", "must be positive"));
        }
        match self.mode {
            Mode::AssemblyTest | Mode::SimBreaks => {
                if self.region.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(SimError::MissingRegion);
                }
                if self.reference.is_none() {
                    return Err(SimError::invalid("reference", "a reference FASTA is required"));
                }
            }
            Mode::SplitReads => {
                if self.split_inputs.is_none() {
                    return Err(SimError::invalid("input", "two FASTQ files are required"));
                }
                crate::split_reads::check_fractions(&self.split_fractions)?;
            }
        }
        if self.mode == Mode::AssemblyTest && self.assembler.is_none() {
            return Err(SimError::invalid("assembler", "an assembler program is required"));
        }
        Ok(())
    }
    /// Log the parameters of the run before any work.
    pub fn banner(&self) {
        info!("CONFIG\tMode\t{}", self.mode);
        info!("CONFIG\tSeed\t{}", self.seed);
        info!("CONFIG\tRegion\t{}", self.region.as_deref().unwrap_or("-"));
        info!("CONFIG\tCoverages\t{}", join(&self.coverages));
        info!("CONFIG\tSNV\t{}", join(&self.snv_rates));
        info!("CONFIG\tInsertion\t{}", join(&self.ins_rates));
        info!("CONFIG\tDeletion\t{}", join(&self.del_rates));
        info!("CONFIG\tReadLen\t{}", self.read_len);
        match self.mode {
            Mode::SimBreaks => info!("CONFIG\tInsert\t{}\t{}", self.insert_mean, self.insert_sd),
            _ => info!(
                "CONFIG\tInsert\t{}\t{}",
                self.assembly_insert_mean, self.assembly_insert_sd
            ),
        }
    }
}

fn join(xs: &[f64]) -> String {
    xs.iter().map(|x| x.to_string()).collect::<Vec<_>>().join(",")
}

/// Parse a comma-separated list of numbers, like `0.01,0.02,0.05`.
pub fn parse_rate_list(name: &str, list: &str) -> Result<Vec<f64>> {
    let rates: Vec<f64> = list
        .split(',')
        .map(|x| {
            x.trim()
                .parse::<f64>()
                .map_err(|why| SimError::invalid(name, format!("'{x}' in {list}: {why}")))
        })
        .collect::<Result<_>>()?;
    match rates.iter().any(|r| r.is_nan()) {
        true => Err(SimError::invalid(name, format!("NaN in {list}"))),
        false => Ok(rates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn runnable() -> SimulationContext {
        SimulationContext {
            region: Some("chr17:7565721-7575000".to_string()),
            reference: Some(PathBuf::from("hg19.fa")),
            assembler: Some("asm".to_string()),
            ..Default::default()
        }
    }
    #[test]
    fn defaults() {
        let ctx = SimulationContext::default();
        assert_eq!(ctx.snv_rates, vec![0.01]);
        assert_eq!(ctx.del_rates, vec![0.05]);
        assert_eq!(ctx.ins_rates, vec![0.05]);
        assert_eq!(ctx.coverages, vec![10.0]);
        assert_eq!(ctx.read_len, 101);
        assert_eq!(ctx.num_trials, 100);
        assert_eq!((ctx.insert_mean, ctx.insert_sd), (250.0, 50.0));
        assert_eq!((ctx.assembly_insert_mean, ctx.assembly_insert_sd), (350.0, 50.0));
        assert_eq!((ctx.num_rearrangements, ctx.num_indels), (10, 10));
        assert_eq!(ctx.id, "noid");
        assert!(runnable().validate().is_ok());
    }
    #[test]
    fn rate_lists() {
        assert_eq!(parse_rate_list("snv", "0.01, 0.02,0.5").unwrap(), vec![0.01, 0.02, 0.5]);
        assert!(matches!(
            parse_rate_list("snv", "0.01,abc"),
            Err(SimError::InvalidParameter { .. })
        ));
        assert!(parse_rate_list("snv", "").is_err());
        assert!(parse_rate_list("snv", "NaN").is_err());
    }
    #[test]
    fn validation() {
        let bad_rate = SimulationContext {
            snv_rates: vec![0.01, 1.5],
            ..runnable()
        };
        assert!(bad_rate.validate().unwrap_err().is_configuration_error());
        let no_region = SimulationContext {
            region: None,
            ..runnable()
        };
        assert!(matches!(no_region.validate(), Err(SimError::MissingRegion)));
        let bad_k = SimulationContext {
            kmer: KmerCorrectionConfig::new(33, 3, 10),
            ..runnable()
        };
        assert!(bad_k.validate().is_err());
        let zero_coverage = SimulationContext {
            coverages: vec![0.0],
            ..runnable()
        };
        assert!(zero_coverage.validate().is_err());
        let split = SimulationContext {
            mode: Mode::SplitReads,
            split_inputs: Some((PathBuf::from("r1.fq"), PathBuf::from("r2.fq"))),
            split_fractions: vec![0.6, 0.6],
            ..Default::default()
        };
        assert!(split.validate().is_err());
    }
    #[test]
    fn toml_profile() {
        let profile = r#"
mode = "sim-breaks"
seed = 42
region = "chr17:7565721-7575000"
reference = "hg19.fa"
coverages = [10.0, 20.0]
"#;
        let ctx = SimulationContext::from_toml_str(profile).unwrap();
        assert_eq!(ctx.mode, Mode::SimBreaks);
        assert_eq!(ctx.seed, 42);
        assert_eq!(ctx.coverages, vec![10.0, 20.0]);
        assert_eq!(ctx.read_len, 101);
        assert!(ctx.validate().is_ok());
        assert_eq!(ctx.output("indels.tsv"), PathBuf::from("noid.indels.tsv"));
        assert!(SimulationContext::from_toml_str("seed = \"x\"").is_err());
    }
    #[test]
    fn seeds() {
        let ctx = SimulationContext {
            seed: 7,
            ..Default::default()
        };
        assert_eq!(ctx.resolve_seed(), 7);
        let clock = SimulationContext::default().with_resolved_seed();
        assert_ne!(clock.seed, 0);
        assert_eq!("sim-breaks".parse::<Mode>().unwrap(), Mode::SimBreaks);
        assert!("split-bam".parse::<Mode>().is_err());
        assert!(clock.seed <= MAX_SEED);
    }
    #[test]
    fn seeds_fit_in_a_profile() {
        let too_large = SimulationContext {
            seed: u64::MAX,
            ..runnable()
        };
        assert!(too_large.validate().unwrap_err().is_configuration_error());
        let largest = SimulationContext {
            seed: MAX_SEED,
            ..runnable()
        };
        assert!(largest.validate().is_ok());
        let profile = toml::to_string(&largest).unwrap();
        let restored = SimulationContext::from_toml_str(&profile).unwrap();
        assert_eq!(restored, largest);
    }
}
