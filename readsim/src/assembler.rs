//! The assembler collaborator.
use crate::error::{Result, SimError};
use crate::minimap2::write_fasta;
use bio::io::fasta;
use definitions::Contig;
use log::*;
use serde::{Deserialize, Serialize};

/// Error rate handed to the assembler when reads were k-mer corrected.
pub const CORRECTED_ERROR_RATE: f64 = 0.0;
/// Error rate handed to the assembler for raw reads.
pub const RAW_ERROR_RATE: f64 = 0.05;
pub const DEFAULT_MIN_OVERLAP: usize = 35;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssemblerConfig {
    pub id: String,
    pub error_rate: f64,
    pub min_overlap: usize,
    pub read_len: usize,
}

impl AssemblerConfig {
    pub fn new(id: &str, error_rate: f64, min_overlap: usize, read_len: usize) -> Self {
        Self {
            id: id.to_string(),
            error_rate,
            min_overlap,
            read_len,
        }
    }
    /// Error rate follows whether the reads were corrected.
    pub fn for_reads(id: &str, kmer_corr: bool, min_overlap: usize, read_len: usize) -> Self {
        let error_rate = match kmer_corr {
            true => CORRECTED_ERROR_RATE,
            false => RAW_ERROR_RATE,
        };
        Self::new(id, error_rate, min_overlap, read_len)
    }
}

pub trait Assembler: Sync {
    /// Contigs built from `reads`. Zero contigs is a valid outcome.
    fn assemble(&self, config: &AssemblerConfig, reads: &[(String, Vec<u8>)])
        -> Result<Vec<Contig>>;
}

/// An assembler program run as
/// `<program> [args] -i <id> -e <error rate> -m <min overlap> -l <read len> <reads.fa>`,
/// printing contigs as FASTA on stdout.
#[derive(Debug, Clone)]
pub struct ExternalAssembler {
    program: String,
    args: Vec<String>,
}

impl ExternalAssembler {
    pub fn new(program: &str, args: &[String]) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
        }
    }
}

impl Assembler for ExternalAssembler {
    fn assemble(
        &self,
        config: &AssemblerConfig,
        reads: &[(String, Vec<u8>)],
    ) -> Result<Vec<Contig>> {
        if reads.is_empty() {
            return Ok(vec![]);
        }
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reads.fa");
        write_fasta(&path, reads.iter().map(|(id, seq)| (id.as_str(), seq.as_slice())))?;
        let out = std::process::Command::new(&self.program)
            .args(&self.args)
            .args(["-i", config.id.as_str()])
            .arg("-e")
            .arg(config.error_rate.to_string())
            .arg("-m")
            .arg(config.min_overlap.to_string())
            .arg("-l")
            .arg(config.read_len.to_string())
            .arg(&path)
            .output()
            .map_err(|why| SimError::Assembler(format!("{}: {why}", self.program)))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(SimError::Assembler(format!("{}: {stderr}", self.program)));
        }
        let contigs = parse_contigs(&out.stdout)?;
        debug!("ASSEMBLE\t{}\t{}\t{}", config.id, reads.len(), contigs.len());
        Ok(contigs)
    }
}

pub fn parse_contigs(fasta: &[u8]) -> Result<Vec<Contig>> {
    fasta::Reader::new(fasta)
        .records()
        .map(|record| -> Result<Contig> {
            let record = record.map_err(|why| SimError::Assembler(why.to_string()))?;
            Ok(Contig {
                id: record.id().to_string(),
                seq: definitions::seq_to_string(record.seq().to_vec()),
            })
        })
        .collect()
}
