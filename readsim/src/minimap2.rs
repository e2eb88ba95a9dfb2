//! Sequence alignment through minimap2, and PAF parsing.
use crate::error::{Result, SimError};
use bio::io::fasta;
use definitions::*;
use log::*;
use std::collections::HashSet;
use std::path::Path;

/// Maps named sequences onto one reference sequence.
pub trait SequenceAligner: Sync {
    /// Zero or more hits per query. Queries without a hit are simply absent.
    fn align(
        &self,
        reference: (&str, &[u8]),
        queries: &[(String, Vec<u8>)],
    ) -> Result<Vec<AlignmentRecord>>;
}

/// Spawns `minimap2 -c` on temporary FASTA files.
#[derive(Debug, Clone)]
pub struct Minimap2Aligner {
    program: String,
    preset: String,
    threads: usize,
}

impl Default for Minimap2Aligner {
    fn default() -> Self {
        Self::new("minimap2", "sr", 1)
    }
}

impl Minimap2Aligner {
    pub fn new(program: &str, preset: &str, threads: usize) -> Self {
        Self {
            program: program.to_string(),
            preset: preset.to_string(),
            threads,
        }
    }
}

impl SequenceAligner for Minimap2Aligner {
    fn align(
        &self,
        reference: (&str, &[u8]),
        queries: &[(String, Vec<u8>)],
    ) -> Result<Vec<AlignmentRecord>> {
        if queries.is_empty() {
            return Ok(vec![]);
        }
        let dir = tempfile::tempdir()?;
        let target = dir.path().join("target.fa");
        let query = dir.path().join("query.fa");
        write_fasta(&target, std::iter::once(reference))?;
        write_fasta(&query, queries.iter().map(|(id, seq)| (id.as_str(), seq.as_slice())))?;
        let thr = format!("{}", self.threads);
        let args = ["-c", "-x", self.preset.as_str(), "-t", thr.as_str()];
        trace!("MINIMAP2\tArgs\t{args:?}");
        let aln = std::process::Command::new(&self.program)
            .args(args)
            .arg(&target)
            .arg(&query)
            .output()
            .map_err(|why| SimError::Aligner(format!("{}: {why}", self.program)))?;
        if !aln.status.success() {
            let stderr = String::from_utf8_lossy(&aln.stderr);
            return Err(SimError::Aligner(format!("{}: {stderr}", self.program)));
        }
        parse_paf(&aln.stdout)
    }
}

pub fn write_fasta<'a, P, I>(path: P, records: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut wtr = fasta::Writer::to_file(path)?;
    for (id, seq) in records {
        wtr.write(id, None, seq)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parse the twelve mandatory PAF columns of each line. Optional tags are ignored.
pub fn parse_paf(paf: &[u8]) -> Result<Vec<AlignmentRecord>> {
    let paf = String::from_utf8_lossy(paf);
    paf.lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_paf_line)
        .collect()
}

fn parse_paf_line(line: &str) -> Result<AlignmentRecord> {
    let fields: Vec<_> = line.split('\t').collect();
    let bad = |why: String| SimError::Aligner(format!("Malformed PAF line {line}: {why}"));
    if fields.len() < 12 {
        return Err(bad(format!("{} columns", fields.len())));
    }
    let num = |i: usize| -> Result<usize> {
        fields[i]
            .parse()
            .map_err(|e: std::num::ParseIntError| bad(e.to_string()))
    };
    let strand = match fields[4] {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        other => return Err(bad(format!("strand {other}"))),
    };
    Ok(AlignmentRecord {
        query: fields[0].to_string(),
        query_len: num(1)?,
        query_start: num(2)?,
        query_end: num(3)?,
        strand,
        target: fields[5].to_string(),
        target_len: num(6)?,
        target_start: num(7)?,
        target_end: num(8)?,
        matches: num(9)?,
        block_len: num(10)?,
        mapq: num(11)?.min(u8::MAX as usize) as u8,
    })
}

/// Keep the first hit of every query, in input order.
pub fn first_hits(hits: Vec<AlignmentRecord>) -> Vec<AlignmentRecord> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.query.clone()))
        .collect()
}
