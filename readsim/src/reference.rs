//! Read-only access to reference sequences, and region parsing.
use crate::error::{Result, SimError};
use bio::io::fasta;
use definitions::ReferenceInterval;
use log::*;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Mutex;

/// Bases of a reference interval. Intervals running past the chromosome end are clipped.
pub trait ReferenceAccessor {
    fn fetch(&self, interval: &ReferenceInterval) -> Result<Vec<u8>>;
}

/// Whole chromosomes held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    chroms: HashMap<String, Vec<u8>>,
}

impl InMemoryReference {
    pub fn new(chroms: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            chroms: chroms.into_iter().collect(),
        }
    }
    /// Load every record of a (possibly unindexed) FASTA file.
    pub fn from_fasta<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let reader = fasta::Reader::from_file(&path)
            .map_err(|why| SimError::Reference(format!("{path:?}: {why}")))?;
        let mut chroms = HashMap::new();
        for record in reader.records() {
            let record = record?;
            chroms.insert(record.id().to_string(), record.seq().to_vec());
        }
        debug!("REFERENCE\tLoaded\t{:?}\t{}", path, chroms.len());
        Ok(Self { chroms })
    }
    pub fn len(&self) -> usize {
        self.chroms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }
}

impl ReferenceAccessor for InMemoryReference {
    fn fetch(&self, interval: &ReferenceInterval) -> Result<Vec<u8>> {
        let chrom = self
            .chroms
            .get(&interval.chrom)
            .ok_or_else(|| SimError::ReferenceNotFound {
                chrom: interval.chrom.clone(),
            })?;
        let end = (interval.end as usize).min(chrom.len());
        let start = (interval.start as usize).min(end);
        Ok(chrom[start..end].to_vec())
    }
}

/// A FASTA file with a `.fai` index next to it.
pub struct FastaReference {
    reader: Mutex<fasta::IndexedReader<File>>,
    lengths: HashMap<String, u64>,
}

impl FastaReference {
    pub fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        let reader = fasta::IndexedReader::from_file(&path).map_err(|why| {
            SimError::Reference(format!("{path:?}: {why}. Is there a .fai index?"))
        })?;
        let lengths = reader
            .index
            .sequences()
            .into_iter()
            .map(|seq| (seq.name, seq.len))
            .collect();
        Ok(Self {
            reader: Mutex::new(reader),
            lengths,
        })
    }
}

impl ReferenceAccessor for FastaReference {
    fn fetch(&self, interval: &ReferenceInterval) -> Result<Vec<u8>> {
        let &len = self
            .lengths
            .get(&interval.chrom)
            .ok_or_else(|| SimError::ReferenceNotFound {
                chrom: interval.chrom.clone(),
            })?;
        let end = interval.end.min(len);
        let start = interval.start.min(end);
        if end < interval.end {
            warn!("REFERENCE\tClipped\t{interval}\t{end}");
        }
        let mut seq = Vec::with_capacity((end - start) as usize);
        let mut reader = self
            .reader
            .lock()
            .map_err(|_| SimError::Reference("reader lock poisoned".to_string()))?;
        reader.fetch(&interval.chrom, start, end)?;
        reader.read(&mut seq)?;
        Ok(seq)
    }
}

/// A region is a BED file (first record is used) or a locus like `chr17:7,565,721-7,575,000`
/// (1-based, inclusive).
pub fn parse_region(region: &str) -> Result<ReferenceInterval> {
    let region = region.trim();
    if region.is_empty() {
        return Err(SimError::MissingRegion);
    }
    let path = Path::new(region);
    match path.is_file() {
        true => read_bed(path),
        false => parse_locus(region),
    }
}

pub fn parse_locus(locus: &str) -> Result<ReferenceInterval> {
    let bad = |reason: &str| SimError::invalid("region", format!("{locus}: {reason}"));
    let (chrom, range) = locus
        .rsplit_once(':')
        .ok_or_else(|| bad("expected chrom:start-end"))?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| bad("expected chrom:start-end"))?;
    let parse = |x: &str| x.replace(',', "").trim().parse::<u64>();
    let start = parse(start).map_err(|why| bad(&why.to_string()))?;
    let end = parse(end).map_err(|why| bad(&why.to_string()))?;
    if chrom.is_empty() || start == 0 || end < start {
        return Err(bad("empty or inverted range"));
    }
    Ok(ReferenceInterval::new(chrom, start - 1, end))
}

pub fn read_bed<P: AsRef<Path>>(path: P) -> Result<ReferenceInterval> {
    let path = path.as_ref();
    let rdr = BufReader::new(File::open(path)?);
    for line in rdr.lines() {
        let line = line?;
        let skip = ["#", "track", "browser"];
        if line.trim().is_empty() || skip.iter().any(|p| line.starts_with(p)) {
            continue;
        }
        let fields: Vec<_> = line.split('\t').collect();
        let bad = |reason: String| SimError::invalid("region", format!("{path:?}: {reason}"));
        if fields.len() < 3 {
            return Err(bad(format!("too few fields in {line}")));
        }
        let start: u64 = fields[1].trim().parse().map_err(|e| bad(format!("{e}")))?;
        let end: u64 = fields[2].trim().parse().map_err(|e| bad(format!("{e}")))?;
        if end <= start {
            return Err(bad(format!("empty interval in {line}")));
        }
        return Ok(ReferenceInterval::new(fields[0], start, end));
    }
    Err(SimError::MissingRegion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    #[test]
    fn locus() {
        let interval = parse_locus("chr17:7,565,721-7,575,000").unwrap();
        assert_eq!(interval, ReferenceInterval::new("chr17", 7565720, 7575000));
        assert_eq!(interval.len(), 9280);
        assert!(parse_locus("chr17").is_err());
        assert!(parse_locus("chr17:100-50").is_err());
        assert!(parse_locus("chr17:0-50").is_err());
        assert!(parse_locus("chr17:x-50").is_err());
        assert!(matches!(parse_region("  "), Err(SimError::MissingRegion)));
    }
    #[test]
    fn bed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region.bed");
        let mut wtr = File::create(&path).unwrap();
        writeln!(wtr, "track name=test\n# comment\nchr2\t100\t300\tname\nchr3\t0\t10").unwrap();
        drop(wtr);
        let interval = parse_region(path.to_str().unwrap()).unwrap();
        assert_eq!(interval, ReferenceInterval::new("chr2", 100, 300));
        let empty = dir.path().join("empty.bed");
        File::create(&empty).unwrap();
        assert!(matches!(read_bed(&empty), Err(SimError::MissingRegion)));
    }
    #[test]
    fn in_memory_fetch() {
        let refr = InMemoryReference::new(vec![("1".to_string(), b"ACGTACGTAA".to_vec())]);
        assert_eq!(refr.fetch(&ReferenceInterval::new("1", 2, 6)).unwrap(), b"GTAC");
        assert_eq!(refr.fetch(&ReferenceInterval::new("1", 8, 20)).unwrap(), b"AA");
        assert!(refr.fetch(&ReferenceInterval::new("1", 20, 30)).unwrap().is_empty());
        assert!(matches!(
            refr.fetch(&ReferenceInterval::new("2", 0, 3)),
            Err(SimError::ReferenceNotFound { .. })
        ));
    }
    #[test]
    fn fasta_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.fa");
        let mut wtr = File::create(&path).unwrap();
        writeln!(wtr, ">chrA\nACGTACGTAC\nGGGGCCCC\n>chrB\nTTTT").unwrap();
        drop(wtr);
        let refr = InMemoryReference::from_fasta(&path).unwrap();
        assert_eq!(refr.len(), 2);
        let interval = ReferenceInterval::new("chrA", 8, 12);
        assert_eq!(refr.fetch(&interval).unwrap(), b"ACGG");
        // Without .fai the indexed reader refuses to open.
        assert!(FastaReference::from_file(&path).is_err());
        let mut fai = File::create(dir.path().join("ref.fa.fai")).unwrap();
        writeln!(fai, "chrA\t18\t6\t10\t11\nchrB\t4\t32\t4\t5").unwrap();
        drop(fai);
        let indexed = FastaReference::from_file(&path).unwrap();
        assert_eq!(indexed.fetch(&interval).unwrap(), b"ACGG");
        assert_eq!(
            indexed.fetch(&ReferenceInterval::new("chrB", 1, 100)).unwrap(),
            b"TTT"
        );
    }
}
