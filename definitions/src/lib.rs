//! Definitions -- the shared data model of the assembly benchmark.
//! Every structure here is plain data: simulation stages hand them to each other, and
//! the binary dumps them to JSON or TSV. Sequences are kept as `String` on an alphabet of
//! A,C,G,T,N and exposed as bytes through `seq()` accessors.

use serde::{Deserialize, Serialize};

/// Convert an owned byte sequence into the `String` representation used in this crate.
/// Bases are ASCII, so the lossy path is only taken for corrupted input.
pub fn seq_to_string(seq: Vec<u8>) -> String {
    match String::from_utf8(seq) {
        Ok(seq) => seq,
        Err(why) => String::from_utf8_lossy(why.as_bytes()).into_owned(),
    }
}

/// A genomic interval. 0-based, half-open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ReferenceInterval {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl ReferenceInterval {
    pub fn new(chrom: &str, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.to_string(),
            start,
            end,
        }
    }
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for ReferenceInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn is_forward(&self) -> bool {
        *self == Strand::Forward
    }
    pub fn flip(&self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}

/// A piece of the reference placed into the mutated sequence.
/// `start..end` is relative to the start of the reference interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentSpan {
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl SegmentSpan {
    pub fn new(start: usize, end: usize, strand: Strand) -> Self {
        Self { start, end, strand }
    }
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
    /// The reference coordinate at which reading of this segment begins.
    pub fn entry(&self) -> usize {
        match self.strand {
            Strand::Forward => self.start,
            Strand::Reverse => self.end,
        }
    }
    /// The reference coordinate at which reading of this segment stops.
    pub fn exit(&self) -> usize {
        match self.strand {
            Strand::Forward => self.end,
            Strand::Reverse => self.start,
        }
    }
}

/// The class of a rearrangement junction, named after the SV that would produce it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JunctionType {
    /// Same strand, jumping forward over reference bases.
    DeletionLike,
    /// Same strand, jumping backward.
    DuplicationLike,
    /// The strand changes across the junction.
    Inversion,
    /// The two segments happen to be reference-adjacent.
    Reference,
}

impl std::fmt::Display for JunctionType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            JunctionType::DeletionLike => "DEL",
            JunctionType::DuplicationLike => "DUP",
            JunctionType::Inversion => "INV",
            JunctionType::Reference => "REF",
        };
        write!(f, "{name}")
    }
}

/// A rearrangement junction: the upstream segment is immediately followed by the downstream
/// segment in the mutated sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakpointRecord {
    pub upstream: SegmentSpan,
    pub downstream: SegmentSpan,
    /// 0-based position in the mutated sequence of the first base after the junction.
    pub post: usize,
    pub junction: JunctionType,
}

impl BreakpointRecord {
    pub fn new(upstream: SegmentSpan, downstream: SegmentSpan, post: usize) -> Self {
        let junction = if upstream.strand != downstream.strand {
            JunctionType::Inversion
        } else if upstream.exit() == downstream.entry() {
            JunctionType::Reference
        } else {
            let forward_jump = upstream.exit() < downstream.entry();
            match (upstream.strand, forward_jump) {
                (Strand::Forward, true) | (Strand::Reverse, false) => JunctionType::DeletionLike,
                _ => JunctionType::DuplicationLike,
            }
        };
        Self {
            upstream,
            downstream,
            post,
            junction,
        }
    }
    /// The pre-edit coordinate pair: where the reference is left, and where it is re-entered.
    pub fn pre(&self) -> (usize, usize) {
        (self.upstream.exit(), self.downstream.entry())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndelType {
    Insertion,
    Deletion,
}

impl std::fmt::Display for IndelType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            IndelType::Insertion => write!(f, "INS"),
            IndelType::Deletion => write!(f, "DEL"),
        }
    }
}

/// A short indel. `position` is relative to the reference interval start:
/// an insertion goes in front of the base at `position`, a deletion removes
/// `position..position + length`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndelRecord {
    pub position: usize,
    pub length: usize,
    pub indel_type: IndelType,
    /// Inserted bases. Empty for deletions.
    pub content: String,
}

impl IndelRecord {
    pub fn insertion(position: usize, content: String) -> Self {
        Self {
            position,
            length: content.len(),
            indel_type: IndelType::Insertion,
            content,
        }
    }
    pub fn deletion(position: usize, length: usize) -> Self {
        Self {
            position,
            length,
            indel_type: IndelType::Deletion,
            content: String::new(),
        }
    }
    /// The reference bases this record touches. Insertions touch the single base they precede.
    pub fn reference_span(&self) -> std::ops::Range<usize> {
        match self.indel_type {
            IndelType::Insertion => self.position..self.position + 1,
            IndelType::Deletion => self.position..self.position + self.length,
        }
    }
}

/// A reference interval after simulated rearrangements and indels, together with its ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutatedGenome {
    pub interval: ReferenceInterval,
    pub seq: String,
    /// Junctions in the order they appear along the mutated sequence.
    pub breakpoints: Vec<BreakpointRecord>,
    /// Indels sorted by reference position.
    pub indels: Vec<IndelRecord>,
}

impl MutatedGenome {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
    /// The order in which reference segments are laid out in the mutated sequence.
    pub fn layout(&self) -> Vec<SegmentSpan> {
        match self.breakpoints.first() {
            Some(first) => std::iter::once(first.upstream)
                .chain(self.breakpoints.iter().map(|bp| bp.downstream))
                .collect(),
            None => {
                let len = self.interval.len() as usize;
                vec![SegmentSpan::new(0, len, Strand::Forward)]
            }
        }
    }
    /// One tab-separated row per indel: chrom, absolute position, type, length, content.
    pub fn indel_rows(&self) -> impl Iterator<Item = String> + '_ {
        self.indels.iter().map(move |indel| {
            let content = if indel.content.is_empty() {
                "."
            } else {
                indel.content.as_str()
            };
            format!(
                "{}\t{}\t{}\t{}\t{}",
                self.interval.chrom,
                self.interval.start + indel.position as u64,
                indel.indel_type,
                indel.length,
                content
            )
        })
    }
    /// Human-readable junction report, one line per breakpoint.
    pub fn breakpoint_report(&self) -> String {
        let chrom = &self.interval.chrom;
        let offset = self.interval.start as usize;
        self.breakpoints
            .iter()
            .enumerate()
            .map(|(i, bp)| {
                let (left, right) = bp.pre();
                format!(
                    "junction_{}\t{chrom}:{}({})\t->\t{chrom}:{}({})\t{}\tpost={}\n",
                    i + 1,
                    left + offset,
                    bp.upstream.strand,
                    right + offset,
                    bp.downstream.strand,
                    bp.junction,
                    bp.post,
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allele {
    pub id: usize,
    pub seq: String,
    pub weight: f64,
}

impl Allele {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorKind {
    Substitution,
    Insertion,
    Deletion,
}

/// A sequencing error introduced while sampling. `position` is in read coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeqError {
    pub position: usize,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledRead {
    pub seq: String,
    pub strand: Strand,
    /// The id of the allele this read was drawn from.
    pub allele: usize,
    /// 0-based offset of the leftmost source base in the allele.
    pub offset: usize,
    /// Phred+33 quality string, same length as `seq`.
    pub qual: String,
    pub errors: Vec<SeqError>,
}

impl SampledRead {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
    pub fn qual(&self) -> &[u8] {
        self.qual.as_bytes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadPair {
    pub read1: SampledRead,
    pub read2: SampledRead,
    pub fragment_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorrectionResult {
    pub corrected: bool,
    pub original: String,
    /// Equal to `original` when nothing was changed.
    pub seq: String,
}

impl CorrectionResult {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
}

/// One alignment hit, in PAF terms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub query: String,
    pub query_len: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub strand: Strand,
    pub target: String,
    pub target_len: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub matches: usize,
    pub block_len: usize,
    pub mapq: u8,
}

impl std::fmt::Display for AlignmentRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query,
            self.query_len,
            self.query_start,
            self.query_end,
            self.strand,
            self.target,
            self.target_len,
            self.target_start,
            self.target_end,
            self.matches,
            self.block_len,
            self.mapq
        )
    }
}

/// A read together with its primary hit on the local reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignedRead {
    pub id: String,
    pub seq: String,
    pub hit: AlignmentRecord,
    /// Set by k-mer correction when the read was changed.
    pub corrected: Option<String>,
}

impl AlignedRead {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
    /// The sequence handed to the assembler: the corrected one if any.
    pub fn assembly_seq(&self) -> &[u8] {
        self.corrected
            .as_deref()
            .unwrap_or(self.seq.as_str())
            .as_bytes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contig {
    pub id: String,
    pub seq: String,
}

impl Contig {
    pub fn seq(&self) -> &[u8] {
        self.seq.as_bytes()
    }
}

/// One row of the benchmark table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageMetric {
    pub coverage: f64,
    pub num_reads: usize,
    pub num_contigs: usize,
    pub num_final: usize,
    pub contig_coverage: f64,
    pub kmer_corr: bool,
    pub error_rate: f64,
}

impl CoverageMetric {
    pub const HEADER: &'static str =
        "coverage\tnumreads\tnumcontigs\tnumfinal\tcontig_coverage\tkmer_corr\terror_rate";
}

impl std::fmt::Display for CoverageMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.coverage,
            self.num_reads,
            self.num_contigs,
            self.num_final,
            self.contig_coverage,
            self.kmer_corr as u8,
            self.error_rate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn junction_types() {
        let fwd = |s, e| SegmentSpan::new(s, e, Strand::Forward);
        let rev = |s, e| SegmentSpan::new(s, e, Strand::Reverse);
        let bp = BreakpointRecord::new(fwd(0, 10), fwd(20, 30), 10);
        assert_eq!(bp.junction, JunctionType::DeletionLike);
        assert_eq!(bp.pre(), (10, 20));
        let bp = BreakpointRecord::new(fwd(20, 30), fwd(0, 10), 10);
        assert_eq!(bp.junction, JunctionType::DuplicationLike);
        let bp = BreakpointRecord::new(fwd(0, 10), rev(10, 20), 10);
        assert_eq!(bp.junction, JunctionType::Inversion);
        assert_eq!(bp.pre(), (10, 20));
        let bp = BreakpointRecord::new(fwd(0, 10), fwd(10, 20), 10);
        assert_eq!(bp.junction, JunctionType::Reference);
        let bp = BreakpointRecord::new(rev(20, 30), rev(10, 20), 10);
        assert_eq!(bp.junction, JunctionType::Reference);
        let bp = BreakpointRecord::new(rev(20, 30), rev(0, 10), 10);
        assert_eq!(bp.junction, JunctionType::DeletionLike);
    }
    #[test]
    fn metric_row() {
        let metric = CoverageMetric {
            coverage: 20f64,
            num_reads: 1800,
            num_contigs: 3,
            num_final: 2,
            contig_coverage: 0.5,
            kmer_corr: true,
            error_rate: 0.01,
        };
        assert_eq!(metric.to_string(), "20\t1800\t3\t2\t0.5\t1\t0.01");
        assert_eq!(CoverageMetric::HEADER.split('\t').count(), 7);
    }
    #[test]
    fn indel_rows_are_absolute() {
        let genome = MutatedGenome {
            interval: ReferenceInterval::new("chr17", 1000, 1100),
            seq: String::new(),
            breakpoints: vec![],
            indels: vec![
                IndelRecord::deletion(10, 3),
                IndelRecord::insertion(50, "ACG".to_string()),
            ],
        };
        let rows: Vec<_> = genome.indel_rows().collect();
        assert_eq!(rows[0], "chr17\t1010\tDEL\t3\t.");
        assert_eq!(rows[1], "chr17\t1050\tINS\t3\tACG");
        assert_eq!(genome.layout(), vec![SegmentSpan::new(0, 100, Strand::Forward)]);
    }
}
