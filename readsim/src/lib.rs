pub mod assembler;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod intervals;
pub mod kmer;
pub mod kmer_correction;
pub mod minimap2;
pub mod mutate_genome;
pub mod quality;
pub mod read_sim;
pub mod reference;
pub mod seq;
pub mod sim_breaks;
pub mod split_reads;

pub use assembler::{Assembler, AssemblerConfig, ExternalAssembler};
pub use benchmark::{assembly_test, BenchmarkDriver};
pub use config::{Mode, SimulationContext};
pub use error::{Result, SimError};
pub use kmer_correction::{KmerCorrection, KmerCorrectionConfig};
pub use minimap2::{Minimap2Aligner, SequenceAligner};
pub use read_sim::{ErrorProfile, ReadSimConfig, ReadSampler};
pub use reference::{FastaReference, InMemoryReference, ReferenceAccessor};
