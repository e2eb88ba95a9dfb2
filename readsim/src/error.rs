//! Error types of the simulation and benchmark engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    /// A user-supplied value that can not be used. Always fatal, raised before sampling.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("A region is required. Give a BED file or a locus like chr17:7565721-7575000")]
    MissingRegion,

    #[error("The reference sequence of {interval} is empty")]
    EmptyReference { interval: String },

    #[error("Reference sequence '{chrom}' not found")]
    ReferenceNotFound { chrom: String },

    #[error("Reference error: {0}")]
    Reference(String),

    /// Not fatal: carried on a sampling outcome and logged per sweep cell.
    #[error("Could only sample {produced} of {requested} reads within the retry budget")]
    SamplingExhaustion { requested: usize, produced: usize },

    #[error("Aligner failed: {0}")]
    Aligner(String),

    #[error("Assembler failed: {0}")]
    Assembler(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl SimError {
    pub fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
    /// True for the errors that must stop a run before any simulation starts.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SimError::InvalidParameter { .. }
                | SimError::MissingRegion
                | SimError::EmptyReference { .. }
                | SimError::ReferenceNotFound { .. }
                | SimError::Toml(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn invalid_parameter_message() {
        let error = SimError::invalid("snv-error-rate", "could not convert 0.x to number");
        let msg = format!("{error}");
        assert!(msg.contains("Invalid parameter 'snv-error-rate'"));
        assert!(msg.contains("0.x"));
        assert!(error.is_configuration_error());
    }
    #[test]
    fn exhaustion_is_not_fatal() {
        let error = SimError::SamplingExhaustion {
            requested: 100,
            produced: 40,
        };
        assert!(format!("{error}").contains("40 of 100"));
        assert!(!error.is_configuration_error());
    }
}
