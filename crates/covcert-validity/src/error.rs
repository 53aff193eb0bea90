//! Validity computation errors.

use covcert_core::CredentialType;
use thiserror::Error;

/// Which end of a validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// The inclusive lower bound.
    ValidFrom,
    /// The exclusive upper bound.
    ValidUntil,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ValidFrom => f.write_str("validFrom"),
            Self::ValidUntil => f.write_str("validUntil"),
        }
    }
}

/// Errors from validity computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidityError {
    /// A bound the record type requires could not be computed (unparseable
    /// date, unknown product, unknown test type). Callers must fail closed.
    #[error("cannot establish {bound} for {credential_type} record")]
    Unestablished {
        /// The credential type of the record.
        credential_type: CredentialType,
        /// The missing bound.
        bound: Bound,
    },

    /// A product catalog document could not be parsed.
    #[error("invalid product catalog: {0}")]
    InvalidCatalog(String),
}

impl ValidityError {
    /// Stable machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unestablished { .. } => "V|UNE",
            Self::InvalidCatalog(_) => "V|CAT",
        }
    }
}
