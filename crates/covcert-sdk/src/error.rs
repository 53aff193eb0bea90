//! SDK error types.
//!
//! [`VerificationError`] is the umbrella returned by session and
//! orchestrator operations. Every variant carries a stable `code()` so
//! callers can localize without parsing messages.

use thiserror::Error;

use covcert_core::{ClassificationError, DecodeError};

use crate::collaborators::{RuleEngineError, TrustEngineError, TrustFailure};

/// Session lifecycle misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// An operation needed a session before `initialize` was called.
    #[error("session factory has not been initialized")]
    NotInitialized,
    /// `initialize` was called a second time.
    #[error("session factory is already initialized")]
    AlreadyInitialized,
}

impl PreconditionViolation {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "P|NI",
            Self::AlreadyInitialized => "P|AI",
        }
    }
}

/// The credential is not trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    /// The trust engine rejected the credential.
    #[error("credential rejected: {0}")]
    Rejected(TrustFailure),

    /// The standard prefix did not match and the exemption envelope could
    /// not be decoded either.
    #[error("exemption fallback failed: {0}")]
    ExemptionFallback(DecodeError),

    /// The trust engine failed to produce an outcome.
    #[error(transparent)]
    Engine(#[from] TrustEngineError),
}

impl TrustError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rejected(failure) => failure.code(),
            Self::ExemptionFallback(_) => "S|EXF",
            Self::Engine(e) => e.code(),
        }
    }
}

/// Failure to fetch trust material from the distribution backend.
#[derive(Error, Debug)]
pub enum DistributionError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Endpoint path.
        endpoint: String,
        /// Transport error.
        source: reqwest::Error,
    },
    /// The backend answered with a non-2xx status.
    #[error("trust backend {endpoint} returned {status}: {body}")]
    Status {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status.
        status: u16,
        /// Response body.
        body: String,
    },
    /// An endpoint URL could not be built.
    #[error("invalid endpoint URL for {endpoint}: {reason}")]
    InvalidUrl {
        /// Endpoint path.
        endpoint: String,
        /// Parser message.
        reason: String,
    },
    /// A fetched value set could not be read as a product catalog.
    #[error("invalid value set from {endpoint}: {reason}")]
    InvalidValueSets {
        /// Endpoint path.
        endpoint: String,
        /// Parser message.
        reason: String,
    },
    /// The distribution source is unavailable for another reason.
    #[error("distribution unavailable: {0}")]
    Unavailable(String),
}

impl DistributionError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http { .. } => "L|NET",
            Self::Status { .. } => "L|STA",
            Self::InvalidUrl { .. } => "L|URL",
            Self::InvalidValueSets { .. } => "L|VSI",
            Self::Unavailable(_) => "L|UNA",
        }
    }
}

/// Any failure of a verification operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The text could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The credential is not trusted.
    #[error("signature error: {0}")]
    Trust(#[from] TrustError),

    /// No usable record could be selected.
    #[error("classification error: {0}")]
    Classification(#[from] ClassificationError),

    /// The rule engine failed. Surfaced verbatim.
    #[error("rule error: {0}")]
    RuleEngine(#[from] RuleEngineError),

    /// A forced rule refresh failed, so fresh rules could not be applied.
    /// Carries the distribution error's code and message.
    #[error("rule refresh failed: {reason}")]
    RulesRefresh {
        /// Code of the underlying [`DistributionError`].
        code: &'static str,
        /// Message of the underlying [`DistributionError`].
        reason: String,
    },

    /// The session was used out of order.
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),
}

impl From<DistributionError> for VerificationError {
    fn from(e: DistributionError) -> Self {
        Self::RulesRefresh {
            code: e.code(),
            reason: e.to_string(),
        }
    }
}

impl VerificationError {
    /// Stable machine code of the underlying error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(e) => e.code(),
            Self::Trust(e) => e.code(),
            Self::Classification(e) => e.code(),
            Self::RuleEngine(e) => e.code(),
            Self::RulesRefresh { code, .. } => *code,
            Self::Precondition(e) => e.code(),
        }
    }
}
