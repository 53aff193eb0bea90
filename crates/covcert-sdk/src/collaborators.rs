//! # Collaborator Boundaries
//!
//! The verification pipeline delegates four concerns to collaborators
//! supplied at session initialization:
//!
//! | Trait                   | Concern                                        |
//! |-------------------------|------------------------------------------------|
//! | [`Decoder`]             | envelope text → [`HealthCredential`]           |
//! | [`TrustEngine`]         | signature and trust-anchor verification        |
//! | [`RuleEngine`]          | jurisdiction rule evaluation                   |
//! | [`DistributionService`] | refreshing rules, value sets, and trust lists  |
//!
//! All are `Send + Sync` and shared behind `Arc`. The asynchronous ones
//! use `async-trait` so they stay object safe.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use covcert_core::{
    CountryCode, DecodeError, HealthCredential, Region, RuleOutcome, ValidityWindow,
};
use covcert_validity::ProductCatalog;

use crate::error::DistributionError;

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Which envelope scheme a decode attempt expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnvelopeScheme {
    /// The regular health certificate envelope.
    #[default]
    Standard,
    /// The vaccination exemption envelope, tried when the standard prefix
    /// does not match.
    Exemption,
}

impl std::fmt::Display for EnvelopeScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Exemption => f.write_str("exemption"),
        }
    }
}

/// Turns scanned credential text into a structured credential.
///
/// Implementations handle the radix-45, compression, and binary map
/// layers, and must return [`DecodeError::InvalidSchemePrefix`] when the
/// text does not carry the prefix of `scheme`.
pub trait Decoder: Send + Sync {
    /// Decode `encoded` under `scheme`.
    fn decode(
        &self,
        encoded: &str,
        scheme: EnvelopeScheme,
    ) -> Result<HealthCredential, DecodeError>;
}

// ---------------------------------------------------------------------------
// TrustEngine
// ---------------------------------------------------------------------------

/// Why a trust engine rejected a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustFailure {
    /// The envelope belongs to a different scheme than the one checked.
    SchemePrefixMismatch,
    /// The signature does not verify.
    SignatureInvalid,
    /// No trusted key matches the envelope's key identifier.
    KeyNotFound,
    /// The envelope's technical expiry has passed.
    Expired,
    /// The envelope is not yet valid at the evaluation clock.
    NotYetValid,
    /// The certificate identifier is on the revocation list.
    Revoked,
    /// Trust material is missing or too old to use.
    TrustListUnavailable,
}

impl TrustFailure {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::SchemePrefixMismatch => "S|SPM",
            Self::SignatureInvalid => "S|SIG",
            Self::KeyNotFound => "S|KNF",
            Self::Expired => "S|CEX",
            Self::NotYetValid => "S|NYV",
            Self::Revoked => "S|REV",
            Self::TrustListUnavailable => "S|TLU",
        }
    }
}

impl std::fmt::Display for TrustFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::SchemePrefixMismatch => "scheme prefix mismatch",
            Self::SignatureInvalid => "signature invalid",
            Self::KeyNotFound => "signing key not found",
            Self::Expired => "envelope expired",
            Self::NotYetValid => "envelope not yet valid",
            Self::Revoked => "certificate revoked",
            Self::TrustListUnavailable => "trust list unavailable",
        };
        f.write_str(text)
    }
}

/// Result of a signature and trust check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the credential is trusted.
    pub is_valid: bool,
    /// The reason for rejection, when not trusted.
    pub error: Option<TrustFailure>,
}

impl ValidationOutcome {
    /// A trusted outcome.
    pub fn trusted() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    /// A rejected outcome.
    pub fn rejected(failure: TrustFailure) -> Self {
        Self {
            is_valid: false,
            error: Some(failure),
        }
    }
}

/// The trust engine could not produce an outcome at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustEngineError {
    /// Trust material could not be loaded.
    #[error("trust material unavailable: {0}")]
    Unavailable(String),
    /// Any other engine failure.
    #[error("trust engine failure: {0}")]
    Internal(String),
}

impl TrustEngineError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "S|UNA",
            Self::Internal(_) => "S|INT",
        }
    }
}

/// Verifies signatures against trusted issuer keys.
///
/// The evaluation clock is engine-wide state. Callers that share one
/// engine must hold a lock across `set_evaluation_clock` and `verify`
/// (see [`TrustBinding`](crate::orchestrator::TrustBinding)).
#[async_trait]
pub trait TrustEngine: Send + Sync {
    /// Set the instant against which expiry and trust-list freshness are
    /// judged.
    fn set_evaluation_clock(&self, instant: DateTime<Utc>);

    /// Verify the credential's signature and trust chain.
    async fn verify(
        &self,
        credential: &HealthCredential,
    ) -> Result<ValidationOutcome, TrustEngineError>;
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// Input to one rule evaluation.
#[derive(Debug, Clone)]
pub struct RuleEvaluationRequest<'a> {
    /// The credential under evaluation.
    pub credential: &'a HealthCredential,
    /// Wall-clock time of the check.
    pub real_time: DateTime<Utc>,
    /// The instant the rules are evaluated at.
    pub evaluation_clock: DateTime<Utc>,
    /// Envelope issuance.
    pub issued_at: Option<DateTime<Utc>>,
    /// Envelope technical expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Jurisdiction whose rules apply.
    pub country_code: CountryCode,
    /// Sub-national region, if the jurisdiction has regional rules.
    pub region: Option<Region>,
    /// Locally computed validity window of the selected record.
    pub local_window: ValidityWindow,
}

/// Output of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleEvaluation {
    /// One outcome per evaluated rule.
    pub outcomes: Vec<RuleOutcome>,
    /// Expiry computed by the jurisdiction's rules, if any.
    pub valid_until: Option<DateTime<Utc>>,
}

/// The rule engine could not evaluate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleEngineError {
    /// No rule set is available for the jurisdiction.
    #[error("no rules available for {country}")]
    RulesUnavailable {
        /// Requested jurisdiction.
        country: String,
    },
    /// A rule could not be evaluated.
    #[error("rule {rule_id} could not be evaluated: {reason}")]
    EvaluationFailed {
        /// The offending rule.
        rule_id: String,
        /// Engine-supplied reason.
        reason: String,
    },
    /// Value sets the rules depend on are missing.
    #[error("value sets unavailable: {0}")]
    ValueSetsUnavailable(String),
}

impl RuleEngineError {
    /// Stable machine code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RulesUnavailable { .. } => "N|NRA",
            Self::EvaluationFailed { .. } => "N|EVF",
            Self::ValueSetsUnavailable(_) => "N|VSA",
        }
    }
}

/// Evaluates jurisdiction rules against a credential.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Evaluate all rules applicable to the request.
    async fn evaluate(
        &self,
        request: RuleEvaluationRequest<'_>,
    ) -> Result<RuleEvaluation, RuleEngineError>;
}

// ---------------------------------------------------------------------------
// DistributionService
// ---------------------------------------------------------------------------

/// Result of a trust material refresh.
#[derive(Debug)]
pub struct RefreshOutcome {
    /// Whether any list changed.
    pub was_updated: bool,
    /// The first failure, if any list could not be refreshed. Lists that
    /// did refresh still count toward `was_updated`.
    pub error: Option<DistributionError>,
}

impl RefreshOutcome {
    /// A refresh that changed nothing and failed nowhere.
    pub fn unchanged() -> Self {
        Self {
            was_updated: false,
            error: None,
        }
    }
}

/// Keeps rule sets, value sets, and trust lists current.
#[async_trait]
pub trait DistributionService: Send + Sync {
    /// Refresh trust material. Without `force`, material that is still
    /// fresh is not fetched again.
    async fn refresh(&self, force: bool) -> RefreshOutcome;

    /// The accepted product value set from the last successful refresh,
    /// or `None` if this service has not published one.
    fn current_value_sets(&self) -> Option<Arc<ProductCatalog>> {
        None
    }
}
