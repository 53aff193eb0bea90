//! # covcert-sdk: Health Credential Verification
//!
//! Verifies scanned health credentials in three stages:
//!
//! 1. **Decode** the envelope text into a [`HealthCredential`](covcert_core::HealthCredential).
//! 2. **Trust**: check the signature against issuer keys. When the text
//!    does not carry the standard prefix, retry as a vaccination
//!    exemption envelope.
//! 3. **Eligibility**: compute the local validity window, evaluate the
//!    jurisdiction's rules, and aggregate their outcomes into a verdict.
//!
//! Decoding, signature checks, rule evaluation, and trust-list transport
//! are collaborators behind traits in [`collaborators`]. An HTTP transport
//! for trust lists ships in [`distribution`].
//!
//! ## Usage
//!
//! ```ignore
//! let factory = SessionFactory::new();
//! let session = factory.initialize(SdkConfig::from_env()?, bindings)?;
//! let report = session.verify(&request).await?;
//! ```
//!
//! The crate emits `tracing` events and spans; it never installs a
//! subscriber.

pub mod collaborators;
pub mod config;
pub mod distribution;
pub mod environment;
pub mod error;
pub mod orchestrator;
pub mod session;

pub use collaborators::{
    Decoder, DistributionService, EnvelopeScheme, RefreshOutcome, RuleEngine, RuleEngineError,
    RuleEvaluation, RuleEvaluationRequest, TrustEngine, TrustEngineError, TrustFailure,
    ValidationOutcome,
};
pub use config::{ConfigError, SdkConfig};
pub use distribution::HttpDistributionService;
pub use environment::{Environment, TrustEndpoint, TrustEndpoints};
pub use error::{DistributionError, PreconditionViolation, TrustError, VerificationError};
pub use orchestrator::{
    EligibilityCheck, TrustBinding, TrustedCredential, VerificationOrchestrator,
    VerificationReport, VerificationRequest,
};
pub use session::{CollaboratorBindings, Session, SessionFactory, FRAMEWORK_VERSION};
