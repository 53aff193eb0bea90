//! # Session Lifecycle
//!
//! A [`SessionFactory`] is initialized exactly once with configuration and
//! collaborator bindings; every later caller obtains the same [`Session`].
//! Using the factory out of order is a [`PreconditionViolation`], returned
//! as an error rather than a panic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use covcert_core::{DecodeError, HealthCredential, VerificationVerdict};
use covcert_validity::{PolicyConstants, ProductCatalog};

use crate::collaborators::{Decoder, DistributionService, RefreshOutcome, RuleEngine, TrustEngine};
use crate::config::SdkConfig;
use crate::distribution::HttpDistributionService;
use crate::environment::Environment;
use crate::error::{DistributionError, PreconditionViolation, VerificationError};
use crate::orchestrator::{
    EligibilityCheck, TrustBinding, TrustedCredential, VerificationOrchestrator,
    VerificationReport, VerificationRequest,
};

/// Version of this SDK.
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The collaborators a session delegates to.
///
/// The trust engine is held through a [`TrustBinding`]. Sessions that share
/// an engine must be built from clones of the same bindings so their
/// evaluation clock changes exclude each other.
#[derive(Clone)]
pub struct CollaboratorBindings {
    /// Envelope decoder.
    pub decoder: Arc<dyn Decoder>,
    /// Signature and trust verification, with its clock lock.
    pub trust: Arc<TrustBinding>,
    /// Jurisdiction rule evaluation.
    pub rule_engine: Arc<dyn RuleEngine>,
    /// Trust material refresh.
    pub distribution: Arc<dyn DistributionService>,
}

impl CollaboratorBindings {
    /// Bind collaborators, wrapping `trust_engine` in a new [`TrustBinding`].
    pub fn new(
        decoder: Arc<dyn Decoder>,
        trust_engine: Arc<dyn TrustEngine>,
        rule_engine: Arc<dyn RuleEngine>,
        distribution: Arc<dyn DistributionService>,
    ) -> Self {
        Self {
            decoder,
            trust: Arc::new(TrustBinding::new(trust_engine)),
            rule_engine,
            distribution,
        }
    }

    /// Bindings that refresh trust material from the configured backend
    /// over HTTP.
    pub fn with_http_distribution(
        decoder: Arc<dyn Decoder>,
        trust_engine: Arc<dyn TrustEngine>,
        rule_engine: Arc<dyn RuleEngine>,
        config: &SdkConfig,
    ) -> Result<Self, DistributionError> {
        let distribution = Arc::new(HttpDistributionService::new(config)?);
        Ok(Self::new(decoder, trust_engine, rule_engine, distribution))
    }
}

impl std::fmt::Debug for CollaboratorBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaboratorBindings").finish_non_exhaustive()
    }
}

/// Hands out the single session of a process or component.
#[derive(Debug, Default)]
pub struct SessionFactory {
    session: RwLock<Option<Session>>,
}

impl SessionFactory {
    /// An uninitialized factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize the factory.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionViolation::AlreadyInitialized`] on any call
    /// after the first successful one.
    pub fn initialize(
        &self,
        config: SdkConfig,
        bindings: CollaboratorBindings,
    ) -> Result<Session, PreconditionViolation> {
        let mut slot = self.session.write();
        if slot.is_some() {
            tracing::warn!("session factory initialized twice");
            return Err(PreconditionViolation::AlreadyInitialized);
        }

        tracing::info!(
            environment = %config.environment,
            version = FRAMEWORK_VERSION,
            "initializing verification session"
        );
        let session = Session::new(config, bindings);
        *slot = Some(session.clone());
        Ok(session)
    }

    /// The initialized session.
    ///
    /// # Errors
    ///
    /// Returns [`PreconditionViolation::NotInitialized`] before
    /// [`initialize`](Self::initialize).
    pub fn session(&self) -> Result<Session, PreconditionViolation> {
        self.session
            .read()
            .clone()
            .ok_or(PreconditionViolation::NotInitialized)
    }

    /// Whether [`initialize`](Self::initialize) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.session.read().is_some()
    }
}

/// A verification context. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    config: SdkConfig,
    orchestrator: VerificationOrchestrator,
}

impl Session {
    fn new(config: SdkConfig, bindings: CollaboratorBindings) -> Self {
        let orchestrator = VerificationOrchestrator::new(
            bindings.decoder,
            bindings.trust,
            bindings.rule_engine,
            bindings.distribution,
            config.policy.clone(),
            config.product_catalog.clone(),
            config.calendar,
        );
        Self {
            inner: Arc::new(SessionInner {
                config,
                orchestrator,
            }),
        }
    }

    /// Decode scanned text as a standard envelope.
    pub fn decode(&self, encoded: &str) -> Result<HealthCredential, DecodeError> {
        self.inner.orchestrator.decode(encoded)
    }

    /// Decode and check the signature, with exemption fallback.
    pub async fn verify_signature_and_trust(
        &self,
        encoded: &str,
        evaluation_clock: DateTime<Utc>,
    ) -> Result<TrustedCredential, VerificationError> {
        self.inner
            .orchestrator
            .verify_signature_and_trust(encoded, evaluation_clock)
            .await
    }

    /// Check a trusted credential against jurisdiction rules.
    pub async fn check_eligibility(
        &self,
        credential: &HealthCredential,
        check: &EligibilityCheck,
    ) -> Result<VerificationVerdict, VerificationError> {
        self.inner
            .orchestrator
            .check_eligibility(credential, check)
            .await
    }

    /// Run the whole pipeline.
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationReport, VerificationError> {
        self.inner.orchestrator.verify(request).await
    }

    /// Refresh trust material; `force` bypasses the freshness check.
    pub async fn refresh_trust_material(&self, force: bool) -> RefreshOutcome {
        self.inner.orchestrator.refresh_trust_material(force).await
    }

    /// Backend environment.
    pub fn environment(&self) -> Environment {
        self.inner.config.environment
    }

    /// Trust backend API key.
    pub fn api_key(&self) -> &str {
        self.inner.config.api_key.as_str()
    }

    /// Validity policy.
    pub fn policy(&self) -> &PolicyConstants {
        self.inner.orchestrator.policy()
    }

    /// Accepted product catalog, as refreshed from the value set endpoint
    /// or, before any refresh, as configured.
    pub fn current_value_sets(&self) -> Arc<ProductCatalog> {
        self.inner.orchestrator.current_value_sets()
    }

    /// SDK version.
    pub fn framework_version(&self) -> &'static str {
        FRAMEWORK_VERSION
    }
}
