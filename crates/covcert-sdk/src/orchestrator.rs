//! # Verification Orchestrator
//!
//! Sequences one verification:
//!
//! ```text
//! DECODE ──fail──────────────────────────────────────────▶ DecodeError
//!    │ InvalidSchemePrefix ──────────────┐
//!    ▼                                   ▼
//! SIGNATURE_CHECK ──SchemePrefixMismatch──▶ EXEMPTION_CHECK ──fail──▶ TrustError
//!    │ other failure ──────────────────────────────────────────────▶ TrustError
//!    ▼ trusted                           │ trusted
//! RULES_CHECK ◀──────────────────────────┘
//!    │ local window not established ───▶ rejected verdict
//!    │ engine error ───────────────────▶ RuleEngineError
//!    ▼
//! AGGREGATE ──▶ VerificationVerdict
//! ```
//!
//! Steps run sequentially; each collaborator call is awaited before the
//! next begins. Only the trust engine holds shared mutable state (its
//! evaluation clock), which [`TrustBinding`] serializes. An engine must be
//! wrapped in exactly one binding; every orchestrator using that engine
//! shares the binding through its `Arc`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::Instrument;
use uuid::Uuid;

use covcert_core::{
    CountryCode, CredentialType, DecodeError, EvaluationCalendar, HealthCredential, Region,
    VerificationVerdict,
};
use covcert_rules::{aggregate, failed_rule_ids};
use covcert_validity::{select_record, PolicyConstants, ProductCatalog, ValidityCalculator};

use crate::collaborators::{
    Decoder, DistributionService, EnvelopeScheme, RefreshOutcome, RuleEngine,
    RuleEvaluationRequest, TrustEngine, TrustEngineError, TrustFailure, ValidationOutcome,
};
use crate::error::{TrustError, VerificationError};

// ---------------------------------------------------------------------------
// TrustBinding
// ---------------------------------------------------------------------------

/// A shared trust engine plus the lock that keeps "set clock, then verify"
/// atomic across concurrent verifications.
///
/// The lock only excludes callers going through the same binding. Wrap an
/// engine once and share the `Arc<TrustBinding>` wherever the engine is
/// used.
pub struct TrustBinding {
    engine: Arc<dyn TrustEngine>,
    clock_lock: tokio::sync::Mutex<()>,
}

impl TrustBinding {
    /// Wrap a trust engine.
    pub fn new(engine: Arc<dyn TrustEngine>) -> Self {
        Self {
            engine,
            clock_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Set the evaluation clock and verify, holding the lock across both.
    pub async fn verify_at(
        &self,
        credential: &HealthCredential,
        evaluation_clock: DateTime<Utc>,
    ) -> Result<ValidationOutcome, TrustEngineError> {
        let _guard = self.clock_lock.lock().await;
        self.engine.set_evaluation_clock(evaluation_clock);
        self.engine.verify(credential).await
    }
}

impl std::fmt::Debug for TrustBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustBinding").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// A credential whose signature and trust chain were accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedCredential {
    /// The decoded credential.
    pub credential: HealthCredential,
    /// The envelope scheme whose signature was accepted.
    pub scheme: EnvelopeScheme,
}

/// Parameters of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityCheck {
    /// Which vaccination or test record to validate. Ignored for
    /// recovery and exemption credentials.
    pub record_index: usize,
    /// Wall-clock time of the check.
    pub real_time: DateTime<Utc>,
    /// The instant validity is judged at.
    pub evaluation_clock: DateTime<Utc>,
    /// Jurisdiction whose rules apply.
    pub country_code: CountryCode,
    /// Sub-national region.
    pub region: Option<Region>,
    /// Force a rule set refresh before evaluating.
    pub force_rule_update: bool,
}

impl EligibilityCheck {
    /// A check at `clock` (used as both real time and evaluation clock)
    /// for the first record under `country_code`'s rules.
    pub fn at(clock: DateTime<Utc>, country_code: CountryCode) -> Self {
        Self {
            record_index: 0,
            real_time: clock,
            evaluation_clock: clock,
            country_code,
            region: None,
            force_rule_update: false,
        }
    }
}

/// A full verification of scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    /// The scanned credential text.
    pub encoded: String,
    /// Eligibility parameters. Its evaluation clock is also the trust
    /// engine's clock.
    pub check: EligibilityCheck,
}

/// Outcome of a full verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Correlation id of the call, as recorded in its tracing span.
    pub correlation_id: Uuid,
    /// Type of the verified credential.
    pub credential_type: CredentialType,
    /// Eligibility verdict.
    pub verdict: VerificationVerdict,
    /// The envelope scheme whose signature was accepted.
    pub trust: EnvelopeScheme,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs the decode → trust → rules → aggregate pipeline.
pub struct VerificationOrchestrator {
    decoder: Arc<dyn Decoder>,
    trust: Arc<TrustBinding>,
    rules: Arc<dyn RuleEngine>,
    distribution: Arc<dyn DistributionService>,
    policy: PolicyConstants,
    catalog: Arc<ProductCatalog>,
    calendar: EvaluationCalendar,
}

impl std::fmt::Debug for VerificationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationOrchestrator")
            .field("policy", &self.policy)
            .field("catalog_len", &self.catalog.len())
            .field("calendar", &self.calendar)
            .finish_non_exhaustive()
    }
}

impl VerificationOrchestrator {
    /// Assemble an orchestrator. `catalog` is used until the distribution
    /// service publishes a value set.
    pub fn new(
        decoder: Arc<dyn Decoder>,
        trust: Arc<TrustBinding>,
        rules: Arc<dyn RuleEngine>,
        distribution: Arc<dyn DistributionService>,
        policy: PolicyConstants,
        catalog: ProductCatalog,
        calendar: EvaluationCalendar,
    ) -> Self {
        Self {
            decoder,
            trust,
            rules,
            distribution,
            policy,
            catalog: Arc::new(catalog),
            calendar,
        }
    }

    /// The validity policy in use.
    pub fn policy(&self) -> &PolicyConstants {
        &self.policy
    }

    /// The accepted product catalog: the value set from the last refresh
    /// if the distribution service published one, else the configured
    /// catalog.
    pub fn current_value_sets(&self) -> Arc<ProductCatalog> {
        self.distribution
            .current_value_sets()
            .unwrap_or_else(|| Arc::clone(&self.catalog))
    }

    /// Decode `encoded` as a standard envelope.
    pub fn decode(&self, encoded: &str) -> Result<HealthCredential, DecodeError> {
        self.decoder.decode(encoded, EnvelopeScheme::Standard)
    }

    /// Decode and check the signature, falling back to the exemption
    /// envelope when the standard prefix does not match.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::Decode`] for any decode failure other than a
    ///   scheme prefix mismatch.
    /// - [`VerificationError::Trust`] when the signature is rejected, or
    ///   the prefix mismatched and the exemption envelope failed too.
    pub async fn verify_signature_and_trust(
        &self,
        encoded: &str,
        evaluation_clock: DateTime<Utc>,
    ) -> Result<TrustedCredential, VerificationError> {
        let credential = match self.decoder.decode(encoded, EnvelopeScheme::Standard) {
            Ok(credential) => credential,
            Err(DecodeError::InvalidSchemePrefix) => {
                tracing::debug!("standard prefix mismatch, trying exemption envelope");
                return self.exemption_check(encoded, evaluation_clock).await;
            }
            Err(e) => {
                tracing::info!(code = e.code(), "decode failed");
                return Err(e.into());
            }
        };

        let outcome = self
            .trust
            .verify_at(&credential, evaluation_clock)
            .await
            .map_err(TrustError::from)?;

        if outcome.is_valid {
            return Ok(TrustedCredential {
                credential,
                scheme: EnvelopeScheme::Standard,
            });
        }

        match outcome.error {
            Some(TrustFailure::SchemePrefixMismatch) => {
                tracing::debug!("trust engine reported prefix mismatch, trying exemption envelope");
                self.exemption_check(encoded, evaluation_clock).await
            }
            failure => Err(rejected(failure)),
        }
    }

    async fn exemption_check(
        &self,
        encoded: &str,
        evaluation_clock: DateTime<Utc>,
    ) -> Result<TrustedCredential, VerificationError> {
        let credential = self
            .decoder
            .decode(encoded, EnvelopeScheme::Exemption)
            .map_err(|e| {
                tracing::info!(code = e.code(), "exemption envelope decode failed");
                TrustError::ExemptionFallback(e)
            })?;

        let outcome = self
            .trust
            .verify_at(&credential, evaluation_clock)
            .await
            .map_err(TrustError::from)?;

        if !outcome.is_valid {
            return Err(rejected(outcome.error));
        }

        let credential_type = credential.credential_type();
        if credential_type != CredentialType::VaccinationExemption {
            tracing::info!(%credential_type, "exemption envelope carried another credential type");
            return Err(TrustError::ExemptionFallback(DecodeError::HcertInvalid(format!(
                "exemption envelope carries a {credential_type} credential"
            )))
            .into());
        }

        Ok(TrustedCredential {
            credential,
            scheme: EnvelopeScheme::Exemption,
        })
    }

    /// Check eligibility of a trusted credential under a jurisdiction's
    /// rules.
    ///
    /// A dated credential whose local validity window cannot be
    /// established is rejected without consulting the rule engine.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::Classification`] if the record cannot be
    ///   selected.
    /// - [`VerificationError::RulesRefresh`] if `force_rule_update` was set
    ///   and the refresh failed.
    /// - [`VerificationError::RuleEngine`] if the engine fails.
    pub async fn check_eligibility(
        &self,
        credential: &HealthCredential,
        check: &EligibilityCheck,
    ) -> Result<VerificationVerdict, VerificationError> {
        let credential_type = credential.credential_type();
        let record = select_record(credential, check.record_index)?;

        if check.force_rule_update {
            let refresh = self.distribution.refresh(true).await;
            if let Some(e) = refresh.error {
                tracing::warn!(code = e.code(), error = %e, "forced rule refresh failed");
                return Err(e.into());
            }
        }

        let catalog = self.current_value_sets();
        let calculator = ValidityCalculator::new(&self.policy, &catalog, self.calendar);
        let local_window = match calculator.establish(record) {
            Ok(window) => window,
            Err(e) => {
                tracing::info!(%credential_type, code = e.code(), error = %e, "validity not established, rejecting");
                return Ok(VerificationVerdict::rejected());
            }
        };

        let evaluation = self
            .rules
            .evaluate(RuleEvaluationRequest {
                credential,
                real_time: check.real_time,
                evaluation_clock: check.evaluation_clock,
                issued_at: credential.issued_at(),
                expires_at: credential.expires_at(),
                country_code: check.country_code.clone(),
                region: check.region.clone(),
                local_window,
            })
            .await
            .map_err(|e| {
                tracing::warn!(code = e.code(), error = %e, "rule evaluation failed");
                e
            })?;

        let verdict = aggregate(credential_type, &evaluation.outcomes, evaluation.valid_until);
        tracing::info!(
            %credential_type,
            is_valid = verdict.is_valid,
            valid_until = ?verdict.valid_until,
            failed = ?failed_rule_ids(&evaluation.outcomes),
            "eligibility checked"
        );
        Ok(verdict)
    }

    /// Run the whole pipeline on scanned text.
    pub async fn verify(
        &self,
        request: &VerificationRequest,
    ) -> Result<VerificationReport, VerificationError> {
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!("verify", %correlation_id);

        async {
            let trusted = self
                .verify_signature_and_trust(&request.encoded, request.check.evaluation_clock)
                .await?;
            let verdict = self
                .check_eligibility(&trusted.credential, &request.check)
                .await?;
            Ok::<_, VerificationError>(VerificationReport {
                correlation_id,
                credential_type: trusted.credential.credential_type(),
                verdict,
                trust: trusted.scheme,
            })
        }
        .instrument(span)
        .await
    }

    /// Refresh rules, value sets, and trust lists.
    pub async fn refresh_trust_material(&self, force: bool) -> RefreshOutcome {
        self.distribution.refresh(force).await
    }
}

fn rejected(failure: Option<TrustFailure>) -> VerificationError {
    let failure = failure.unwrap_or(TrustFailure::SignatureInvalid);
    tracing::info!(code = failure.code(), "signature check rejected credential");
    TrustError::Rejected(failure).into()
}
