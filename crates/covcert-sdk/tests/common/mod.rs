//! Collaborator doubles and credential builders shared by the SDK
//! integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use covcert_core::{
    codes, CountryCode, CredentialPayload, DecodeError, Envelope, ExemptionEntry,
    HealthCredential, Person, PersonName, Region, TestEntry, VaccinationEntry, ValidityWindow,
};
use covcert_sdk::{
    CollaboratorBindings, Decoder, DistributionError, DistributionService, EnvelopeScheme,
    RefreshOutcome, RuleEngine, RuleEngineError, RuleEvaluation, RuleEvaluationRequest,
    TrustBinding, TrustEngine, TrustEngineError, ValidationOutcome,
};
use covcert_validity::ProductCatalog;

pub const STANDARD_PREFIX: &str = "HC1:";

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

fn holder() -> Person {
    Person {
        name: PersonName {
            family_name: Some("Muster".into()),
            given_name: Some("Anna".into()),
            standardized_family_name: "MUSTER".into(),
            standardized_given_name: Some("ANNA".into()),
        },
        date_of_birth: "1985-03-12".into(),
    }
}

fn envelope() -> Envelope {
    Envelope {
        issuer: Some("CH".into()),
        issued_at: Some(utc("2021-06-02T08:00:00Z")),
        expires_at: Some(utc("2022-06-02T08:00:00Z")),
    }
}

pub fn vaccination_credential(product: &str, dn: u32, sd: u32, date: &str) -> HealthCredential {
    HealthCredential::new(
        format!("{STANDARD_PREFIX}vaccination"),
        envelope(),
        holder(),
        CredentialPayload::Vaccination(vec![VaccinationEntry {
            disease: codes::SARS_COV_2.into(),
            vaccine: "J07BX03".into(),
            medicinal_product: product.into(),
            marketing_authorization_holder: "ORG-100001417".into(),
            dose_number: dn,
            total_doses: sd,
            vaccination_date: date.into(),
            country: "CH".into(),
            issuer: "Bundesamt für Gesundheit (BAG)".into(),
            certificate_identifier: "urn:uvci:01:CH:VAC0001".into(),
        }]),
    )
}

pub fn test_credential(test_type: &str, sampled: &str) -> HealthCredential {
    HealthCredential::new(
        format!("{STANDARD_PREFIX}test"),
        envelope(),
        holder(),
        CredentialPayload::Test(vec![TestEntry {
            disease: codes::SARS_COV_2.into(),
            test_type: test_type.into(),
            test_name: None,
            manufacturer: None,
            sample_timestamp: sampled.into(),
            result_timestamp: None,
            result: codes::TEST_RESULT_NEGATIVE.into(),
            testing_centre: Some("Testzentrum Bern".into()),
            country: "CH".into(),
            issuer: "Bundesamt für Gesundheit (BAG)".into(),
            certificate_identifier: "urn:uvci:01:CH:TST0001".into(),
        }]),
    )
}

pub fn exemption_credential() -> HealthCredential {
    HealthCredential::new(
        "EX1:exemption",
        envelope(),
        holder(),
        CredentialPayload::VaccinationExemption(vec![ExemptionEntry {
            disease: codes::SARS_COV_2.into(),
            country: "CH".into(),
            issuer: "Bundesamt für Gesundheit (BAG)".into(),
            declared_valid_until: Some("2022-01-31".into()),
            certificate_identifier: "urn:uvci:01:CH:EXM0001".into(),
        }]),
    )
}

pub fn swiss() -> CountryCode {
    CountryCode::new("CH").unwrap()
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Accepts `HC1:` text for the standard scheme and returns the exemption
/// credential, when configured, for the exemption scheme.
pub struct FakeDecoder {
    standard: HealthCredential,
    exemption: Option<HealthCredential>,
    failure: Option<DecodeError>,
    pub calls: Mutex<Vec<EnvelopeScheme>>,
}

impl FakeDecoder {
    pub fn new(standard: HealthCredential) -> Self {
        Self {
            standard,
            exemption: None,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_exemption(mut self, exemption: HealthCredential) -> Self {
        self.exemption = Some(exemption);
        self
    }

    pub fn failing(mut self, failure: DecodeError) -> Self {
        self.failure = Some(failure);
        self
    }
}

impl Decoder for FakeDecoder {
    fn decode(
        &self,
        encoded: &str,
        scheme: EnvelopeScheme,
    ) -> Result<HealthCredential, DecodeError> {
        self.calls.lock().push(scheme);
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        match scheme {
            EnvelopeScheme::Standard if encoded.starts_with(STANDARD_PREFIX) => {
                Ok(self.standard.clone())
            }
            EnvelopeScheme::Standard => Err(DecodeError::InvalidSchemePrefix),
            EnvelopeScheme::Exemption => self
                .exemption
                .clone()
                .ok_or(DecodeError::InvalidSchemePrefix),
        }
    }
}

// ---------------------------------------------------------------------------
// TrustEngine
// ---------------------------------------------------------------------------

/// Returns queued outcomes (trusted once the queue is empty) and records
/// the clock seen at the start and end of every verification.
pub struct FakeTrustEngine {
    outcomes: Mutex<VecDeque<Result<ValidationOutcome, TrustEngineError>>>,
    clock: Mutex<Option<DateTime<Utc>>>,
    pub observed: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    pub calls: AtomicUsize,
}

impl FakeTrustEngine {
    pub fn trusting() -> Self {
        Self::with_outcomes(Vec::new())
    }

    pub fn with_outcomes(outcomes: Vec<Result<ValidationOutcome, TrustEngineError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            clock: Mutex::new(None),
            observed: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrustEngine for FakeTrustEngine {
    fn set_evaluation_clock(&self, instant: DateTime<Utc>) {
        *self.clock.lock() = Some(instant);
    }

    async fn verify(
        &self,
        _credential: &HealthCredential,
    ) -> Result<ValidationOutcome, TrustEngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let before = self
            .clock
            .lock()
            .ok_or_else(|| TrustEngineError::Internal("clock not set".into()))?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let after = self
            .clock
            .lock()
            .ok_or_else(|| TrustEngineError::Internal("clock not set".into()))?;
        self.observed.lock().push((before, after));

        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ValidationOutcome::trusted()))
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub evaluation_clock: DateTime<Utc>,
    pub real_time: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub country_code: CountryCode,
    pub region: Option<Region>,
    pub local_window: ValidityWindow,
}

pub struct FakeRuleEngine {
    result: Result<RuleEvaluation, RuleEngineError>,
    pub seen: Mutex<Vec<SeenRequest>>,
}

impl FakeRuleEngine {
    pub fn returning(evaluation: RuleEvaluation) -> Self {
        Self {
            result: Ok(evaluation),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: RuleEngineError) -> Self {
        Self {
            result: Err(error),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn last(&self) -> Option<SeenRequest> {
        self.seen.lock().last().cloned()
    }
}

#[async_trait]
impl RuleEngine for FakeRuleEngine {
    async fn evaluate(
        &self,
        request: RuleEvaluationRequest<'_>,
    ) -> Result<RuleEvaluation, RuleEngineError> {
        self.seen.lock().push(SeenRequest {
            evaluation_clock: request.evaluation_clock,
            real_time: request.real_time,
            issued_at: request.issued_at,
            country_code: request.country_code.clone(),
            region: request.region.clone(),
            local_window: request.local_window,
        });
        self.result.clone()
    }
}

// ---------------------------------------------------------------------------
// DistributionService
// ---------------------------------------------------------------------------

pub struct FakeDistribution {
    was_updated: bool,
    fail: bool,
    value_sets: Option<Arc<ProductCatalog>>,
    pub forced: Mutex<Vec<bool>>,
}

impl FakeDistribution {
    pub fn new(was_updated: bool) -> Self {
        Self {
            was_updated,
            fail: false,
            value_sets: None,
            forced: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(false)
        }
    }

    pub fn publishing(catalog: ProductCatalog) -> Self {
        Self {
            value_sets: Some(Arc::new(catalog)),
            ..Self::new(true)
        }
    }
}

#[async_trait]
impl DistributionService for FakeDistribution {
    async fn refresh(&self, force: bool) -> RefreshOutcome {
        self.forced.lock().push(force);
        RefreshOutcome {
            was_updated: self.was_updated,
            error: self
                .fail
                .then(|| DistributionError::Unavailable("backend offline".into())),
        }
    }

    fn current_value_sets(&self) -> Option<Arc<ProductCatalog>> {
        self.value_sets.clone()
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Doubles {
    pub decoder: Arc<FakeDecoder>,
    pub trust: Arc<FakeTrustEngine>,
    pub trust_binding: Arc<TrustBinding>,
    pub rules: Arc<FakeRuleEngine>,
    pub distribution: Arc<FakeDistribution>,
}

impl Doubles {
    pub fn new(decoder: FakeDecoder, trust: FakeTrustEngine, rules: FakeRuleEngine) -> Self {
        let trust = Arc::new(trust);
        Self {
            decoder: Arc::new(decoder),
            trust_binding: Arc::new(TrustBinding::new(trust.clone())),
            trust,
            rules: Arc::new(rules),
            distribution: Arc::new(FakeDistribution::new(false)),
        }
    }

    /// Bindings sharing this set's trust binding, so every session built
    /// from them serializes on the same clock lock.
    pub fn bindings(&self) -> CollaboratorBindings {
        CollaboratorBindings {
            decoder: self.decoder.clone(),
            trust: self.trust_binding.clone(),
            rule_engine: self.rules.clone(),
            distribution: self.distribution.clone(),
        }
    }
}
