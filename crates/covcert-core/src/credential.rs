//! # Health Credential Model
//!
//! The decoded, immutable form of a health credential: envelope metadata,
//! holder identity, and exactly one kind of record list.
//!
//! Record field names follow the payload's short wire keys through serde
//! renames (`tg`, `dn`, `sc`, …) so the same types serve both as the
//! structured model and as the deserialization target in
//! [`payload`](crate::payload).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClassificationError;
use crate::payload::HealthCertPayload;

/// Value-set codes referenced by the validity logic.
pub mod codes {
    /// SNOMED CT code for COVID-19 (the only accepted target disease).
    pub const SARS_COV_2: &str = "840539006";
    /// LOINC code for nucleic acid amplification (PCR) tests.
    pub const TEST_TYPE_PCR: &str = "LP6464-4";
    /// LOINC code for rapid antigen tests.
    pub const TEST_TYPE_RAT: &str = "LP217198-3";
    /// SNOMED CT code for "not detected".
    pub const TEST_RESULT_NEGATIVE: &str = "260415000";
    /// SNOMED CT code for "detected".
    pub const TEST_RESULT_POSITIVE: &str = "260373001";
}

// ---------------------------------------------------------------------------
// CredentialType
// ---------------------------------------------------------------------------

/// The four kinds of health credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Vaccination record(s).
    Vaccination,
    /// Test record(s).
    Test,
    /// Recovery record(s).
    Recovery,
    /// Acknowledgement of a medical vaccination exemption.
    VaccinationExemption,
}

impl CredentialType {
    /// All credential types, in payload order.
    pub fn all() -> &'static [CredentialType] {
        &[
            Self::Vaccination,
            Self::Test,
            Self::Recovery,
            Self::VaccinationExemption,
        ]
    }

    /// The snake_case name used in logs and serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vaccination => "vaccination",
            Self::Test => "test",
            Self::Recovery => "recovery",
            Self::VaccinationExemption => "vaccination_exemption",
        }
    }
}

impl std::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Holder
// ---------------------------------------------------------------------------

/// Holder name as printed and in ICAO-standardized transliteration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonName {
    /// Family name.
    #[serde(rename = "fn", default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Given name.
    #[serde(rename = "gn", default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Standardized family name (ICAO 9303 transliteration).
    #[serde(rename = "fnt")]
    pub standardized_family_name: String,
    /// Standardized given name.
    #[serde(rename = "gnt", default, skip_serializing_if = "Option::is_none")]
    pub standardized_given_name: Option<String>,
}

/// The credential holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Holder name.
    #[serde(rename = "nam")]
    pub name: PersonName,
    /// Date of birth, possibly partial (`yyyy`, `yyyy-MM`, or empty).
    #[serde(rename = "dob")]
    pub date_of_birth: String,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One vaccination event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaccinationEntry {
    /// Target disease code.
    #[serde(rename = "tg")]
    pub disease: String,
    /// Vaccine or prophylaxis code.
    #[serde(rename = "vp")]
    pub vaccine: String,
    /// Medicinal product identifier (e.g. `EU/1/20/1528`).
    #[serde(rename = "mp")]
    pub medicinal_product: String,
    /// Marketing authorization holder or manufacturer.
    #[serde(rename = "ma")]
    pub marketing_authorization_holder: String,
    /// Dose number in the series.
    #[serde(rename = "dn")]
    pub dose_number: u32,
    /// Total doses in the series as recorded by the issuer.
    #[serde(rename = "sd")]
    pub total_doses: u32,
    /// Date of vaccination, `yyyy-MM-dd`.
    #[serde(rename = "dt")]
    pub vaccination_date: String,
    /// Country of vaccination.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

impl VaccinationEntry {
    /// Whether the record targets COVID-19.
    pub fn is_target_disease_correct(&self) -> bool {
        self.disease == codes::SARS_COV_2
    }
}

/// Test type derived from the LOINC code on a test record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestType {
    /// Nucleic acid amplification test.
    Pcr,
    /// Rapid antigen test.
    Rat,
    /// Any other code. Carries no validity window.
    Other(String),
}

impl TestType {
    /// Classify a test type code.
    pub fn from_code(code: &str) -> Self {
        match code {
            codes::TEST_TYPE_PCR => Self::Pcr,
            codes::TEST_TYPE_RAT => Self::Rat,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One test event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestEntry {
    /// Target disease code.
    #[serde(rename = "tg")]
    pub disease: String,
    /// Test type code.
    #[serde(rename = "tt")]
    pub test_type: String,
    /// Test name (NAAT tests only).
    #[serde(rename = "nm", default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
    /// Test device identifier (RAT tests only).
    #[serde(rename = "ma", default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Sample collection timestamp, ISO 8601.
    #[serde(rename = "sc")]
    pub sample_timestamp: String,
    /// Result timestamp, ISO 8601.
    #[serde(rename = "dr", default, skip_serializing_if = "Option::is_none")]
    pub result_timestamp: Option<String>,
    /// Test result code.
    #[serde(rename = "tr")]
    pub result: String,
    /// Testing centre or facility.
    #[serde(rename = "tc", default, skip_serializing_if = "Option::is_none")]
    pub testing_centre: Option<String>,
    /// Country of test.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

impl TestEntry {
    /// The classified test type.
    pub fn kind(&self) -> TestType {
        TestType::from_code(&self.test_type)
    }

    /// Whether this is a PCR test.
    pub fn is_pcr(&self) -> bool {
        self.kind() == TestType::Pcr
    }

    /// Whether this is a rapid antigen test.
    pub fn is_rat(&self) -> bool {
        self.kind() == TestType::Rat
    }

    /// Whether the result is "not detected".
    pub fn is_negative(&self) -> bool {
        self.result == codes::TEST_RESULT_NEGATIVE
    }

    /// Whether the record targets COVID-19.
    pub fn is_target_disease_correct(&self) -> bool {
        self.disease == codes::SARS_COV_2
    }
}

/// One recovery event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryEntry {
    /// Target disease code.
    #[serde(rename = "tg")]
    pub disease: String,
    /// Date of the first positive test, `yyyy-MM-dd`.
    #[serde(rename = "fr")]
    pub first_positive_test_date: String,
    /// Country of test.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Issuer-declared valid-from date. Informational only.
    #[serde(rename = "df", default, skip_serializing_if = "Option::is_none")]
    pub declared_valid_from: Option<String>,
    /// Issuer-declared valid-until date. Informational only.
    #[serde(rename = "du", default, skip_serializing_if = "Option::is_none")]
    pub declared_valid_until: Option<String>,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

impl RecoveryEntry {
    /// Whether the record targets COVID-19.
    pub fn is_target_disease_correct(&self) -> bool {
        self.disease == codes::SARS_COV_2
    }
}

/// One vaccination exemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionEntry {
    /// Target disease code.
    #[serde(rename = "tg")]
    pub disease: String,
    /// Issuing country.
    #[serde(rename = "co")]
    pub country: String,
    /// Certificate issuer.
    #[serde(rename = "is")]
    pub issuer: String,
    /// Issuer-declared end of the exemption. Never used for the verdict.
    #[serde(rename = "du", default, skip_serializing_if = "Option::is_none")]
    pub declared_valid_until: Option<String>,
    /// Unique certificate identifier.
    #[serde(rename = "ci")]
    pub certificate_identifier: String,
}

// ---------------------------------------------------------------------------
// CredentialPayload
// ---------------------------------------------------------------------------

/// The record list of a credential. Exactly one kind per credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum CredentialPayload {
    /// Vaccination records.
    Vaccination(Vec<VaccinationEntry>),
    /// Test records.
    Test(Vec<TestEntry>),
    /// Recovery records.
    Recovery(Vec<RecoveryEntry>),
    /// Vaccination exemption records.
    VaccinationExemption(Vec<ExemptionEntry>),
}

impl CredentialPayload {
    /// The credential type this payload represents.
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Vaccination(_) => CredentialType::Vaccination,
            Self::Test(_) => CredentialType::Test,
            Self::Recovery(_) => CredentialType::Recovery,
            Self::VaccinationExemption(_) => CredentialType::VaccinationExemption,
        }
    }

    /// Number of records in the list.
    pub fn len(&self) -> usize {
        match self {
            Self::Vaccination(v) => v.len(),
            Self::Test(t) => t.len(),
            Self::Recovery(r) => r.len(),
            Self::VaccinationExemption(e) => e.len(),
        }
    }

    /// Whether the record list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Certificate identifiers of every record, in order.
    pub fn certificate_identifiers(&self) -> Vec<&str> {
        match self {
            Self::Vaccination(v) => v.iter().map(|e| e.certificate_identifier.as_str()).collect(),
            Self::Test(t) => t.iter().map(|e| e.certificate_identifier.as_str()).collect(),
            Self::Recovery(r) => r.iter().map(|e| e.certificate_identifier.as_str()).collect(),
            Self::VaccinationExemption(e) => {
                e.iter().map(|e| e.certificate_identifier.as_str()).collect()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// HealthCredential
// ---------------------------------------------------------------------------

/// Metadata carried by the signed envelope rather than the payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Issuing country from the envelope claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// When the envelope was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    /// When the envelope expires (technical expiry, not business rules).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A decoded health credential. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCredential {
    encoded: String,
    envelope: Envelope,
    holder: Person,
    payload: CredentialPayload,
}

impl HealthCredential {
    /// Assemble a credential from its decoded parts.
    pub fn new(
        encoded: impl Into<String>,
        envelope: Envelope,
        holder: Person,
        payload: CredentialPayload,
    ) -> Self {
        Self {
            encoded: encoded.into(),
            envelope,
            holder,
            payload,
        }
    }

    /// Assemble a credential from a wire payload, classifying it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassificationError`] if the payload does not carry
    /// exactly one populated record list.
    pub fn from_payload(
        encoded: impl Into<String>,
        envelope: Envelope,
        payload: HealthCertPayload,
    ) -> Result<Self, ClassificationError> {
        let (holder, payload) = payload.classify()?;
        Ok(Self::new(encoded, envelope, holder, payload))
    }

    /// The original encoded text, as scanned.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Envelope metadata.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Issuance instant from the envelope.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.envelope.issued_at
    }

    /// Technical expiry instant from the envelope.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.envelope.expires_at
    }

    /// The credential holder.
    pub fn holder(&self) -> &Person {
        &self.holder
    }

    /// The record list.
    pub fn payload(&self) -> &CredentialPayload {
        &self.payload
    }

    /// The credential type.
    pub fn credential_type(&self) -> CredentialType {
        self.payload.credential_type()
    }

    /// Certificate identifiers of every record.
    pub fn certificate_identifiers(&self) -> Vec<&str> {
        self.payload.certificate_identifiers()
    }
}
