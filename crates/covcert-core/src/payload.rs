//! # Health Certificate Payload
//!
//! The JSON payload carried inside the signed envelope. On the wire every
//! record list is optional; a well-formed payload populates exactly one.
//! [`HealthCertPayload::classify`] turns that convention into the
//! exhaustive [`CredentialPayload`] sum type.

use serde::{Deserialize, Serialize};

use crate::credential::{
    CredentialPayload, CredentialType, ExemptionEntry, Person, PersonName, RecoveryEntry,
    TestEntry, VaccinationEntry,
};
use crate::error::ClassificationError;

/// The health-certificate payload as serialized inside the envelope.
///
/// Fields use `#[serde(default)]` for resilience against schema evolution;
/// unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCertPayload {
    /// Schema version.
    #[serde(rename = "ver", default)]
    pub version: String,
    /// Holder name.
    #[serde(rename = "nam")]
    pub name: PersonName,
    /// Holder date of birth.
    #[serde(rename = "dob", default)]
    pub date_of_birth: String,
    /// Vaccination records.
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub vaccinations: Option<Vec<VaccinationEntry>>,
    /// Test records.
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<TestEntry>>,
    /// Recovery records.
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub recoveries: Option<Vec<RecoveryEntry>>,
    /// Vaccination exemption records.
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub exemptions: Option<Vec<ExemptionEntry>>,
}

impl HealthCertPayload {
    /// Parse a payload from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed JSON or
    /// missing required fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Which record lists are present (populated or not).
    pub fn present_types(&self) -> Vec<CredentialType> {
        let mut present = Vec::new();
        if self.vaccinations.is_some() {
            present.push(CredentialType::Vaccination);
        }
        if self.tests.is_some() {
            present.push(CredentialType::Test);
        }
        if self.recoveries.is_some() {
            present.push(CredentialType::Recovery);
        }
        if self.exemptions.is_some() {
            present.push(CredentialType::VaccinationExemption);
        }
        present
    }

    /// Split the payload into holder and exactly one record list.
    ///
    /// # Errors
    ///
    /// - [`ClassificationError::NoCredentialType`] if no list is present.
    /// - [`ClassificationError::MultipleCredentialTypes`] if more than one is.
    /// - [`ClassificationError::MalformedCredential`] if the one present
    ///   list is empty.
    pub fn classify(self) -> Result<(Person, CredentialPayload), ClassificationError> {
        let present = self.present_types();
        if present.len() > 1 {
            return Err(ClassificationError::MultipleCredentialTypes(present));
        }

        let holder = Person {
            name: self.name,
            date_of_birth: self.date_of_birth,
        };

        let payload = if let Some(v) = self.vaccinations {
            CredentialPayload::Vaccination(v)
        } else if let Some(t) = self.tests {
            CredentialPayload::Test(t)
        } else if let Some(r) = self.recoveries {
            CredentialPayload::Recovery(r)
        } else if let Some(e) = self.exemptions {
            CredentialPayload::VaccinationExemption(e)
        } else {
            return Err(ClassificationError::NoCredentialType);
        };

        if payload.is_empty() {
            return Err(ClassificationError::MalformedCredential {
                credential_type: payload.credential_type(),
                reason: "record list is empty".into(),
            });
        }

        Ok((holder, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "ver": "1.3.0",
            "nam": {"fn": "Müller", "gn": "Céline", "fnt": "MUELLER", "gnt": "CELINE"},
            "dob": "1943-02-01"
        })
    }

    fn with(key: &str, records: serde_json::Value) -> HealthCertPayload {
        let mut v = base();
        v[key] = records;
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn classifies_vaccination_payload() {
        let payload = with(
            "v",
            json!([{
                "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1507",
                "ma": "ORG-100031184", "dn": 2, "sd": 2, "dt": "2021-04-22",
                "co": "CH", "is": "Bundesamt für Gesundheit (BAG)",
                "ci": "urn:uvci:01:CH:2987CC9617DD5593806D4285"
            }]),
        );
        let (holder, records) = payload.classify().unwrap();
        assert_eq!(holder.name.standardized_family_name, "MUELLER");
        match records {
            CredentialPayload::Vaccination(v) => {
                assert_eq!(v[0].medicinal_product, "EU/1/20/1507");
                assert_eq!(v[0].dose_number, 2);
            }
            other => panic!("expected vaccination, got {other:?}"),
        }
    }

    #[test]
    fn classifies_test_payload_with_optional_fields() {
        let payload = with(
            "t",
            json!([{
                "tg": "840539006", "tt": "LP6464-4", "nm": "Roche LightCycler",
                "sc": "2021-09-01T10:00:00Z", "tr": "260415000", "tc": "Testcenter",
                "co": "CH", "is": "BAG", "ci": "urn:uvci:01:CH:T1"
            }]),
        );
        let (_, records) = payload.classify().unwrap();
        match records {
            CredentialPayload::Test(t) => {
                assert!(t[0].is_pcr());
                assert!(t[0].is_negative());
                assert_eq!(t[0].result_timestamp, None);
            }
            other => panic!("expected test, got {other:?}"),
        }
    }

    #[test]
    fn rejects_payload_without_records() {
        let payload: HealthCertPayload = serde_json::from_value(base()).unwrap();
        assert_eq!(
            payload.classify().unwrap_err(),
            ClassificationError::NoCredentialType
        );
    }

    #[test]
    fn rejects_empty_record_list() {
        let err = with("r", json!([])).classify().unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::MalformedCredential {
                credential_type: CredentialType::Recovery,
                ..
            }
        ));
    }

    #[test]
    fn rejects_multiple_record_types() {
        let mut v = base();
        v["r"] = json!([]);
        v["e"] = json!([]);
        let payload: HealthCertPayload = serde_json::from_value(v).unwrap();
        assert_eq!(
            payload.classify().unwrap_err(),
            ClassificationError::MultipleCredentialTypes(vec![
                CredentialType::Recovery,
                CredentialType::VaccinationExemption
            ])
        );
    }

    #[test]
    fn from_json_reports_syntax_errors() {
        assert!(HealthCertPayload::from_json("{not json").is_err());
    }
}
