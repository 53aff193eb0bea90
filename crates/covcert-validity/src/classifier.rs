//! # Representative Record Selection
//!
//! A credential may carry several records of its type, but validity is
//! computed for one. For vaccinations and tests the caller names the
//! record (one record is validated per scan); recoveries and exemptions
//! always use the first entry.

use covcert_core::{
    ClassificationError, CredentialPayload, CredentialType, ExemptionEntry, HealthCredential,
    RecoveryEntry, TestEntry, VaccinationEntry,
};

/// A borrowed reference to the record chosen for validity computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedRecord<'a> {
    /// A vaccination record.
    Vaccination(&'a VaccinationEntry),
    /// A test record.
    Test(&'a TestEntry),
    /// A recovery record.
    Recovery(&'a RecoveryEntry),
    /// A vaccination exemption record.
    VaccinationExemption(&'a ExemptionEntry),
}

impl SelectedRecord<'_> {
    /// The credential type of the record.
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Vaccination(_) => CredentialType::Vaccination,
            Self::Test(_) => CredentialType::Test,
            Self::Recovery(_) => CredentialType::Recovery,
            Self::VaccinationExemption(_) => CredentialType::VaccinationExemption,
        }
    }
}

/// Select the representative record of `credential`.
///
/// `index` picks the vaccination or test record; it is ignored for
/// recovery and exemption credentials, which always use their first entry.
///
/// # Errors
///
/// - [`ClassificationError::MalformedCredential`] if the record list is empty.
/// - [`ClassificationError::RecordIndexOutOfRange`] if `index` is past the
///   end of a vaccination or test list.
pub fn select_record(
    credential: &HealthCredential,
    index: usize,
) -> Result<SelectedRecord<'_>, ClassificationError> {
    let payload = credential.payload();
    let credential_type = payload.credential_type();

    if payload.is_empty() {
        return Err(ClassificationError::MalformedCredential {
            credential_type,
            reason: "record list is empty".into(),
        });
    }

    let out_of_range = |len: usize| ClassificationError::RecordIndexOutOfRange {
        credential_type,
        index,
        len,
    };

    match payload {
        CredentialPayload::Vaccination(v) => v
            .get(index)
            .map(SelectedRecord::Vaccination)
            .ok_or_else(|| out_of_range(v.len())),
        CredentialPayload::Test(t) => t
            .get(index)
            .map(SelectedRecord::Test)
            .ok_or_else(|| out_of_range(t.len())),
        CredentialPayload::Recovery(r) => Ok(SelectedRecord::Recovery(&r[0])),
        CredentialPayload::VaccinationExemption(e) => {
            Ok(SelectedRecord::VaccinationExemption(&e[0]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use covcert_core::{codes, Envelope, Person, PersonName};

    fn holder() -> Person {
        Person {
            name: PersonName {
                standardized_family_name: "MUSTER".into(),
                ..PersonName::default()
            },
            date_of_birth: "1980".into(),
        }
    }

    fn recovery(fr: &str) -> RecoveryEntry {
        RecoveryEntry {
            disease: codes::SARS_COV_2.into(),
            first_positive_test_date: fr.into(),
            country: "CH".into(),
            issuer: "BAG".into(),
            declared_valid_from: None,
            declared_valid_until: None,
            certificate_identifier: format!("urn:uvci:{fr}"),
        }
    }

    fn test_entry(sc: &str) -> TestEntry {
        TestEntry {
            disease: codes::SARS_COV_2.into(),
            test_type: codes::TEST_TYPE_RAT.into(),
            test_name: None,
            manufacturer: Some("1232".into()),
            sample_timestamp: sc.into(),
            result_timestamp: None,
            result: codes::TEST_RESULT_NEGATIVE.into(),
            testing_centre: None,
            country: "CH".into(),
            issuer: "BAG".into(),
            certificate_identifier: format!("urn:uvci:{sc}"),
        }
    }

    fn credential(payload: CredentialPayload) -> HealthCredential {
        HealthCredential::new("HC1:", Envelope::default(), holder(), payload)
    }

    #[test]
    fn recovery_uses_first_entry_regardless_of_index() {
        let cred = credential(CredentialPayload::Recovery(vec![
            recovery("2021-01-01"),
            recovery("2021-05-01"),
        ]));
        match select_record(&cred, 7).unwrap() {
            SelectedRecord::Recovery(r) => assert_eq!(r.first_positive_test_date, "2021-01-01"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_uses_caller_index() {
        let cred = credential(CredentialPayload::Test(vec![
            test_entry("2021-09-01T10:00:00Z"),
            test_entry("2021-09-02T10:00:00Z"),
        ]));
        match select_record(&cred, 1).unwrap() {
            SelectedRecord::Test(t) => assert_eq!(t.sample_timestamp, "2021-09-02T10:00:00Z"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn index_past_end_is_rejected() {
        let cred = credential(CredentialPayload::Test(vec![test_entry("2021-09-01T10:00:00Z")]));
        assert_eq!(
            select_record(&cred, 1).unwrap_err(),
            ClassificationError::RecordIndexOutOfRange {
                credential_type: CredentialType::Test,
                index: 1,
                len: 1,
            }
        );
    }

    #[test]
    fn empty_list_is_malformed() {
        let cred = credential(CredentialPayload::Vaccination(vec![]));
        let err = select_record(&cred, 0).unwrap_err();
        assert_eq!(err.code(), "C|MAL");
    }
}
