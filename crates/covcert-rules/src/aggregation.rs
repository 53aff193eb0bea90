//! # Aggregation
//!
//! 1. A credential is valid when no outcome failed.
//! 2. Vaccination exemptions are always valid and always unbounded,
//!    whatever the outcomes say.
//! 3. The verdict's `valid_until` is the rule engine's date when it
//!    supplied one; `valid_from` is never set.
//!
//! Aggregation is pure: the same inputs always give the same verdict.

use chrono::{DateTime, Utc};

use covcert_core::{CredentialType, RuleOutcome, VerificationVerdict};

/// Reduce rule outcomes and the engine-supplied expiry into a verdict.
pub fn aggregate(
    credential_type: CredentialType,
    outcomes: &[RuleOutcome],
    rule_engine_valid_until: Option<DateTime<Utc>>,
) -> VerificationVerdict {
    let failed = failed_rule_ids(outcomes);

    match credential_type {
        CredentialType::VaccinationExemption => {
            if !failed.is_empty() {
                tracing::debug!(
                    failed = ?failed,
                    "ignoring failed rules for vaccination exemption"
                );
            }
            VerificationVerdict {
                is_valid: true,
                valid_from: None,
                valid_until: None,
            }
        }
        CredentialType::Vaccination | CredentialType::Test | CredentialType::Recovery => {
            if !failed.is_empty() {
                tracing::debug!(%credential_type, failed = ?failed, "rules failed");
            }
            VerificationVerdict {
                is_valid: failed.is_empty(),
                valid_from: None,
                valid_until: rule_engine_valid_until,
            }
        }
    }
}

/// Identifiers of the rules that failed, in outcome order.
pub fn failed_rule_ids(outcomes: &[RuleOutcome]) -> Vec<&str> {
    outcomes
        .iter()
        .filter(|o| o.is_fail())
        .map(|o| o.rule_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use covcert_core::RuleResult;
    use proptest::prelude::*;

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn failing_test_rule_keeps_engine_expiry() {
        let outcomes = vec![
            RuleOutcome::pass("GR-CH-0001"),
            RuleOutcome::fail("TR-CH-0002"),
        ];
        let until = instant("2021-12-01T00:00:00Z");
        let verdict = aggregate(CredentialType::Test, &outcomes, Some(until));
        assert_eq!(
            verdict,
            VerificationVerdict {
                is_valid: false,
                valid_from: None,
                valid_until: Some(until),
            }
        );
    }

    #[test]
    fn all_passing_is_valid() {
        let outcomes = vec![RuleOutcome::pass("VR-CH-0000"), RuleOutcome::pass("VR-CH-0001")];
        let until = instant("2022-02-26T00:00:00Z");
        let verdict = aggregate(CredentialType::Vaccination, &outcomes, Some(until));
        assert!(verdict.is_valid);
        assert_eq!(verdict.valid_from, None);
        assert_eq!(verdict.valid_until, Some(until));
    }

    #[test]
    fn no_outcomes_is_valid_without_expiry() {
        let verdict = aggregate(CredentialType::Recovery, &[], None);
        assert!(verdict.is_valid);
        assert_eq!(verdict.valid_until, None);
    }

    #[test]
    fn exemption_ignores_failures_and_engine_expiry() {
        let outcomes = vec![RuleOutcome::fail("GR-CH-0001"), RuleOutcome::fail("GR-CH-0002")];
        let verdict = aggregate(
            CredentialType::VaccinationExemption,
            &outcomes,
            Some(instant("2021-12-01T00:00:00Z")),
        );
        assert_eq!(
            verdict,
            VerificationVerdict {
                is_valid: true,
                valid_from: None,
                valid_until: None,
            }
        );
    }

    #[test]
    fn failed_ids_preserve_order() {
        let outcomes = vec![
            RuleOutcome::fail("B"),
            RuleOutcome::pass("A"),
            RuleOutcome::fail("C"),
        ];
        assert_eq!(failed_rule_ids(&outcomes), vec!["B", "C"]);
    }

    fn arb_outcome() -> impl Strategy<Value = RuleOutcome> {
        ("[A-Z]{2}-CH-[0-9]{4}", any::<bool>()).prop_map(|(id, pass)| RuleOutcome {
            rule_id: id,
            result: if pass { RuleResult::Pass } else { RuleResult::Fail },
            description: None,
        })
    }

    fn arb_type() -> impl Strategy<Value = CredentialType> {
        prop::sample::select(CredentialType::all().to_vec())
    }

    proptest! {
        #[test]
        fn aggregation_is_idempotent(
            credential_type in arb_type(),
            outcomes in prop::collection::vec(arb_outcome(), 0..12),
            until_secs in prop::option::of(0i64..4_000_000_000),
        ) {
            let until = until_secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0));
            let first = aggregate(credential_type, &outcomes, until);
            let second = aggregate(credential_type, &outcomes, until);
            prop_assert_eq!(first, second);
            prop_assert_eq!(first.valid_from, None);
        }

        #[test]
        fn exemption_is_always_valid_and_unbounded(
            outcomes in prop::collection::vec(arb_outcome(), 0..12),
            until_secs in prop::option::of(0i64..4_000_000_000),
        ) {
            let until = until_secs.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0));
            let verdict = aggregate(CredentialType::VaccinationExemption, &outcomes, until);
            prop_assert!(verdict.is_valid);
            prop_assert_eq!(verdict.window(), covcert_core::ValidityWindow::unbounded());
        }

        #[test]
        fn dated_types_are_valid_iff_nothing_failed(
            outcomes in prop::collection::vec(arb_outcome(), 0..12),
        ) {
            let verdict = aggregate(CredentialType::Test, &outcomes, None);
            prop_assert_eq!(verdict.is_valid, outcomes.iter().all(|o| !o.is_fail()));
        }
    }
}
