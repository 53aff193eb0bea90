//! # Validity Calculator
//!
//! Computes `validFrom` / `validUntil` for one record from its dates, the
//! [`PolicyConstants`], and the [`ProductCatalog`].
//!
//! | Record      | validFrom                                    | validUntil                              |
//! |-------------|----------------------------------------------|-----------------------------------------|
//! | Vaccination | date, or date + grace for a single-dose series | date + `max_vaccination_validity_days` |
//! | Test        | sample collection timestamp                  | + PCR / RAT hours, `None` otherwise     |
//! | Recovery    | first positive + `recovery_validity_offset_days` | first positive + `recovery_max_validity_days` |
//! | Exemption   | unbounded                                    | unbounded                               |
//!
//! A bound that cannot be computed is `None`. For the three dated record
//! types that means the window is *not established*: [`ValidityCalculator::establish`]
//! turns it into an error so the caller rejects the credential rather than
//! reading `None` as "unbounded".

use chrono::{DateTime, TimeZone, Utc};

use covcert_core::temporal::{
    add_calendar_days, add_hours, parse_calendar_date, parse_iso8601, start_of_day,
};
use covcert_core::{RecoveryEntry, TestEntry, TestType, VaccinationEntry, ValidityWindow};

use crate::classifier::SelectedRecord;
use crate::error::{Bound, ValidityError};
use crate::policy::PolicyConstants;
use crate::products::ProductCatalog;

/// Validity window computation bound to a policy, a catalog, and the
/// calendar in which record dates are read.
#[derive(Debug, Clone)]
pub struct ValidityCalculator<'a, Tz: TimeZone = Utc> {
    policy: &'a PolicyConstants,
    catalog: &'a ProductCatalog,
    calendar: Tz,
}

impl<'a, Tz: TimeZone> ValidityCalculator<'a, Tz> {
    /// Create a calculator.
    pub fn new(policy: &'a PolicyConstants, catalog: &'a ProductCatalog, calendar: Tz) -> Self {
        Self {
            policy,
            catalog,
            calendar,
        }
    }

    /// The policy in use.
    pub fn policy(&self) -> &PolicyConstants {
        self.policy
    }

    // ------------------------------------------------------------------
    // Vaccination
    // ------------------------------------------------------------------

    /// Local midnight of the vaccination date.
    pub fn vaccination_date(&self, entry: &VaccinationEntry) -> Option<DateTime<Utc>> {
        self.calendar_date(&entry.vaccination_date)
    }

    /// Whether the record is a reduced schedule following past infection.
    pub fn had_past_infection(&self, entry: &VaccinationEntry) -> bool {
        self.catalog.had_past_infection(entry)
    }

    /// Start of vaccination validity.
    ///
    /// A completed single-dose series without past infection starts after
    /// the grace period; everything else starts on the vaccination date.
    /// `None` when the date is unparseable or the product is unknown.
    pub fn vaccination_valid_from(&self, entry: &VaccinationEntry) -> Option<DateTime<Utc>> {
        let date = self.vaccination_date(entry)?;
        let Some(required) = self.catalog.total_doses(&entry.medicinal_product) else {
            tracing::debug!(
                product = %entry.medicinal_product,
                "product not in catalog, vaccination validFrom not established"
            );
            return None;
        };

        let single_dose_series = entry.dose_number == entry.total_doses
            && required == 1
            && !self.had_past_infection(entry);

        if single_dose_series {
            add_calendar_days(
                date,
                self.policy.days_after_first_shot_for_single_dose,
                &self.calendar,
            )
        } else {
            Some(date)
        }
    }

    /// End of vaccination validity, measured from the vaccination date
    /// regardless of any grace period.
    pub fn vaccination_valid_until(&self, entry: &VaccinationEntry) -> Option<DateTime<Utc>> {
        let date = self.vaccination_date(entry)?;
        add_calendar_days(date, self.policy.max_vaccination_validity_days, &self.calendar)
    }

    // ------------------------------------------------------------------
    // Test
    // ------------------------------------------------------------------

    /// Sample collection instant.
    pub fn test_valid_from(&self, entry: &TestEntry) -> Option<DateTime<Utc>> {
        match parse_iso8601(&entry.sample_timestamp) {
            Ok(instant) => Some(instant),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable sample timestamp");
                None
            }
        }
    }

    /// Sample collection plus the PCR or RAT validity period. Any other
    /// test type has no defined period.
    pub fn test_valid_until(&self, entry: &TestEntry) -> Option<DateTime<Utc>> {
        let hours = match entry.kind() {
            TestType::Pcr => self.policy.pcr_test_validity_hours,
            TestType::Rat => self.policy.rat_test_validity_hours,
            TestType::Other(code) => {
                tracing::debug!(test_type = %code, "no validity period for test type");
                return None;
            }
        };
        add_hours(self.test_valid_from(entry)?, hours)
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    /// First positive test date plus the recovery offset.
    pub fn recovery_valid_from(&self, entry: &RecoveryEntry) -> Option<DateTime<Utc>> {
        let date = self.calendar_date(&entry.first_positive_test_date)?;
        add_calendar_days(date, self.policy.recovery_validity_offset_days, &self.calendar)
    }

    /// First positive test date plus the maximum recovery validity.
    pub fn recovery_valid_until(&self, entry: &RecoveryEntry) -> Option<DateTime<Utc>> {
        let date = self.calendar_date(&entry.first_positive_test_date)?;
        add_calendar_days(date, self.policy.recovery_max_validity_days, &self.calendar)
    }

    // ------------------------------------------------------------------
    // Windows
    // ------------------------------------------------------------------

    /// Both bounds for `record`. Exemptions are unbounded.
    pub fn window_for(&self, record: SelectedRecord<'_>) -> ValidityWindow {
        match record {
            SelectedRecord::Vaccination(v) => ValidityWindow::new(
                self.vaccination_valid_from(v),
                self.vaccination_valid_until(v),
            ),
            SelectedRecord::Test(t) => {
                ValidityWindow::new(self.test_valid_from(t), self.test_valid_until(t))
            }
            SelectedRecord::Recovery(r) => {
                ValidityWindow::new(self.recovery_valid_from(r), self.recovery_valid_until(r))
            }
            SelectedRecord::VaccinationExemption(_) => ValidityWindow::unbounded(),
        }
    }

    /// The window for `record`, requiring both bounds for dated record
    /// types.
    ///
    /// # Errors
    ///
    /// Returns [`ValidityError::Unestablished`] naming the first missing
    /// bound of a vaccination, test, or recovery record.
    pub fn establish(&self, record: SelectedRecord<'_>) -> Result<ValidityWindow, ValidityError> {
        let window = self.window_for(record);
        if matches!(record, SelectedRecord::VaccinationExemption(_)) {
            return Ok(window);
        }

        let credential_type = record.credential_type();
        let missing = if window.valid_from.is_none() {
            Some(Bound::ValidFrom)
        } else if window.valid_until.is_none() {
            Some(Bound::ValidUntil)
        } else {
            None
        };

        match missing {
            Some(bound) => {
                tracing::warn!(%credential_type, %bound, "validity window not established");
                Err(ValidityError::Unestablished {
                    credential_type,
                    bound,
                })
            }
            None => Ok(window),
        }
    }

    fn calendar_date(&self, value: &str) -> Option<DateTime<Utc>> {
        match parse_calendar_date(value) {
            Ok(date) => start_of_day(date, &self.calendar),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable calendar date");
                None
            }
        }
    }
}
