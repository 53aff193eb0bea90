//! # Validity Windows & Verdicts
//!
//! [`ValidityWindow`] is the half-open interval `[valid_from, valid_until)`
//! during which a credential is accepted. [`VerificationVerdict`] is the
//! sole output of jurisdiction eligibility checking.
//!
//! Both are recomputed for every verification call against the caller's
//! evaluation clock and are never cached.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validity interval with optional bounds.
///
/// An absent bound is unbounded in that direction: `valid_from: None`
/// means "valid from issuance", never "always invalid".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// Inclusive lower bound.
    pub valid_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub valid_until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    /// A window with no bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Construct from both bounds.
    pub fn new(valid_from: Option<DateTime<Utc>>, valid_until: Option<DateTime<Utc>>) -> Self {
        Self {
            valid_from,
            valid_until,
        }
    }

    /// Whether `instant` lies inside the window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let after_start = self.valid_from.map_or(true, |from| instant >= from);
        let before_end = self.valid_until.map_or(true, |until| instant < until);
        after_start && before_end
    }

    /// Whether both bounds are present.
    pub fn is_fully_bounded(&self) -> bool {
        self.valid_from.is_some() && self.valid_until.is_some()
    }
}

/// Outcome of jurisdiction eligibility checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    /// Whether the credential is accepted.
    pub is_valid: bool,
    /// Start of acceptance, if bounded.
    pub valid_from: Option<DateTime<Utc>>,
    /// End of acceptance, if bounded.
    pub valid_until: Option<DateTime<Utc>>,
}

impl VerificationVerdict {
    /// A rejecting verdict with no window. Used when validity cannot be
    /// established at all.
    pub fn rejected() -> Self {
        Self {
            is_valid: false,
            valid_from: None,
            valid_until: None,
        }
    }

    /// The verdict's window.
    pub fn window(&self) -> ValidityWindow {
        ValidityWindow::new(self.valid_from, self.valid_until)
    }
}
