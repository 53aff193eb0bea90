//! # Policy Constants
//!
//! Fixed offsets used by the validity calculator. Defaults follow the EU
//! Digital COVID Certificate acceptance periods; jurisdictions override
//! them through configuration.

use serde::{Deserialize, Serialize};

/// Offsets applied to record dates when computing validity windows.
///
/// Every field has a default, so a partial configuration document only
/// needs to name the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConstants {
    /// Days a vaccination stays valid after the vaccination date.
    pub max_vaccination_validity_days: u32,
    /// Grace period before a single-dose vaccination becomes valid.
    pub days_after_first_shot_for_single_dose: u32,
    /// Hours a PCR test stays valid after sample collection.
    pub pcr_test_validity_hours: u32,
    /// Hours a rapid antigen test stays valid after sample collection.
    pub rat_test_validity_hours: u32,
    /// Days after the first positive test before recovery is valid.
    pub recovery_validity_offset_days: u32,
    /// Days after the first positive test that recovery stays valid.
    pub recovery_max_validity_days: u32,
}

impl Default for PolicyConstants {
    fn default() -> Self {
        Self {
            max_vaccination_validity_days: 365,
            days_after_first_shot_for_single_dose: 15,
            pcr_test_validity_hours: 72,
            rat_test_validity_hours: 24,
            recovery_validity_offset_days: 10,
            recovery_max_validity_days: 180,
        }
    }
}
