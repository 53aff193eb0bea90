#![deny(missing_docs)]

//! # covcert-core: Foundational Types for Health Credential Verification
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies. It uses only `serde`, `serde_json`,
//! `thiserror`, and `chrono` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Exhaustive credential sum type.** A decoded credential carries
//!    exactly one [`CredentialPayload`] variant. There is no "vaccination
//!    list that happens to be `None`" on a test credential; code that needs
//!    a vaccination record must `match`.
//!
//! 2. **Absent bounds are explicit.** [`ValidityWindow`] uses `Option` for
//!    both bounds. `None` means unbounded in that direction, never invalid.
//!
//! 3. **All instants are UTC.** Calendar dates from the payload are
//!    resolved into UTC instants through an evaluation calendar in
//!    [`temporal`], so day arithmetic stays calendar-correct across DST.
//!
//! 4. **Structured errors with `thiserror`.** Every error carries a stable
//!    machine code for user-facing mapping. No `Box<dyn Error>`, and no
//!    `.unwrap()` outside tests.

pub mod credential;
pub mod error;
pub mod jurisdiction;
pub mod payload;
pub mod rule;
pub mod temporal;
pub mod verdict;

// Re-export primary types at crate root for ergonomic imports.
pub use credential::{
    codes, CredentialPayload, CredentialType, Envelope, ExemptionEntry, HealthCredential, Person,
    PersonName, RecoveryEntry, TestEntry, TestType, VaccinationEntry,
};
pub use error::{ClassificationError, DecodeError, ValidationError};
pub use jurisdiction::{CountryCode, Region};
pub use payload::HealthCertPayload;
pub use rule::{RuleOutcome, RuleResult};
pub use temporal::EvaluationCalendar;
pub use verdict::{ValidityWindow, VerificationVerdict};
