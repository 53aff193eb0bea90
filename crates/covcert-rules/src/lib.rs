//! # covcert-rules: Rule Outcome Aggregation
//!
//! Jurisdictions publish their eligibility policy as declarative rules,
//! evaluated by an external rule engine. The engine returns one
//! [`RuleOutcome`](covcert_core::RuleOutcome) per rule plus, optionally,
//! the expiry it computed for the credential. This crate reduces that
//! output to a [`VerificationVerdict`](covcert_core::VerificationVerdict).
//!
//! ## Precedence
//!
//! The local validity window (`covcert-validity`) is an *input* to the
//! rule engine. The engine's expiry *supersedes* it in the verdict, since
//! it can encode policy that is not a fixed offset (booster-dependent
//! extensions, for example). The verdict therefore never re-exposes a
//! local `validFrom`.

pub mod aggregation;

pub use aggregation::{aggregate, failed_rule_ids};
