//! # covcert-validity: Validity Window Computation
//!
//! Computes the local `[validFrom, validUntil)` window for a single
//! vaccination, test, or recovery record. These windows are *inputs* to the
//! jurisdiction rule engine; the published verdict's expiry comes from the
//! rule engine (see `covcert-rules`).
//!
//! ## Architecture
//!
//! ```text
//! HealthCredential ──classifier──▶ SelectedRecord ──calculator──▶ ValidityWindow
//!                                                     ▲
//!                         PolicyConstants ────────────┤
//!                         ProductCatalog ─────────────┤
//!                         EvaluationCalendar ─────────┘
//! ```
//!
//! Everything here is pure: no I/O and no clock reads. The evaluation
//! instant is only ever compared against a window by the caller.

pub mod calculator;
pub mod classifier;
pub mod error;
pub mod policy;
pub mod products;

pub use calculator::ValidityCalculator;
pub use classifier::{select_record, SelectedRecord};
pub use error::{Bound, ValidityError};
pub use policy::PolicyConstants;
pub use products::{AcceptedProduct, ProductCatalog};
