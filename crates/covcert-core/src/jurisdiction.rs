//! # Jurisdiction Identifiers
//!
//! Newtypes for the country and region a credential is checked against.
//! Rule sets are published per country, optionally narrowed to a region
//! (e.g. a canton or federal state with stricter entry rules).

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An ISO 3166-1 alpha-2 country code, normalized to upper case.
///
/// # Validation
///
/// Must be exactly two ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Create a country code, validating and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCountryCode`] unless the input is
    /// two ASCII letters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let trimmed = s.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode(s));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Access the country code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CountryCode> for String {
    fn from(code: CountryCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sub-national region identifier as published by the rule backend.
///
/// No format restrictions are imposed; regional naming varies by country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    /// Create a region identifier. Returns `None` for blank input so that
    /// an empty region is never sent to a rule engine.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let s = value.into();
        if s.trim().is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    /// Access the region identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
