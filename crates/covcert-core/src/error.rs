//! # Error Hierarchy
//!
//! Structured error types shared across the workspace, built with
//! `thiserror`.
//!
//! Every error exposes a stable `code()` so that callers can map it to a
//! user-facing message without parsing `Display` output. The codes for
//! decode failures (`D|…`) are the ones published to existing clients and
//! must not change.

use thiserror::Error;

use crate::credential::CredentialType;

/// Failure to turn raw credential text into a [`HealthCredential`].
///
/// Decode failures are always terminal for the call that produced them,
/// with one exception handled by the orchestrator: an
/// [`InvalidSchemePrefix`](DecodeError::InvalidSchemePrefix) on the
/// standard envelope triggers the exemption fallback.
///
/// [`HealthCredential`]: crate::credential::HealthCredential
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The text does not start with the expected envelope marker.
    #[error("invalid scheme prefix")]
    InvalidSchemePrefix,

    /// The radix-45 text layer could not be decoded.
    #[error("base45 decoding failed")]
    Base45Failed,

    /// The compressed envelope could not be inflated.
    #[error("decompression failed")]
    DecompressionFailed,

    /// The signed envelope or its binary map could not be deserialized.
    #[error("envelope deserialization failed")]
    EnvelopeDeserializationFailed,

    /// The envelope decoded but its health-certificate payload is unusable.
    #[error("health certificate payload is invalid: {0}")]
    HcertInvalid(String),
}

impl DecodeError {
    /// Stable machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSchemePrefix => "D|ISP",
            Self::Base45Failed => "D|B45",
            Self::DecompressionFailed => "D|ZLB",
            Self::EnvelopeDeserializationFailed => "D|CDF",
            Self::HcertInvalid(_) => "D|HII",
        }
    }
}

impl From<ClassificationError> for DecodeError {
    fn from(err: ClassificationError) -> Self {
        Self::HcertInvalid(err.to_string())
    }
}

/// Failure to determine a credential's type or select its representative
/// record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// The payload carries none of the known record lists.
    #[error("payload carries no vaccination, test, recovery or exemption records")]
    NoCredentialType,

    /// The payload carries more than one record list.
    #[error("payload carries more than one record type: {0:?}")]
    MultipleCredentialTypes(Vec<CredentialType>),

    /// The tagged type has no populated record list.
    #[error("malformed {credential_type} credential: {reason}")]
    MalformedCredential {
        /// The type the credential is tagged with.
        credential_type: CredentialType,
        /// Why the credential was rejected.
        reason: String,
    },

    /// The caller asked for a record the credential does not have.
    #[error("{credential_type} record index {index} out of range (credential has {len})")]
    RecordIndexOutOfRange {
        /// The type the credential is tagged with.
        credential_type: CredentialType,
        /// The requested index.
        index: usize,
        /// Number of records present.
        len: usize,
    },
}

impl ClassificationError {
    /// Stable machine code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoCredentialType => "C|NCT",
            Self::MultipleCredentialTypes(_) => "C|MCT",
            Self::MalformedCredential { .. } => "C|MAL",
            Self::RecordIndexOutOfRange { .. } => "C|IDX",
        }
    }
}

/// Validation errors for primitive values read from a credential.
///
/// These carry the invalid input and the expected format so that
/// misconfigured issuers can be diagnosed from logs alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Timestamp string is not ISO 8601 with an offset.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Calendar date string is not `yyyy-MM-dd`.
    #[error("invalid calendar date: \"{value}\" (expected yyyy-MM-dd)")]
    InvalidDate {
        /// The string that failed to parse.
        value: String,
    },

    /// Country code is not two ASCII letters.
    #[error("invalid country code: \"{0}\" (expected ISO 3166-1 alpha-2)")]
    InvalidCountryCode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_codes_are_stable() {
        assert_eq!(DecodeError::InvalidSchemePrefix.code(), "D|ISP");
        assert_eq!(DecodeError::Base45Failed.code(), "D|B45");
        assert_eq!(DecodeError::DecompressionFailed.code(), "D|ZLB");
        assert_eq!(DecodeError::EnvelopeDeserializationFailed.code(), "D|CDF");
        assert_eq!(DecodeError::HcertInvalid("x".into()).code(), "D|HII");
    }

    #[test]
    fn classification_error_converts_to_hcert_invalid() {
        let err: DecodeError = ClassificationError::NoCredentialType.into();
        assert_eq!(err.code(), "D|HII");
        assert!(format!("{err}").contains("no vaccination"));
    }

    #[test]
    fn malformed_credential_display_names_type() {
        let err = ClassificationError::MalformedCredential {
            credential_type: CredentialType::Recovery,
            reason: "empty record list".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("recovery"));
        assert!(msg.contains("empty record list"));
    }

    #[test]
    fn index_out_of_range_display() {
        let err = ClassificationError::RecordIndexOutOfRange {
            credential_type: CredentialType::Test,
            index: 3,
            len: 1,
        };
        let msg = format!("{err}");
        assert!(msg.contains("index 3"));
        assert!(msg.contains("has 1"));
    }

    #[test]
    fn validation_error_invalid_timestamp() {
        let err = ValidationError::InvalidTimestamp {
            value: "not-a-date".to_string(),
            reason: "parse failed".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("not-a-date"));
        assert!(msg.contains("parse failed"));
    }

    #[test]
    fn validation_error_invalid_date() {
        let err = ValidationError::InvalidDate {
            value: "01.06.2021".into(),
        };
        assert!(format!("{err}").contains("yyyy-MM-dd"));
    }
}
