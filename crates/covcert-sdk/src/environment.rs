//! Deployment environments and trust backend endpoints.
//!
//! | Environment | Trust backend                           |
//! |-------------|-----------------------------------------|
//! | `dev`       | `https://www.cc-d.bit.admin.ch/trust`   |
//! | `abn`       | `https://www.cc-a.bit.admin.ch/trust`   |
//! | `prod`      | `https://www.cc.bit.admin.ch/trust`     |
//!
//! Every endpoint answers with a signed JSON body and is requested with
//! `Accept: application/json+jws`.

use std::str::FromStr;

use url::Url;

use crate::config::ConfigError;

/// `Accept` header value for signed JSON responses.
pub const ACCEPT_JSON_JWS: &str = "application/json+jws";

/// Key encoding requested from the key update endpoint.
const CERT_FORMAT: &str = "IOS";

/// A deployment environment of the trust backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Development.
    Dev,
    /// Acceptance ("abnahme").
    Abn,
    /// Production.
    #[default]
    Prod,
}

impl Environment {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Abn => "abn",
            Self::Prod => "prod",
        }
    }

    /// Base URL of the trust backend.
    pub fn trust_backend_url(&self) -> &'static str {
        match self {
            Self::Dev => "https://www.cc-d.bit.admin.ch/trust",
            Self::Abn => "https://www.cc-a.bit.admin.ch/trust",
            Self::Prod => "https://www.cc.bit.admin.ch/trust",
        }
    }

    /// API version path segment.
    pub fn api_version(&self) -> &'static str {
        "v1"
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "abn" => Ok(Self::Abn),
            "prod" => Ok(Self::Prod),
            _ => Err(ConfigError::InvalidEnvironment(s.to_string())),
        }
    }
}

/// One trust backend resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrustEndpoint {
    /// Revoked certificate identifiers.
    RevocationList,
    /// Jurisdiction verification rules.
    VerificationRules,
    /// Incremental signing key updates.
    KeyUpdates,
    /// Identifiers of currently active signing keys.
    ActiveKeys,
    /// Accepted vaccine products with their standard dose counts.
    ValueSets,
}

impl TrustEndpoint {
    /// Every endpoint, in refresh order.
    pub const ALL: [TrustEndpoint; 5] = [
        Self::RevocationList,
        Self::VerificationRules,
        Self::KeyUpdates,
        Self::ActiveKeys,
        Self::ValueSets,
    ];

    /// Path relative to the versioned backend root.
    pub fn path(&self) -> &'static str {
        match self {
            Self::RevocationList => "revocationList",
            Self::VerificationRules => "verificationRules",
            Self::KeyUpdates => "keys/updates",
            Self::ActiveKeys => "keys/list",
            Self::ValueSets => "valueSets",
        }
    }
}

impl std::fmt::Display for TrustEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Resolves endpoint URLs against a backend base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustEndpoints {
    root: Url,
}

impl TrustEndpoints {
    /// Endpoints under `base`/`api_version`/.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `base` cannot be a base URL.
    pub fn new(base: &Url, api_version: &str) -> Result<Self, ConfigError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let root = base
            .join(&format!("{api_version}/"))
            .map_err(|e| ConfigError::InvalidUrl("trust backend".into(), e.to_string()))?;
        Ok(Self { root })
    }

    /// The versioned root all endpoints hang off.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Full URL of `endpoint`. `since` is the key update cursor and only
    /// applies to [`TrustEndpoint::KeyUpdates`].
    pub fn url(&self, endpoint: TrustEndpoint, since: Option<&str>) -> Result<Url, url::ParseError> {
        let mut url = self.root.join(endpoint.path())?;
        if endpoint == TrustEndpoint::KeyUpdates {
            url.query_pairs_mut()
                .append_pair("certFormat", CERT_FORMAT)
                .append_pair("since", since.unwrap_or("0"));
        }
        Ok(url)
    }
}
