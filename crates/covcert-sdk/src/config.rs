//! SDK configuration.
//!
//! Loaded from environment variables with typed defaults, or built
//! explicitly from an [`Environment`] and API key.

use std::path::{Path, PathBuf};

use url::Url;
use zeroize::Zeroizing;

use covcert_core::EvaluationCalendar;
use covcert_validity::{PolicyConstants, ProductCatalog, ValidityError};

use crate::environment::Environment;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRUST_LIST_MAX_AGE_SECS: u64 = 2 * 60 * 60;

/// Configuration of a verification session.
///
/// Custom `Debug` implementation redacts the `api_key` field.
#[derive(Clone)]
pub struct SdkConfig {
    /// Backend environment.
    pub environment: Environment,
    /// Bearer token for the trust backend. Zeroized on drop.
    pub api_key: Zeroizing<String>,
    /// Trust backend base URL. Defaults to the environment's backend.
    pub backend_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Age after which cached trust material is refreshed without `force`.
    pub trust_list_max_age_secs: u64,
    /// Validity offsets.
    pub policy: PolicyConstants,
    /// Accepted vaccine products.
    pub product_catalog: ProductCatalog,
    /// Calendar in which credential dates are read.
    pub calendar: EvaluationCalendar,
}

impl std::fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkConfig")
            .field("environment", &self.environment)
            .field("api_key", &"[REDACTED]")
            .field("backend_url", &self.backend_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("trust_list_max_age_secs", &self.trust_list_max_age_secs)
            .field("policy", &self.policy)
            .field("product_catalog_len", &self.product_catalog.len())
            .field("calendar", &self.calendar)
            .finish()
    }
}

impl SdkConfig {
    /// Configuration for `environment` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] for a blank key.
    pub fn new(environment: Environment, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let api_key = Zeroizing::new(api_key.into());
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self {
            environment,
            api_key,
            backend_url: parse_url("trust backend", environment.trust_backend_url())?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            trust_list_max_age_secs: DEFAULT_TRUST_LIST_MAX_AGE_SECS,
            policy: PolicyConstants::default(),
            product_catalog: ProductCatalog::eu_default(),
            calendar: EvaluationCalendar::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `COVCERT_ENVIRONMENT` (`dev`, `abn`, `prod`; default: `prod`)
    /// - `COVCERT_API_KEY` (required)
    /// - `COVCERT_BACKEND_URL` (default: the environment's trust backend)
    /// - `COVCERT_TIMEOUT_SECS` (default: 30)
    /// - `COVCERT_TRUST_LIST_MAX_AGE_SECS` (default: 7200)
    /// - `COVCERT_POLICY_FILE` (YAML [`PolicyConstants`]; default: built-in)
    /// - `COVCERT_PRODUCT_CATALOG_FILE` (JSON catalog; default: EU products)
    /// - `COVCERT_CALENDAR` (`local`, `utc`, or an offset; default: `local`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("COVCERT_ENVIRONMENT") {
            Some(raw) => raw.parse()?,
            None => Environment::default(),
        };
        let api_key = lookup("COVCERT_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let mut config = Self::new(environment, api_key)?;

        if let Some(raw) = lookup("COVCERT_BACKEND_URL") {
            config.backend_url = parse_url("COVCERT_BACKEND_URL", &raw)?;
        }
        config.timeout_secs = lookup("COVCERT_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        config.trust_list_max_age_secs = lookup("COVCERT_TRUST_LIST_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TRUST_LIST_MAX_AGE_SECS);
        if let Some(path) = lookup("COVCERT_POLICY_FILE") {
            config.policy = load_policy_file(Path::new(&path))?;
        }
        if let Some(path) = lookup("COVCERT_PRODUCT_CATALOG_FILE") {
            config.product_catalog = load_product_catalog(Path::new(&path))?;
        }
        if let Some(raw) = lookup("COVCERT_CALENDAR") {
            config.calendar = raw
                .parse()
                .map_err(|_| ConfigError::InvalidCalendar(raw.clone()))?;
        }

        tracing::debug!(
            environment = %config.environment,
            backend = %config.backend_url,
            "loaded SDK configuration"
        );
        Ok(config)
    }
}

/// Read [`PolicyConstants`] from a YAML file. Keys left out keep their
/// defaults.
pub fn load_policy_file(path: &Path) -> Result<PolicyConstants, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Policy {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a [`ProductCatalog`] JSON document from a file.
pub fn load_product_catalog(path: &Path) -> Result<ProductCatalog, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ProductCatalog::from_json(&raw)?)
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No API key was supplied.
    #[error("COVCERT_API_KEY is required")]
    MissingApiKey,
    /// A URL did not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// Unknown environment name.
    #[error("unknown environment {0:?} (expected dev, abn or prod)")]
    InvalidEnvironment(String),
    /// Unknown calendar.
    #[error("invalid evaluation calendar {0:?}")]
    InvalidCalendar(String),
    /// A configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },
    /// A policy file is not valid YAML for [`PolicyConstants`].
    #[error("invalid policy file {}: {source}", path.display())]
    Policy {
        /// The file.
        path: PathBuf,
        /// The YAML error.
        source: serde_yaml::Error,
    },
    /// A product catalog file is malformed.
    #[error(transparent)]
    Catalog(#[from] ValidityError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("covcert-{}-{name}", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn api_key_is_required() {
        let err = SdkConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert!(matches!(
            SdkConfig::new(Environment::Dev, "  "),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn defaults_follow_environment() {
        let cfg = SdkConfig::from_lookup(lookup(&[
            ("COVCERT_API_KEY", "secret"),
            ("COVCERT_ENVIRONMENT", "abn"),
        ]))
        .unwrap();
        assert_eq!(cfg.environment, Environment::Abn);
        assert_eq!(cfg.backend_url.as_str(), "https://www.cc-a.bit.admin.ch/trust");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.policy, PolicyConstants::default());
        assert_eq!(cfg.calendar, EvaluationCalendar::Local);
    }

    #[test]
    fn overrides_apply() {
        let cfg = SdkConfig::from_lookup(lookup(&[
            ("COVCERT_API_KEY", "secret"),
            ("COVCERT_BACKEND_URL", "http://127.0.0.1:9000/trust"),
            ("COVCERT_TIMEOUT_SECS", "5"),
            ("COVCERT_TRUST_LIST_MAX_AGE_SECS", "60"),
            ("COVCERT_CALENDAR", "utc"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url.as_str(), "http://127.0.0.1:9000/trust");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.trust_list_max_age_secs, 60);
        assert_eq!(cfg.calendar, EvaluationCalendar::Utc);
    }

    #[test]
    fn rejects_unknown_environment_and_bad_url() {
        let err = SdkConfig::from_lookup(lookup(&[
            ("COVCERT_API_KEY", "secret"),
            ("COVCERT_ENVIRONMENT", "staging"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(_)));

        let err = SdkConfig::from_lookup(lookup(&[
            ("COVCERT_API_KEY", "secret"),
            ("COVCERT_BACKEND_URL", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_, _)));
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = SdkConfig::new(Environment::Dev, "super-secret-key").unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn policy_file_overrides_named_keys() {
        let path = temp_file(
            "policy.yaml",
            "max_vaccination_validity_days: 270\nrat_test_validity_hours: 48\n",
        );
        let cfg = SdkConfig::from_lookup(lookup(&[
            ("COVCERT_API_KEY", "secret"),
            ("COVCERT_POLICY_FILE", path.to_str().unwrap()),
        ]))
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.policy.max_vaccination_validity_days, 270);
        assert_eq!(cfg.policy.rat_test_validity_hours, 48);
        assert_eq!(cfg.policy.pcr_test_validity_hours, 72);
    }

    #[test]
    fn malformed_policy_file_is_reported() {
        let path = temp_file("bad.yaml", "max_vaccination_validity_days: [1, 2]\n");
        let err = load_policy_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Policy { .. }));
    }

    #[test]
    fn product_catalog_file_replaces_default() {
        let path = temp_file(
            "catalog.json",
            r#"{"products": [{"code": "X-1", "total_doses": 1}]}"#,
        );
        let catalog = load_product_catalog(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.total_doses("X-1"), Some(1));
    }
}
