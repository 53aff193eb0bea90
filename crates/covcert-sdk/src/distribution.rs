//! # HTTP Trust Material Distribution
//!
//! Fetches the trust backend lists (revocations, verification rules, key
//! updates, active keys, value sets) and keeps the latest body of each in
//! memory together with its SHA-256 digest. A refresh reports
//! `was_updated` when any digest changed.
//!
//! The value set body is also parsed into a [`ProductCatalog`], published
//! through [`DistributionService::current_value_sets`]. A body that does
//! not parse is an error and leaves the previous catalog in place.
//!
//! Without `force`, a refresh is skipped while the snapshot is younger
//! than the configured maximum age. A failed endpoint does not stop the
//! others; the first failure is returned alongside the update flag, and
//! the snapshot age is only reset when every endpoint succeeded. There is
//! no retry: the next refresh is the retry.
//!
//! Signature verification of list bodies belongs to the trust engine; this
//! module only transports and caches them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use covcert_validity::ProductCatalog;

use crate::collaborators::{DistributionService, RefreshOutcome};
use crate::config::{ConfigError, SdkConfig};
use crate::environment::{TrustEndpoint, TrustEndpoints, ACCEPT_JSON_JWS};
use crate::error::DistributionError;

/// Response header carrying the cursor for the next key update request.
const NEXT_SINCE_HEADER: &str = "x-next-since";

/// A cached list body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedList {
    /// SHA-256 of `body`.
    pub digest: [u8; 32],
    /// The signed response body as received.
    pub body: String,
    /// When the body was fetched.
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Snapshot {
    lists: HashMap<TrustEndpoint, CachedList>,
    refreshed_at: Option<Instant>,
    key_cursor: Option<String>,
    value_sets: Option<Arc<ProductCatalog>>,
}

struct Fetched {
    body: String,
    next_since: Option<String>,
}

/// [`DistributionService`] over the trust backend's HTTP API.
#[derive(Debug)]
pub struct HttpDistributionService {
    http: reqwest::Client,
    endpoints: TrustEndpoints,
    max_age: Duration,
    snapshot: RwLock<Snapshot>,
}

impl HttpDistributionService {
    /// Build a service from SDK configuration.
    ///
    /// # Errors
    ///
    /// Fails if the backend URL cannot be a base URL, the API key is not a
    /// valid header value, or the HTTP client cannot be built.
    pub fn new(config: &SdkConfig) -> Result<Self, DistributionError> {
        let endpoints = TrustEndpoints::new(&config.backend_url, config.environment.api_version())
            .map_err(|e: ConfigError| DistributionError::InvalidUrl {
                endpoint: config.backend_url.to_string(),
                reason: e.to_string(),
            })?;

        let mut headers = reqwest::header::HeaderMap::new();
        let bearer = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            config.api_key.as_str()
        ))
        .map_err(|_| DistributionError::Unavailable("API key is not a valid header value".into()))?;
        headers.insert(reqwest::header::AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| DistributionError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self::with_client(
            http,
            endpoints,
            Duration::from_secs(config.trust_list_max_age_secs),
        ))
    }

    /// Build a service around an existing client.
    pub fn with_client(http: reqwest::Client, endpoints: TrustEndpoints, max_age: Duration) -> Self {
        Self {
            http,
            endpoints,
            max_age,
            snapshot: RwLock::new(Snapshot::default()),
        }
    }

    /// Whether the last complete refresh is younger than the maximum age.
    pub fn is_still_valid(&self) -> bool {
        self.snapshot
            .read()
            .refreshed_at
            .is_some_and(|at| at.elapsed() < self.max_age)
    }

    /// The cached body of `endpoint`, if it was ever fetched.
    pub fn cached(&self, endpoint: TrustEndpoint) -> Option<CachedList> {
        self.snapshot.read().lists.get(&endpoint).cloned()
    }

    async fn fetch(
        &self,
        endpoint: TrustEndpoint,
        since: Option<&str>,
    ) -> Result<Fetched, DistributionError> {
        let name = endpoint.path().to_string();
        let url = self
            .endpoints
            .url(endpoint, since)
            .map_err(|e| DistributionError::InvalidUrl {
                endpoint: name.clone(),
                reason: e.to_string(),
            })?;

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT_JSON_JWS)
            .send()
            .await
            .map_err(|e| DistributionError::Http {
                endpoint: name.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DistributionError::Status {
                endpoint: name,
                status,
                body,
            });
        }

        let next_since = resp
            .headers()
            .get(NEXT_SINCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(|e| DistributionError::Http {
            endpoint: name,
            source: e,
        })?;
        Ok(Fetched { body, next_since })
    }

    /// Store a fetched body. Returns whether its digest changed.
    fn store(&self, endpoint: TrustEndpoint, fetched: Fetched) -> Result<bool, DistributionError> {
        let catalog = match endpoint {
            TrustEndpoint::ValueSets => {
                let catalog = ProductCatalog::from_json(&fetched.body).map_err(|e| {
                    DistributionError::InvalidValueSets {
                        endpoint: endpoint.path().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                Some(Arc::new(catalog))
            }
            _ => None,
        };

        let digest: [u8; 32] = Sha256::digest(fetched.body.as_bytes()).into();
        let mut snapshot = self.snapshot.write();

        if endpoint == TrustEndpoint::KeyUpdates {
            if let Some(cursor) = fetched.next_since {
                snapshot.key_cursor = Some(cursor);
            }
        }

        let changed = snapshot
            .lists
            .get(&endpoint)
            .map_or(true, |cached| cached.digest != digest);
        if changed {
            snapshot.lists.insert(
                endpoint,
                CachedList {
                    digest,
                    body: fetched.body,
                    fetched_at: Utc::now(),
                },
            );
            if catalog.is_some() {
                snapshot.value_sets = catalog;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl DistributionService for HttpDistributionService {
    async fn refresh(&self, force: bool) -> RefreshOutcome {
        if !force && self.is_still_valid() {
            tracing::debug!("trust material still fresh, skipping refresh");
            return RefreshOutcome::unchanged();
        }

        let mut was_updated = false;
        let mut first_error = None;

        for endpoint in TrustEndpoint::ALL {
            let cursor = self.snapshot.read().key_cursor.clone();
            let stored = self
                .fetch(endpoint, cursor.as_deref())
                .await
                .and_then(|fetched| self.store(endpoint, fetched));
            match stored {
                Ok(changed) => {
                    if changed {
                        tracing::debug!(%endpoint, "trust list changed");
                        was_updated = true;
                    }
                }
                Err(e) => {
                    tracing::warn!(%endpoint, code = e.code(), error = %e, "trust list refresh failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if first_error.is_none() {
            self.snapshot.write().refreshed_at = Some(Instant::now());
        }

        tracing::info!(
            force,
            was_updated,
            failed = first_error.is_some(),
            "trust material refresh finished"
        );
        RefreshOutcome {
            was_updated,
            error: first_error,
        }
    }

    fn current_value_sets(&self) -> Option<Arc<ProductCatalog>> {
        self.snapshot.read().value_sets.clone()
    }
}
