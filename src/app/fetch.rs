//! Page retrieval for a single job.
//!
//! Plain sites are fetched with a GET. Password-gated preview sites get a
//! cookie session first: one form POST of the shared password to the site
//! origin, after which every GET carries the session cookie.

use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::error::{FetchError, ScanError};
use super::types::ScanConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStrategy {
    Standard,
    Preview { password: String },
}

impl FetchStrategy {
    /// Chosen once per job from the base URL.
    pub fn for_base(base_url: &str, config: &ScanConfig) -> Self {
        if !config.preview_marker.is_empty() && base_url.contains(&config.preview_marker) {
            FetchStrategy::Preview {
                password: config.preview_password.clone(),
            }
        } else {
            FetchStrategy::Standard
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchStrategy::Standard => "standard",
            FetchStrategy::Preview { .. } => "preview",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    strategy: FetchStrategy,
}

impl Fetcher {
    /// Builds the client for `base_url` and, for preview sites, logs in.
    /// A failed login is logged; pages fetched afterwards simply fail or come
    /// back as the password form.
    pub async fn connect(base_url: &str, config: &ScanConfig) -> Result<Self, ScanError> {
        let strategy = FetchStrategy::for_base(base_url, config);
        let client = build_client(&strategy, config)?;
        let fetcher = Self { client, strategy };

        if let FetchStrategy::Preview { password } = &fetcher.strategy {
            fetcher.login(base_url, password).await;
        }
        Ok(fetcher)
    }

    pub fn strategy(&self) -> &FetchStrategy {
        &self.strategy
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn login(&self, base_url: &str, password: &str) {
        let origin = match Url::parse(base_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(err) => {
                warn!(url = base_url, error = %err, "preview login skipped: unparsable base URL");
                return;
            }
        };

        let result = self
            .client
            .post(&origin)
            .form(&[("password", password)])
            .send()
            .await;
        match result {
            Ok(response) if response.status().is_success() => {
                debug!(origin = %origin, "preview session established");
            }
            Ok(response) => {
                warn!(origin = %origin, status = response.status().as_u16(), "preview login failed");
            }
            Err(err) => warn!(origin = %origin, error = %err, "preview login failed"),
        }
    }

    /// Fetches a page body. Network errors, timeouts and non-2xx answers all
    /// come back as `FetchError`.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Http {
            url: url.to_string(),
            source,
        })
    }

    /// Lightweight existence check used by the broken-link prober.
    pub async fn probe(&self, url: &str) -> Result<(), FetchError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

fn build_client(strategy: &FetchStrategy, config: &ScanConfig) -> Result<reqwest::Client, ScanError> {
    let builder = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout.min(Duration::from_secs(10)))
        .user_agent(&config.user_agent);

    let builder = match strategy {
        FetchStrategy::Standard => builder,
        FetchStrategy::Preview { .. } => builder
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(config.preview_max_redirects)),
    };

    builder.build().map_err(ScanError::Client)
}
