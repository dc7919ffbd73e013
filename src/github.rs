use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};

/// Repository metadata consumed by the announcement pipeline.
///
/// Optional API fields are normalized to empty strings here so nothing
/// downstream needs to reason about absent values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRecord {
    pub name: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
}

/// Wire format of the repository listing endpoints.
#[derive(Debug, Deserialize)]
struct ApiRepo {
    name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    language: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    private: bool,
}

impl ApiRepo {
    fn into_record(self) -> RepoRecord {
        RepoRecord {
            name: self.name,
            description: self.description.unwrap_or_default(),
            url: self.html_url,
            language: self.language.unwrap_or_default(),
            created_at: self.created_at,
        }
    }
}

/// Rate limit rejection from the GitHub API.
///
/// Carried through the error chain as a concrete type so callers can
/// downcast and report the reset time distinctly from ordinary failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitError {
    pub reset_at: Option<DateTime<Utc>>,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reset_at {
            Some(reset) => write!(
                f,
                "GitHub API rate limit exceeded, resets at {}",
                reset.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => write!(f, "GitHub API rate limit exceeded"),
        }
    }
}

impl std::error::Error for RateLimitError {}

const PER_PAGE: usize = 50;
const MAX_PAGES: u32 = 10;

/// GitHub client for listing an account's recently created repositories.
///
/// Listings are requested newest-first and pagination stops once a page ends
/// older than the horizon, so a run touches at most a handful of pages per
/// account. A token is optional; unauthenticated calls run against a 60
/// request/hour quota.
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    horizon: Duration,
}

impl GitHubClient {
    /// Create a client.
    ///
    /// `horizon` bounds pagination depth only. Which repositories actually
    /// get announced is decided by the window filter, not here.
    pub fn new(base_url: &str, token: Option<String>, horizon: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("repoherald/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            horizon,
        })
    }

    /// Fetch recently created public repositories for one account handle.
    ///
    /// The user listing is tried first with the organization listing as a
    /// fallback, mirroring how GitHub exposes both account types. Rate limit
    /// rejections surface as [`RateLimitError`] inside the error chain.
    pub async fn fetch_recent_repos(&self, handle: &str) -> Result<Vec<RepoRecord>> {
        let endpoints = [
            format!("{}/users/{}/repos", self.base_url, handle),
            format!("{}/orgs/{}/repos", self.base_url, handle),
        ];

        for endpoint in &endpoints {
            match self.list_created_desc(endpoint).await? {
                Some(records) => return Ok(records),
                None => {
                    debug!("{endpoint} not usable");
                }
            }
        }

        Err(anyhow!(
            "No repository listing available for '{handle}' (account not found?)"
        ))
    }

    /// List repositories from one endpoint, newest first.
    ///
    /// `Ok(None)` means the endpoint rejected the request in a way worth
    /// falling back from. Rate limiting and transport failures are real
    /// errors and propagate immediately.
    async fn list_created_desc(&self, endpoint: &str) -> Result<Option<Vec<RepoRecord>>> {
        let cutoff = Utc::now() - self.horizon;
        let mut records = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut request = self
                .http
                .get(endpoint)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28")
                .query(&[
                    ("sort", "created".to_string()),
                    ("direction", "desc".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ]);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = request
                .send()
                .await
                .with_context(|| format!("Request to {endpoint} failed"))?;

            let status = response.status();
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(limit) = rate_limit_rejection(&response) {
                    return Err(limit.into());
                }
                debug!("{endpoint} returned {status} without rate limit markers");
                return Ok(None);
            }
            if !status.is_success() {
                debug!("{endpoint} returned {status}");
                return Ok(None);
            }

            let page_repos: Vec<ApiRepo> = response
                .json()
                .await
                .with_context(|| format!("Malformed repository listing from {endpoint}"))?;

            let page_len = page_repos.len();
            // created-desc ordering: the last item on the page is the oldest.
            let oldest = page_repos.last().map(|repo| repo.created_at);

            for repo in page_repos {
                if repo.private {
                    warn!("Dropping private repository from listing: {}", repo.name);
                    continue;
                }
                records.push(repo.into_record());
            }

            if page_len < PER_PAGE {
                break;
            }
            if matches!(oldest, Some(created) if created < cutoff) {
                debug!("Stopping pagination at page {page}, past the announcement horizon");
                break;
            }
        }

        Ok(Some(records))
    }
}

/// Interpret a 403/429 response, extracting rate limit details when present.
///
/// GitHub signals primary rate limiting as 403 with `x-ratelimit-remaining`
/// at zero; 429 is always treated as rate limiting.
fn rate_limit_rejection(response: &reqwest::Response) -> Option<RateLimitError> {
    let headers = response.headers();
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok());

    if response.status() == StatusCode::TOO_MANY_REQUESTS || remaining == Some("0") {
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Some(RateLimitError { reset_at })
    } else {
        None
    }
}
