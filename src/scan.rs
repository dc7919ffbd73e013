//! Scan engine
//!
//! Drives the announcement pipeline for each selected organization: fetch,
//! window filter, compose, publish. Failures are isolated so one bad
//! organization or one bad item never takes down the rest of the run. There
//! is no cross-run memory; the time window is the only duplicate guard.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::bluesky::{BlueskyClient, BlueskyPublisher};
use crate::compose::Composer;
use crate::config::Config;
use crate::github::{GitHubClient, RateLimitError};
use crate::publish::{DryRunPublisher, Publisher};
use crate::roster::{self, OrgEntry};
use crate::window::is_new;

/// Outcome for a single organization.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub handle: String,
    pub display_name: String,
    /// Repositories created inside the window.
    pub repos_found: usize,
    /// Announcements actually delivered.
    pub repos_announced: usize,
    /// Fetch failure, if the organization could not be checked at all.
    pub error: Option<String>,
}

/// Aggregated outcome of a full run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-organization results, in roster order.
    pub results: Vec<RunResult>,
    pub orgs_checked: usize,
    pub orgs_failed: usize,
    pub total_found: usize,
    pub total_announced: usize,
}

impl RunSummary {
    /// Organizations that recorded an error, in roster order.
    pub fn failed_orgs(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter().filter(|r| r.error.is_some())
    }
}

/// Invocation options carried from the CLI into a run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Check only the first N roster organizations.
    pub limit: Option<usize>,
    /// Check a single account, bypassing roster selection.
    pub org: Option<String>,
    /// Display name for an `org` override that is not in the roster.
    pub name: Option<String>,
    /// Window override in minutes.
    pub minutes: Option<u32>,
}

/// Orchestrates one announcement run over a selected roster.
pub struct ScanEngine {
    github: GitHubClient,
    composer: Composer,
    publisher: Box<dyn Publisher>,
    window_minutes: u32,
}

impl ScanEngine {
    /// Build an engine from configuration plus the chosen publisher.
    pub fn new(config: &Config, window_minutes: u32, publisher: Box<dyn Publisher>) -> Result<Self> {
        let github = GitHubClient::new(
            &config.github_api_url,
            config.github_token.clone(),
            Duration::minutes(i64::from(window_minutes)),
        )?;
        let composer = Composer::from_template_path(config.template_path.as_deref())?;

        Ok(Self {
            github,
            composer,
            publisher,
            window_minutes,
        })
    }

    /// Process every selected organization sequentially, in roster order.
    ///
    /// A fetch failure marks that organization's result and the run moves
    /// on; a compose or publish failure skips that single announcement.
    pub async fn run(&self, orgs: &[OrgEntry]) -> RunSummary {
        info!(
            "Checking {} organizations for repositories created in the last {} minutes",
            orgs.len(),
            self.window_minutes
        );

        let mut results = Vec::with_capacity(orgs.len());
        let mut rate_limit_reported = false;

        for org in orgs {
            results.push(self.scan_org(org, &mut rate_limit_reported).await);
        }

        compile_summary(results)
    }

    /// Run the pipeline for one organization.
    async fn scan_org(&self, org: &OrgEntry, rate_limit_reported: &mut bool) -> RunResult {
        debug!("Fetching repositories for {}", org.handle);

        let repos = match self.github.fetch_recent_repos(&org.handle).await {
            Ok(repos) => repos,
            Err(err) => {
                if let Some(limit) = err.downcast_ref::<RateLimitError>() {
                    // Every subsequent fetch will hit the same wall; report
                    // the quota once, prominently, and keep the per-org
                    // records quiet.
                    if !*rate_limit_reported {
                        error!("{limit}");
                        error!("Set GITHUB_TOKEN to raise the quota to 5000 requests/hour");
                        *rate_limit_reported = true;
                    }
                } else {
                    warn!("Could not check {}: {err:#}", org.handle);
                }
                return RunResult {
                    handle: org.handle.clone(),
                    display_name: org.display_name.clone(),
                    repos_found: 0,
                    repos_announced: 0,
                    error: Some(format!("{err:#}")),
                };
            }
        };

        let now = Utc::now();
        let fetched = repos.len();
        let mut found = 0usize;
        let mut announced = 0usize;

        for repo in &repos {
            if !is_new(repo.created_at, now, self.window_minutes) {
                continue;
            }
            found += 1;

            let payload = match self.composer.compose(org, repo) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!(
                        "Skipping {}/{}: failed to compose post: {err:#}",
                        org.handle, repo.name
                    );
                    continue;
                }
            };

            match self.publisher.publish(&payload).await {
                Ok(()) => {
                    info!(
                        "Announced {}/{} via {}",
                        org.handle,
                        repo.name,
                        self.publisher.name()
                    );
                    announced += 1;
                }
                Err(err) => {
                    warn!(
                        "Skipping {}/{}: failed to publish: {err:#}",
                        org.handle, repo.name
                    );
                }
            }
        }

        debug!(
            "{}: {fetched} fetched, {found} inside window, {announced} announced",
            org.handle
        );

        RunResult {
            handle: org.handle.clone(),
            display_name: org.display_name.clone(),
            repos_found: found,
            repos_announced: announced,
            error: None,
        }
    }
}

fn compile_summary(results: Vec<RunResult>) -> RunSummary {
    let mut summary = RunSummary {
        orgs_checked: results.len(),
        ..Default::default()
    };
    for result in &results {
        if result.error.is_some() {
            summary.orgs_failed += 1;
        }
        summary.total_found += result.repos_found;
        summary.total_announced += result.repos_announced;
    }
    summary.results = results;
    summary
}

/// Execute one complete run: fetch the roster, select organizations, build
/// the publisher for the configured mode, and scan.
///
/// Failures that poison the whole run (roster unavailable, live login
/// rejected) surface as errors here; per-organization failures stay inside
/// the summary. In live mode login happens before any GitHub traffic.
pub async fn execute_run(config: &Config, opts: &RunOptions) -> Result<RunSummary> {
    let window_minutes = opts.minutes.unwrap_or(config.check_minutes);

    info!("Fetching roster from {}", config.roster_url);
    let roster_csv = roster::fetch_roster(&config.roster_url).await?;
    let all_orgs = roster::parse_roster(&roster_csv)?;
    info!("Roster contains {} organizations", all_orgs.len());

    let orgs = roster::select_orgs(all_orgs, opts.limit, opts.org.as_deref(), opts.name.as_deref());

    if config.github_token.is_none() {
        warn!("No GITHUB_TOKEN set; GitHub allows only 60 unauthenticated requests/hour");
    }

    let publisher: Box<dyn Publisher> = if config.dry_run {
        info!("Dry-run mode: posts will be printed, not published");
        Box::new(DryRunPublisher::new())
    } else {
        let (handle, password) = config
            .bluesky_credentials()
            .context("Bluesky credentials are required in live mode")?;
        let client = BlueskyClient::login(&config.bluesky_service, handle, password).await?;
        info!("Logged into Bluesky as {}", client.handle());
        Box::new(BlueskyPublisher::new(client))
    };

    let engine = ScanEngine::new(config, window_minutes, publisher)?;
    Ok(engine.run(&orgs).await)
}
