use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_CHECK_MINUTES: u32 = 15;
const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_BLUESKY_SERVICE: &str = "https://bsky.social";

/// Runtime configuration, read from the environment.
///
/// The binary loads a local `.env` file before this module runs, so every
/// setting can come from either a real environment variable or the file.
/// Real variables win.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the roster CSV (`Organization` and `Github` columns).
    pub roster_url: String,

    /// Optional GitHub bearer token. Without one the API allows 60
    /// requests per hour; with one, 5000.
    pub github_token: Option<String>,

    /// Bluesky handle, required in live mode.
    pub bluesky_handle: Option<String>,

    /// Bluesky app password, required in live mode.
    pub bluesky_password: Option<String>,

    /// Announcement window in minutes. The window is the only duplicate
    /// guard, so runs must be scheduled at an interval no larger than this.
    pub check_minutes: u32,

    /// When true (the default), posts are printed instead of published.
    pub dry_run: bool,

    /// Optional path to a template file overriding the built-in one.
    pub template_path: Option<PathBuf>,

    /// GitHub API base URL. Overridable for tests.
    pub github_api_url: String,

    /// Bluesky PDS base URL. Overridable for tests.
    pub bluesky_service: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let roster_url = env::var("CSV_URL").context("CSV_URL must be set")?;

        let check_minutes = match env::var("CHECK_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .context("CHECK_MINUTES must be a whole number of minutes")?,
            Err(_) => DEFAULT_CHECK_MINUTES,
        };

        let dry_run = env::var("DRY_RUN").map(|v| parse_bool(&v)).unwrap_or(true);

        let config = Self {
            roster_url,
            github_token: non_empty_var("GITHUB_TOKEN"),
            bluesky_handle: non_empty_var("BLUESKY_HANDLE"),
            bluesky_password: non_empty_var("BLUESKY_APP_PASSWORD"),
            check_minutes,
            dry_run,
            template_path: non_empty_var("TEMPLATE_PATH").map(PathBuf::from),
            github_api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| DEFAULT_GITHUB_API_URL.to_string()),
            bluesky_service: env::var("BLUESKY_SERVICE")
                .unwrap_or_else(|_| DEFAULT_BLUESKY_SERVICE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field requirements for the selected mode.
    fn validate(&self) -> Result<()> {
        if self.roster_url.trim().is_empty() {
            bail!("CSV_URL must not be empty");
        }
        if !self.dry_run && (self.bluesky_handle.is_none() || self.bluesky_password.is_none()) {
            bail!("BLUESKY_HANDLE and BLUESKY_APP_PASSWORD are required when DRY_RUN is false");
        }
        Ok(())
    }

    /// Bluesky credentials, present whenever live mode is allowed.
    pub fn bluesky_credentials(&self) -> Option<(&str, &str)> {
        match (&self.bluesky_handle, &self.bluesky_password) {
            (Some(handle), Some(password)) => Some((handle.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// Read a variable, treating empty values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
