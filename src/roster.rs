//! Organization roster
//!
//! The roster is a CSV document fetched over HTTP at the start of every run,
//! with an `Organization` display-name column and a `Github` column holding a
//! profile URL or bare account handle. Lines starting with `#` are comments.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// One organization selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgEntry {
    /// GitHub login of the organization or user account.
    pub handle: String,
    /// Human-readable name used in rendered posts.
    pub display_name: String,
}

/// Raw roster row as it appears in the CSV document.
#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Organization", default)]
    organization: String,
    #[serde(rename = "Github", default)]
    github: String,
}

/// Fetch the roster document.
///
/// Failure here is fatal to the whole run; without the roster there is
/// nothing to check.
pub async fn fetch_roster(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("repoherald/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch roster from {url}"))?
        .error_for_status()
        .context("Roster request was rejected")?;

    response.text().await.context("Failed to read roster body")
}

/// Parse roster CSV into organization entries.
///
/// Rows with an empty column are dropped rather than failing the run; a
/// ragged or otherwise unparseable document is an error. Roster order is
/// preserved so runs are reproducible.
pub fn parse_roster(content: &str) -> Result<Vec<OrgEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut orgs = Vec::new();
    for row in reader.deserialize::<RosterRow>() {
        let row = row.context("Malformed roster document")?;
        if row.organization.is_empty() || row.github.is_empty() {
            debug!("Skipping incomplete roster row: {row:?}");
            continue;
        }
        orgs.push(OrgEntry {
            handle: extract_handle(&row.github),
            display_name: row.organization,
        });
    }

    debug!("Parsed {} roster entries", orgs.len());
    Ok(orgs)
}

/// Extract the GitHub login from a profile URL or bare handle.
///
/// `https://github.com/striblab/` and `striblab` both yield `striblab`.
pub fn extract_handle(github: &str) -> String {
    github
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Apply the invocation mode to the full roster.
///
/// A single-organization override beats everything else; failing that, an
/// optional limit keeps only the first N entries in roster order.
pub fn select_orgs(
    all: Vec<OrgEntry>,
    limit: Option<usize>,
    org_override: Option<&str>,
    name_override: Option<&str>,
) -> Vec<OrgEntry> {
    if let Some(raw) = org_override {
        let handle = normalize_handle(raw);
        if let Some(entry) = all.iter().find(|o| o.handle.eq_ignore_ascii_case(&handle)) {
            info!("Checking single organization: {}", entry.display_name);
            return vec![entry.clone()];
        }

        // Not in the roster: synthesize an entry so ad-hoc accounts can
        // still be checked.
        let display_name = name_override
            .map(str::to_string)
            .unwrap_or_else(|| handle.clone());
        info!("Organization '{handle}' is not in the roster, checking it anyway");
        return vec![OrgEntry {
            handle,
            display_name,
        }];
    }

    let mut orgs = all;
    if let Some(limit) = limit.filter(|n| *n > 0) {
        if limit < orgs.len() {
            info!("Limiting run to the first {limit} roster organizations");
            orgs.truncate(limit);
        }
    }
    orgs
}

/// Normalize an `--org` argument. Full profile URLs and trailing slashes are
/// accepted; matching against the roster is case-insensitive.
fn normalize_handle(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let handle = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    } else {
        trimmed
    };
    handle.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(handle: &str, display_name: &str) -> OrgEntry {
        OrgEntry {
            handle: handle.to_string(),
            display_name: display_name.to_string(),
        }
    }

    #[test]
    fn test_parse_roster_basic() {
        let csv = "Organization,Github\n\
                   Acme News,https://github.com/acme\n\
                   Beacon Press,https://github.com/beacon-press/\n";

        let orgs = parse_roster(csv).unwrap();
        assert_eq!(
            orgs,
            vec![
                entry("acme", "Acme News"),
                entry("beacon-press", "Beacon Press"),
            ]
        );
    }

    #[test]
    fn test_parse_roster_skips_comments_and_incomplete_rows() {
        let csv = "Organization,Github\n\
                   # Inactive entries are commented out\n\
                   Acme News,https://github.com/acme\n\
                   No Handle Yet,\n\
                   ,https://github.com/orphan\n";

        let orgs = parse_roster(csv).unwrap();
        assert_eq!(orgs, vec![entry("acme", "Acme News")]);
    }

    #[test]
    fn test_parse_roster_accepts_bare_handles_and_quoted_names() {
        let csv = "Organization,Github\n\
                   \"News, Inc.\",acme\n";

        let orgs = parse_roster(csv).unwrap();
        assert_eq!(orgs, vec![entry("acme", "News, Inc.")]);
    }

    #[test]
    fn test_parse_roster_ignores_extra_columns() {
        let csv = "Organization,Github,Region\n\
                   Acme News,https://github.com/acme,US\n";

        let orgs = parse_roster(csv).unwrap();
        assert_eq!(orgs, vec![entry("acme", "Acme News")]);
    }

    #[test]
    fn test_parse_roster_rejects_ragged_rows() {
        let csv = "Organization,Github\nAcme News\n";
        let err = parse_roster(csv).unwrap_err();
        assert!(err.to_string().contains("Malformed roster document"));
    }

    #[test]
    fn test_extract_handle_variants() {
        assert_eq!(extract_handle("https://github.com/striblab"), "striblab");
        assert_eq!(extract_handle("https://github.com/striblab/"), "striblab");
        assert_eq!(extract_handle("striblab"), "striblab");
        assert_eq!(extract_handle("  striblab  "), "striblab");
    }

    #[test]
    fn test_select_orgs_no_filters_keeps_roster_order() {
        let all = vec![entry("a", "A"), entry("b", "B"), entry("c", "C")];
        let selected = select_orgs(all.clone(), None, None, None);
        assert_eq!(selected, all);
    }

    #[test]
    fn test_select_orgs_limit_truncates() {
        let all = vec![entry("a", "A"), entry("b", "B"), entry("c", "C")];
        let selected = select_orgs(all, Some(2), None, None);
        assert_eq!(selected, vec![entry("a", "A"), entry("b", "B")]);
    }

    #[test]
    fn test_select_orgs_limit_zero_means_no_limit() {
        let all = vec![entry("a", "A"), entry("b", "B")];
        let selected = select_orgs(all.clone(), Some(0), None, None);
        assert_eq!(selected, all);
    }

    #[test]
    fn test_select_orgs_override_matches_roster_entry() {
        let all = vec![entry("acme", "Acme News"), entry("b", "B")];

        let selected = select_orgs(all.clone(), None, Some("ACME"), None);
        assert_eq!(selected, vec![entry("acme", "Acme News")]);

        // URL forms match too, and the roster display name wins over --name.
        let selected = select_orgs(all, Some(1), Some("https://github.com/Acme/"), Some("Other"));
        assert_eq!(selected, vec![entry("acme", "Acme News")]);
    }

    #[test]
    fn test_select_orgs_override_not_in_roster_synthesizes_entry() {
        let all = vec![entry("acme", "Acme News")];

        let selected = select_orgs(all.clone(), None, Some("newsroom-x"), None);
        assert_eq!(selected, vec![entry("newsroom-x", "newsroom-x")]);

        let selected = select_orgs(all, None, Some("newsroom-x"), Some("Newsroom X"));
        assert_eq!(selected, vec![entry("newsroom-x", "Newsroom X")]);
    }

    #[tokio::test]
    async fn test_fetch_roster_from_server() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs.csv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("Organization,Github\nAcme News,https://github.com/acme\n"),
            )
            .mount(&server)
            .await;

        let body = fetch_roster(&format!("{}/orgs.csv", server.uri()))
            .await
            .unwrap();
        let orgs = parse_roster(&body).unwrap();
        assert_eq!(orgs, vec![entry("acme", "Acme News")]);
    }

    #[tokio::test]
    async fn test_fetch_roster_http_error_is_fatal() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs.csv"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = fetch_roster(&format!("{}/orgs.csv", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }
}
