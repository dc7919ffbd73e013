//! Bluesky client
//!
//! Session login and post creation against the com.atproto XRPC endpoints.
//! One session is established per run and reused for every post in it.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::compose::PostPayload;
use crate::publish::Publisher;

/// Authenticated session returned by `createSession`.
#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
    handle: String,
}

/// Minimal Bluesky PDS client for creating feed posts.
#[derive(Debug)]
pub struct BlueskyClient {
    http: reqwest::Client,
    service: String,
    session: Session,
}

impl BlueskyClient {
    /// Authenticate with a handle and app password.
    ///
    /// In live mode nothing is fetched or posted until this succeeds; bad
    /// credentials fail the whole run up front.
    pub async fn login(service: &str, handle: &str, app_password: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("repoherald/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let service = service.trim_end_matches('/').to_string();
        let response = http
            .post(format!("{service}/xrpc/com.atproto.server.createSession"))
            .json(&json!({
                "identifier": handle,
                "password": app_password,
            }))
            .send()
            .await
            .context("Bluesky login request failed")?;

        if !response.status().is_success() {
            bail!("Bluesky login rejected for {handle} ({})", response.status());
        }

        let session: Session = response
            .json()
            .await
            .context("Malformed Bluesky session response")?;
        debug!("Established Bluesky session for {}", session.handle);

        Ok(Self {
            http,
            service,
            session,
        })
    }

    /// Handle of the authenticated account.
    pub fn handle(&self) -> &str {
        &self.session.handle
    }

    /// Create one feed post with an external link card embed.
    pub async fn send_post(&self, payload: &PostPayload) -> Result<()> {
        let record = json!({
            "$type": "app.bsky.feed.post",
            "text": payload.text,
            "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            "embed": {
                "$type": "app.bsky.embed.external",
                "external": {
                    "uri": payload.link_url,
                    "title": payload.link_title,
                    "description": payload.link_description,
                },
            },
        });

        let response = self
            .http
            .post(format!(
                "{}/xrpc/com.atproto.repo.createRecord",
                self.service
            ))
            .bearer_auth(&self.session.access_jwt)
            .json(&json!({
                "repo": self.session.did,
                "collection": "app.bsky.feed.post",
                "record": record,
            }))
            .send()
            .await
            .context("Bluesky post request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Bluesky rejected post ({status}): {body}");
        }
        Ok(())
    }
}

/// Live publisher backed by an authenticated Bluesky session.
pub struct BlueskyPublisher {
    client: BlueskyClient,
}

impl BlueskyPublisher {
    pub fn new(client: BlueskyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for BlueskyPublisher {
    async fn publish(&self, payload: &PostPayload) -> Result<()> {
        self.client.send_post(payload).await
    }

    fn name(&self) -> &'static str {
        "bluesky"
    }
}
