//! Publisher seam
//!
//! Delivery backends for composed announcements. The default is the dry-run
//! sink; the live Bluesky backend lives in [`crate::bluesky`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Mutex;

use crate::compose::PostPayload;

/// Delivery backend for composed announcements.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver one payload.
    async fn publish(&self, payload: &PostPayload) -> Result<()>;

    /// Backend name, for logs.
    fn name(&self) -> &'static str;
}

/// Publisher that prints payloads to a local stream instead of posting.
///
/// Never touches the network, so dry runs are safe no matter how many
/// eligible repositories turn up.
pub struct DryRunPublisher {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl DryRunPublisher {
    /// Dry-run publisher writing to standard output.
    pub fn new() -> Self {
        Self::with_sink(Box::new(std::io::stdout()))
    }

    /// Dry-run publisher writing to an arbitrary sink. Used by tests.
    pub fn with_sink(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

impl Default for DryRunPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, payload: &PostPayload) -> Result<()> {
        let mut sink = self
            .sink
            .lock()
            .map_err(|_| anyhow!("Dry-run sink is poisoned"))?;

        writeln!(sink, "--- dry run: would post ---")?;
        writeln!(sink, "{}", payload.text)?;
        writeln!(sink, "[link card] title: {}", payload.link_title)?;
        writeln!(sink, "[link card] description: {}", payload.link_description)?;
        writeln!(sink, "[link card] url: {}", payload.link_url)?;
        writeln!(sink, "---------------------------")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
