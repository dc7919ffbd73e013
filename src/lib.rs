//! repoherald - announces newly created GitHub repositories on Bluesky
//!
//! repoherald checks a roster of GitHub organizations for repositories
//! created inside a sliding time window and posts each discovery to Bluesky
//! with a link card. By default it runs once and exits, which makes it easy
//! to drive from cron or a systemd timer; `watch` mode runs the same
//! pipeline on an interval in the foreground.
//!
//! ## The window is the only duplicate guard
//!
//! There is no durable record of repositories already announced. A
//! repository is announced when its creation time falls inside the last
//! `CHECK_MINUTES` minutes, so the schedule must tile time exactly: run at
//! an interval no larger than the window, with no gaps. A gap misses
//! repositories forever; overlap announces them twice. `watch` mode defaults
//! its interval to the window.
//!
//! ## Modules
//!
//! - [`config`]: environment-driven configuration
//! - [`roster`]: roster fetching, parsing, and run selection
//! - [`github`]: repository fetcher
//! - [`window`]: time window filter
//! - [`compose`]: template rendering and payload assembly
//! - [`publish`]: publisher seam and dry-run sink
//! - [`bluesky`]: live Bluesky client and publisher
//! - [`scan`]: the per-organization announcement pipeline
//! - [`watch`]: interval loop around one-shot runs

pub mod bluesky;
pub mod compose;
pub mod config;
pub mod github;
pub mod publish;
pub mod roster;
pub mod scan;
pub mod watch;
pub mod window;

pub use bluesky::{BlueskyClient, BlueskyPublisher};
pub use compose::{Composer, PostPayload, Renderer};
pub use config::Config;
pub use github::{GitHubClient, RateLimitError, RepoRecord};
pub use publish::{DryRunPublisher, Publisher};
pub use roster::OrgEntry;
pub use scan::{RunOptions, RunResult, RunSummary, ScanEngine};
pub use window::is_new;
