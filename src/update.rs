//! Update check against a product release feed.
//!
//! The feed is JSON, newest release first:
//!
//! ```json
//! { "releases": [ { "version": "2.1.0.0", "downloadUrl": "...", "releaseNotes": "..." } ] }
//! ```
//!
//! Results are plain data so a host can hand them to whatever thread owns
//! its UI.

use crate::component::Version;
use crate::LicentiaError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// One entry of the release feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRelease {
    /// Released version.
    pub version: Version,
    /// Where to download it.
    #[serde(default)]
    pub download_url: String,
    /// Release notes.
    #[serde(default)]
    pub release_notes: String,
}

#[derive(Deserialize)]
struct ReleaseFeed {
    #[serde(default)]
    releases: Vec<ProductRelease>,
}

/// Outcome of an update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheckResult {
    /// No newer release.
    UpToDate,
    /// Newer releases, newest first.
    NewVersionAvailable(Vec<ProductRelease>),
    /// The feed could not be fetched or parsed.
    Failed(String),
}

/// Where the release feed text comes from.
pub trait FeedSource: Send + Sync {
    /// Fetch the feed text.
    fn fetch(&self) -> Result<String, LicentiaError>;
}

/// Parse release feed text.
pub fn parse_release_feed(text: &str) -> Result<Vec<ProductRelease>, LicentiaError> {
    let feed: ReleaseFeed = serde_json::from_str(text)
        .map_err(|e| LicentiaError::UpdateFeed(format!("Invalid release feed: {}", e)))?;
    Ok(feed.releases)
}

/// Releases newer than `current`, stopping at the first one that is not.
pub fn newer_releases(releases: Vec<ProductRelease>, current: Version) -> Vec<ProductRelease> {
    releases
        .into_iter()
        .take_while(|release| release.version > current)
        .collect()
}

/// Checks a feed for releases newer than the running version.
pub struct UpdateChecker<F> {
    feed: Arc<F>,
    current: Version,
}

impl<F: FeedSource + 'static> UpdateChecker<F> {
    /// Checker comparing `feed` against `current`.
    pub fn new(feed: F, current: Version) -> Self {
        Self {
            feed: Arc::new(feed),
            current,
        }
    }

    /// Fetch and evaluate the feed on the calling thread.
    pub fn check(&self) -> UpdateCheckResult {
        check_feed(self.feed.as_ref(), self.current)
    }

    /// Run [`check`](Self::check) on a worker thread.
    ///
    /// The receiver can be awaited or read with `blocking_recv`.
    pub fn spawn(&self) -> oneshot::Receiver<UpdateCheckResult> {
        let (tx, rx) = oneshot::channel();
        let feed = self.feed.clone();
        let current = self.current;
        std::thread::spawn(move || {
            // The receiver may be gone if the host stopped waiting.
            let _ = tx.send(check_feed(feed.as_ref(), current));
        });
        rx
    }
}

fn check_feed<F: FeedSource + ?Sized>(feed: &F, current: Version) -> UpdateCheckResult {
    let releases = match feed.fetch().and_then(|text| parse_release_feed(&text)) {
        Ok(releases) => releases,
        Err(e) => {
            warn!(error = %e, "Update check failed");
            return UpdateCheckResult::Failed(e.to_string());
        }
    };

    let newer = newer_releases(releases, current);
    debug!(current = %current, newer = newer.len(), "Update check complete");
    if newer.is_empty() {
        UpdateCheckResult::UpToDate
    } else {
        UpdateCheckResult::NewVersionAvailable(newer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "releases": [
            { "version": "2.1.0.0", "downloadUrl": "https://example.com/2.1", "releaseNotes": "Charts" },
            { "version": "2.0.5.0", "downloadUrl": "https://example.com/2.0.5" },
            { "version": "2.0.0.0" },
            { "version": "2.0.6.0" }
        ]
    }"#;

    struct StaticFeed(Result<String, String>);

    impl FeedSource for StaticFeed {
        fn fetch(&self) -> Result<String, LicentiaError> {
            self.0.clone().map_err(LicentiaError::UpdateFeed)
        }
    }

    fn checker(feed: Result<&str, &str>, current: Version) -> UpdateChecker<StaticFeed> {
        let feed = feed.map(str::to_string).map_err(str::to_string);
        UpdateChecker::new(StaticFeed(feed), current)
    }

    #[test]
    fn test_parse_feed() {
        let releases = parse_release_feed(FEED).unwrap();
        assert_eq!(releases.len(), 4);
        assert_eq!(releases[0].version, Version::new(2, 1, 0, 0));
        assert_eq!(releases[0].release_notes, "Charts");
        assert_eq!(releases[2].download_url, "");
    }

    #[test]
    fn test_parse_invalid_feed() {
        assert!(matches!(
            parse_release_feed("{\"releases\": [{\"version\": \"x\"}]}"),
            Err(LicentiaError::UpdateFeed(_))
        ));
    }

    #[test]
    fn test_newer_releases_stop_at_current() {
        let releases = parse_release_feed(FEED).unwrap();
        let newer = newer_releases(releases, Version::new(2, 0, 0, 0));
        // 2.0.6 comes after 2.0.0 in the feed and is not reached.
        let versions: Vec<_> = newer.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["2.1.0.0", "2.0.5.0"]);
    }

    #[test]
    fn test_check_up_to_date() {
        let result = checker(Ok(FEED), Version::new(2, 1, 0, 0)).check();
        assert_eq!(result, UpdateCheckResult::UpToDate);
    }

    #[test]
    fn test_check_new_version() {
        match checker(Ok(FEED), Version::new(2, 0, 5, 0)).check() {
            UpdateCheckResult::NewVersionAvailable(releases) => {
                assert_eq!(releases.len(), 1);
                assert_eq!(releases[0].download_url, "https://example.com/2.1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_check_failure_is_data() {
        let result = checker(Err("offline"), Version::new(1, 0, 0, 0)).check();
        assert!(matches!(result, UpdateCheckResult::Failed(msg) if msg.contains("offline")));
    }

    #[test]
    fn test_spawn_blocking_receive() {
        let rx = checker(Ok(FEED), Version::new(2, 1, 0, 0)).spawn();
        assert_eq!(rx.blocking_recv().unwrap(), UpdateCheckResult::UpToDate);
    }

    #[tokio::test]
    async fn test_spawn_awaited() {
        let rx = checker(Ok(FEED), Version::new(1, 0, 0, 0)).spawn();
        let result = rx.await.unwrap();
        assert!(matches!(result, UpdateCheckResult::NewVersionAvailable(r) if r.len() == 4));
    }
}
