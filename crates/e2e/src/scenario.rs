//! Declarative YAML scenario description

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::article::ArticleRef;
use crate::error::{E2eError, E2eResult};
use crate::expect::Bound;
use crate::site::SiteMap;

/// The watchlist scenario: which site, which two articles and how long each
/// bounded wait may take. Credentials are deliberately not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Unique name for this scenario
    #[serde(default = "default_name")]
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Site root, e.g. `https://en.wikipedia.org`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Article added and then removed during the main sequence
    #[serde(default = "default_primary")]
    pub primary: ArticleRef,

    /// Article that stays on the watchlist until cleanup
    #[serde(default = "default_survivor")]
    pub survivor: ArticleRef,

    #[serde(default)]
    pub timeouts: Timeouts,
}

fn default_name() -> String {
    "wikipedia-watchlist".to_string()
}

fn default_base_url() -> String {
    "https://en.wikipedia.org".to_string()
}

fn default_primary() -> ArticleRef {
    ArticleRef::new("The_Matrix").expect("static article id")
}

fn default_survivor() -> ArticleRef {
    ArticleRef::new("Keanu_Reeves").expect("static article id")
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: "Watch two articles, remove one, follow the other, clean up".to_string(),
            base_url: default_base_url(),
            primary: default_primary(),
            survivor: default_survivor(),
            timeouts: Timeouts::default(),
        }
    }
}

/// Bounds for every wait in the workflow, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    /// Post-login indicator
    pub login_ms: u64,
    /// Watch control flipping to the unwatch control
    pub watch_toggle_ms: u64,
    /// Both titles showing up on the editing page
    pub listing_ms: u64,
    /// Removal confirmation message
    pub confirmation_ms: u64,
    /// Removed title gone from the main watchlist
    pub watchlist_absent_ms: u64,
    /// Survivor still listed on the editing page
    pub survivor_ms: u64,
    /// Any expectation without a dedicated bound
    pub expect_ms: u64,
    /// Every wait inside the cleanup block
    pub cleanup_ms: u64,
    /// Navigation and network quiescence
    pub navigation_ms: u64,
    /// Interval between polls of a pending expectation
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            login_ms: 10_000,
            watch_toggle_ms: 30_000,
            listing_ms: 30_000,
            confirmation_ms: 10_000,
            watchlist_absent_ms: 10_000,
            survivor_ms: 10_000,
            expect_ms: 5_000,
            cleanup_ms: 5_000,
            navigation_ms: 30_000,
            poll_interval_ms: 100,
        }
    }
}

impl Timeouts {
    pub fn login(&self) -> Duration {
        Duration::from_millis(self.login_ms)
    }

    pub fn watch_toggle(&self) -> Duration {
        Duration::from_millis(self.watch_toggle_ms)
    }

    pub fn listing(&self) -> Duration {
        Duration::from_millis(self.listing_ms)
    }

    pub fn confirmation(&self) -> Duration {
        Duration::from_millis(self.confirmation_ms)
    }

    pub fn watchlist_absent(&self) -> Duration {
        Duration::from_millis(self.watchlist_absent_ms)
    }

    pub fn survivor(&self) -> Duration {
        Duration::from_millis(self.survivor_ms)
    }

    pub fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    pub fn cleanup(&self) -> Duration {
        Duration::from_millis(self.cleanup_ms)
    }

    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// `timeout` polled at this scenario's interval
    pub fn bound(&self, timeout: Duration) -> Bound {
        Bound::new(timeout, self.poll_interval())
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(E2eError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.primary == self.survivor {
            return Err(E2eError::Config(format!(
                "primary and survivor must be different articles (both '{}')",
                self.primary.id()
            )));
        }
        Ok(())
    }

    pub fn site(&self) -> SiteMap {
        SiteMap::new(&self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scenario() {
        let scenario = Scenario::default();
        assert_eq!(scenario.primary.display(), "The Matrix");
        assert_eq!(scenario.survivor.display(), "Keanu Reeves");
        assert_eq!(scenario.timeouts.listing_ms, 30_000);
        scenario.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_scenario() {
        let yaml = r#"
name: de-watchlist
base_url: https://de.wikipedia.org
primary: Berlin
survivor: Hamburger_Hafen
timeouts:
  login_ms: 20000
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "de-watchlist");
        assert_eq!(scenario.survivor.display(), "Hamburger Hafen");
        assert_eq!(scenario.timeouts.login_ms, 20_000);
        assert_eq!(scenario.timeouts.cleanup_ms, 5_000);
    }

    #[test]
    fn test_credentials_are_rejected_in_scenario_files() {
        let yaml = r#"
name: leaky
password: hunter2
"#;
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::Yaml(_))));
    }

    #[test]
    fn test_identical_articles_are_rejected() {
        let yaml = r#"
primary: The_Matrix
survivor: The Matrix
"#;
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::Config(_))));
    }

    #[test]
    fn test_non_http_base_url_is_rejected() {
        let yaml = "base_url: ftp://example.org\n";
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::Config(_))));
    }
}
