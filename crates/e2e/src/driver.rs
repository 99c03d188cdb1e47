//! Browser driver abstraction
//!
//! The workflow talks to the browser only through [`BrowserDriver`]. Every
//! call is a single, immediate query or action on the one page the driver
//! owns; bounded waiting lives in [`crate::expect`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// ARIA roles the workflow selects by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AriaRole {
    Button,
    Checkbox,
    Heading,
    Link,
}

impl AriaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AriaRole::Button => "button",
            AriaRole::Checkbox => "checkbox",
            AriaRole::Heading => "heading",
            AriaRole::Link => "link",
        }
    }
}

/// How to find an element on the current page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    /// CSS selector
    Css { selector: String },

    /// Accessible role and name. `exact: false` is a case-insensitive
    /// substring match on the name.
    Role {
        role: AriaRole,
        name: String,
        exact: bool,
    },

    /// Element whose text contains `text`
    Text { text: String },

    /// First element matched by `inner`
    First { inner: Box<Locator> },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css {
            selector: selector.into(),
        }
    }

    pub fn role(role: AriaRole, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: name.into(),
            exact: false,
        }
    }

    pub fn role_exact(role: AriaRole, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: name.into(),
            exact: true,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text { text: text.into() }
    }

    pub fn first(self) -> Self {
        Locator::First {
            inner: Box::new(self),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css { selector } => write!(f, "{}", selector),
            Locator::Role { role, name, exact } => {
                let op = if *exact { "=" } else { "~=" };
                write!(f, "role={}[name{}\"{}\"]", role.as_str(), op, name)
            }
            Locator::Text { text } => write!(f, "text=\"{}\"", text),
            Locator::First { inner } => write!(f, "{} >> nth=0", inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network activity for a short quiet period
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

/// URL glob where `*` matches any run of characters
#[derive(Debug, Clone)]
pub struct UrlPattern {
    glob: String,
    regex: Regex,
}

impl UrlPattern {
    pub fn glob(glob: impl Into<String>) -> E2eResult<Self> {
        let glob = glob.into();
        let body = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("^{}$", body))
            .map_err(|e| E2eError::Config(format!("invalid URL pattern '{}': {}", glob, e)))?;
        Ok(Self { glob, regex })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.glob)
    }
}

/// One exclusively owned browser page
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate and wait for the load event
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()>;

    async fn click(&mut self, locator: &Locator) -> E2eResult<()>;

    /// Tick a checkbox (no-op when already ticked)
    async fn check(&mut self, locator: &Locator) -> E2eResult<()>;

    /// Whether the first match is currently visible. Absent elements are not.
    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool>;

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize>;

    /// Rendered text of the first match
    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String>;

    async fn current_url(&mut self) -> E2eResult<String>;

    async fn wait_for_load_state(&mut self, state: LoadState, timeout: Duration) -> E2eResult<()>;

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    /// Close the page, its context and the browser
    async fn close(&mut self) -> E2eResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://en.wikipedia.org/wiki/Special:Watchlist", true ; "bare")]
    #[test_case("https://en.wikipedia.org/wiki/Special:Watchlist?days=7", true ; "query string")]
    #[test_case("https://en.wikipedia.org/wiki/Special:EditWatchlist", false ; "editing page")]
    #[test_case("https://en.wikipedia.org/wiki/Special.Watchlist", false ; "dot is literal")]
    fn test_watchlist_glob(url: &str, expected: bool) {
        let pattern = UrlPattern::glob("https://en.wikipedia.org/wiki/Special:Watchlist*").unwrap();
        assert_eq!(pattern.matches(url), expected);
    }

    #[test]
    fn test_locator_wire_format() {
        let locator = Locator::role_exact(AriaRole::Link, "Keanu Reeves").first();
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "first",
                "inner": { "kind": "role", "role": "link", "name": "Keanu Reeves", "exact": true }
            })
        );
    }

    #[test]
    fn test_load_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&LoadState::NetworkIdle).unwrap(),
            "\"networkidle\""
        );
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("#ca-watch").to_string(), "#ca-watch");
        assert_eq!(
            Locator::role(AriaRole::Button, "Remove titles").to_string(),
            "role=button[name~=\"Remove titles\"]"
        );
    }
}
