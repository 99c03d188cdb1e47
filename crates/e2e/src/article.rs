//! Article references

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{E2eError, E2eResult};

/// An article identified by its canonical title (`The_Matrix`) together with
/// the form the site renders in listings and headings (`The Matrix`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArticleRef {
    id: String,
    display: String,
}

impl ArticleRef {
    pub fn new(id: impl Into<String>) -> E2eResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(E2eError::Config("article identifier must not be empty".into()));
        }
        let id = trimmed.replace(' ', "_");
        let display = id.replace('_', " ");
        Ok(Self { id, display })
    }

    /// Canonical, underscore-joined identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Title as displayed by the site
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Article page URL under `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/wiki/{}", base_url.trim_end_matches('/'), self.id)
    }

    /// Accessible name of the removal checkbox on the watchlist editing page
    pub fn checkbox_label(&self) -> String {
        format!("{} (talk | history)", self.display)
    }
}

impl fmt::Display for ArticleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl TryFrom<String> for ArticleRef {
    type Error = E2eError;

    fn try_from(value: String) -> E2eResult<Self> {
        Self::new(value)
    }
}

impl From<ArticleRef> for String {
    fn from(article: ArticleRef) -> Self {
        article.id
    }
}
