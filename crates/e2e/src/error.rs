//! Error types for the watchlist workflow

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Browser session is closed")]
    DriverClosed,

    #[error("Site unreachable: {0}")]
    SiteUnreachable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse failure classes reported alongside a failed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Configuration,
    Authentication,
    Assertion,
    Driver,
}

impl E2eError {
    pub fn class(&self) -> ErrorClass {
        match self {
            E2eError::Config(_) | E2eError::Yaml(_) => ErrorClass::Configuration,
            E2eError::Authentication(_) => ErrorClass::Authentication,
            E2eError::AssertionFailed(_)
            | E2eError::Timeout(_)
            | E2eError::ElementNotFound(_) => ErrorClass::Assertion,
            E2eError::PlaywrightNotFound
            | E2eError::Playwright(_)
            | E2eError::DriverClosed
            | E2eError::SiteUnreachable(_)
            | E2eError::Io(_)
            | E2eError::Json(_)
            | E2eError::Http(_) => ErrorClass::Driver,
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            E2eError::Config("WIKI_USERNAME is not set".into()).class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            E2eError::ElementNotFound("link".into()).class(),
            ErrorClass::Assertion
        );
        assert_eq!(E2eError::DriverClosed.class(), ErrorClass::Driver);
    }
}
