//! Bounded expectations over a [`BrowserDriver`]
//!
//! Each expectation polls the page until its condition holds or the bound
//! expires. The condition is always evaluated at least once, so a zero bound
//! still checks the current state.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::driver::{BrowserDriver, Locator, UrlPattern};
use crate::error::{E2eError, E2eResult};

/// Maximum characters of page text quoted in a failure message
const EXCERPT_CHARS: usize = 160;

#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Bound {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

struct Deadline {
    start: Instant,
    bound: Bound,
}

impl Deadline {
    fn new(bound: Bound) -> Self {
        Self {
            start: Instant::now(),
            bound,
        }
    }

    fn expired(&self) -> bool {
        self.start.elapsed() >= self.bound.timeout
    }

    async fn tick(&self) {
        sleep(self.bound.poll_interval).await;
    }

    fn millis(&self) -> u128 {
        self.bound.timeout.as_millis()
    }
}

pub async fn to_be_visible<D>(driver: &mut D, locator: &Locator, bound: Bound) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        if driver.is_visible(locator).await? {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::Timeout(format!(
                "{} to be visible ({} ms)",
                locator,
                deadline.millis()
            )));
        }
        deadline.tick().await;
    }
}

pub async fn to_be_hidden<D>(driver: &mut D, locator: &Locator, bound: Bound) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        if !driver.is_visible(locator).await? {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::Timeout(format!(
                "{} to be hidden ({} ms)",
                locator,
                deadline.millis()
            )));
        }
        deadline.tick().await;
    }
}

pub async fn to_contain_text<D>(
    driver: &mut D,
    locator: &Locator,
    expected: &str,
    bound: Bound,
) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        let text = driver.inner_text(locator).await?;
        if text.contains(expected) {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::AssertionFailed(format!(
                "{} does not contain \"{}\" after {} ms (saw \"{}\")",
                locator,
                expected,
                deadline.millis(),
                excerpt(&text)
            )));
        }
        deadline.tick().await;
    }
}

pub async fn not_to_contain_text<D>(
    driver: &mut D,
    locator: &Locator,
    unexpected: &str,
    bound: Bound,
) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        let text = driver.inner_text(locator).await?;
        if !text.contains(unexpected) {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::AssertionFailed(format!(
                "{} still contains \"{}\" after {} ms",
                locator,
                unexpected,
                deadline.millis()
            )));
        }
        deadline.tick().await;
    }
}

/// Exact text equality. Surrounding whitespace is trimmed because `innerText`
/// reports block elements with a trailing newline; inner whitespace and case
/// must match.
pub async fn to_have_text<D>(
    driver: &mut D,
    locator: &Locator,
    expected: &str,
    bound: Bound,
) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        let text = driver.inner_text(locator).await?;
        if text.trim() == expected {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::AssertionFailed(format!(
                "{} has text \"{}\", expected \"{}\"",
                locator,
                excerpt(text.trim()),
                expected
            )));
        }
        deadline.tick().await;
    }
}

pub async fn to_have_url<D>(driver: &mut D, pattern: &UrlPattern, bound: Bound) -> E2eResult<()>
where
    D: BrowserDriver + ?Sized,
{
    let deadline = Deadline::new(bound);
    loop {
        let url = driver.current_url().await?;
        if pattern.matches(&url) {
            debug!("URL {} matches {}", url, pattern);
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::Timeout(format!(
                "URL matching {} ({} ms, at {})",
                pattern,
                deadline.millis(),
                url
            )));
        }
        deadline.tick().await;
    }
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("a\n  b\tc"), "a b c");
        let long = "x".repeat(EXCERPT_CHARS + 10);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }
}
