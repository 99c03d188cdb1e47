//! The watchlist workflow: log in, watch two articles, remove one, follow the
//! other, then clean up.
//!
//! ```text
//!   login ──▶ watch-primary ──▶ watch-survivor ──▶ verify-both-listed
//!                                                        │
//!   verify-heading ◀── open-survivor ◀── verify-survivor ◀── verify-removal ◀── remove-primary
//!        │
//!        ▼
//!     cleanup (best effort)
//! ```
//!
//! Steps run once, in order. The first error ends the sequence.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::article::ArticleRef;
use crate::credentials::Credentials;
use crate::driver::{BrowserDriver, LoadState};
use crate::error::{E2eError, E2eResult};
use crate::expect;
use crate::probe::{probe, ControlState};
use crate::scenario::Scenario;
use crate::site::SiteMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStep {
    WatchPrimary,
    WatchSurvivor,
    VerifyBothListed,
    RemovePrimary,
    VerifyRemoval,
    VerifySurvivor,
    OpenSurvivor,
    VerifyHeading,
    Cleanup,
}

impl WorkflowStep {
    /// Steps whose failure fails the run, in execution order
    pub const MAIN_SEQUENCE: [WorkflowStep; 8] = [
        WorkflowStep::WatchPrimary,
        WorkflowStep::WatchSurvivor,
        WorkflowStep::VerifyBothListed,
        WorkflowStep::RemovePrimary,
        WorkflowStep::VerifyRemoval,
        WorkflowStep::VerifySurvivor,
        WorkflowStep::OpenSurvivor,
        WorkflowStep::VerifyHeading,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::WatchPrimary => "watch-primary",
            WorkflowStep::WatchSurvivor => "watch-survivor",
            WorkflowStep::VerifyBothListed => "verify-both-listed",
            WorkflowStep::RemovePrimary => "remove-primary",
            WorkflowStep::VerifyRemoval => "verify-removal",
            WorkflowStep::VerifySurvivor => "verify-survivor",
            WorkflowStep::OpenSurvivor => "open-survivor",
            WorkflowStep::VerifyHeading => "verify-heading",
            WorkflowStep::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a step that did not fail ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    /// Succeeded along a logged, accepted branch
    Tolerated(String),
}

impl StepOutcome {
    pub fn note(&self) -> Option<&str> {
        match self {
            StepOutcome::Completed => None,
            StepOutcome::Tolerated(note) => Some(note),
        }
    }
}

pub struct WatchlistWorkflow<'a, D: BrowserDriver + ?Sized> {
    driver: &'a mut D,
    scenario: &'a Scenario,
    site: SiteMap,
}

impl<'a, D: BrowserDriver + ?Sized> WatchlistWorkflow<'a, D> {
    pub fn new(driver: &'a mut D, scenario: &'a Scenario) -> Self {
        Self {
            driver,
            scenario,
            site: scenario.site(),
        }
    }

    /// The underlying session, e.g. for a failure screenshot
    pub fn driver_mut(&mut self) -> &mut D {
        &mut *self.driver
    }

    /// Submit the login form and wait for the logged-in indicator
    pub async fn login(&mut self, credentials: &Credentials) -> E2eResult<()> {
        info!("Logging in as {}", credentials.username);
        self.driver.goto(&self.site.login_url()).await?;

        self.driver
            .fill(&self.site.username_input(), &credentials.username)
            .await?;
        self.driver
            .fill(&self.site.password_input(), &credentials.password)
            .await?;
        self.driver.click(&self.site.login_button()).await?;

        let bound = self.scenario.timeouts.bound(self.scenario.timeouts.login());
        match expect::to_be_visible(&mut *self.driver, &self.site.logged_in_indicator(), bound).await {
            Ok(()) => {
                info!("Login successful");
                Ok(())
            }
            Err(E2eError::Timeout(what)) => Err(E2eError::Authentication(format!(
                "logged-in indicator never appeared: {}",
                what
            ))),
            Err(e) => Err(e),
        }
    }

    pub async fn run_step(&mut self, step: WorkflowStep) -> E2eResult<StepOutcome> {
        let scenario = self.scenario;
        match step {
            WorkflowStep::WatchPrimary => self.watch(&scenario.primary).await,
            WorkflowStep::WatchSurvivor => self.watch(&scenario.survivor).await,
            WorkflowStep::VerifyBothListed => self.verify_both_listed().await,
            WorkflowStep::RemovePrimary => self.remove_primary().await,
            WorkflowStep::VerifyRemoval => self.verify_removal().await,
            WorkflowStep::VerifySurvivor => self.verify_survivor().await,
            WorkflowStep::OpenSurvivor => self.open_survivor().await,
            WorkflowStep::VerifyHeading => self.verify_heading().await,
            WorkflowStep::Cleanup => self.cleanup().await,
        }
    }

    async fn watch(&mut self, article: &ArticleRef) -> E2eResult<StepOutcome> {
        self.driver.goto(&self.site.article_url(article)).await?;
        info!("Navigated to: {}", article.id());

        let watch = self.site.watch_control();
        let unwatch = self.site.unwatch_control();

        match probe(&mut *self.driver, &watch, Some(&unwatch)).await? {
            ControlState::Actionable => {
                self.driver.click(&watch).await?;
                info!("Clicked 'Watch' for {}", article.id());
                let bound = self.scenario.timeouts.bound(self.scenario.timeouts.watch_toggle());
                expect::to_be_visible(&mut *self.driver, &unwatch, bound).await?;
                info!("Confirmed 'Unwatch' control is visible for {}", article);
                Ok(StepOutcome::Completed)
            }
            ControlState::AlternateState => {
                info!("'{}' is already watched", article);
                Ok(StepOutcome::Tolerated(format!("'{}' was already watched", article)))
            }
            ControlState::Absent => {
                warn!("Neither 'Watch' nor 'Unwatch' control visible for {}", article);
                Ok(StepOutcome::Tolerated(format!(
                    "neither watch nor unwatch control visible for '{}'",
                    article
                )))
            }
        }
    }

    async fn verify_both_listed(&mut self) -> E2eResult<StepOutcome> {
        self.driver.goto(&self.site.edit_watchlist_url()).await?;
        info!("Navigated to Edit Watchlist page");

        let body = self.site.body();
        let bound = self.scenario.timeouts.bound(self.scenario.timeouts.listing());
        for article in [&self.scenario.primary, &self.scenario.survivor] {
            expect::to_contain_text(&mut *self.driver, &body, article.display(), bound).await?;
        }

        info!("Verified both articles are on Edit Watchlist page");
        Ok(StepOutcome::Completed)
    }

    async fn remove_primary(&mut self) -> E2eResult<StepOutcome> {
        let primary = &self.scenario.primary;
        let timeouts = &self.scenario.timeouts;
        info!("Removing {} from watchlist", primary);

        let checkbox = self.site.removal_checkbox(primary);
        expect::to_be_visible(&mut *self.driver, &checkbox, timeouts.bound(timeouts.expect())).await?;
        self.driver.check(&checkbox).await?;
        info!("Checked checkbox \"{}\"", primary.checkbox_label());

        let remove = self.site.remove_titles_button();
        expect::to_be_visible(&mut *self.driver, &remove, timeouts.bound(timeouts.expect())).await?;
        self.driver.click(&remove).await?;
        info!("Clicked \"Remove titles\"");

        let confirmation = self.site.removal_confirmation();
        expect::to_be_visible(&mut *self.driver, &confirmation, timeouts.bound(timeouts.confirmation()))
            .await?;
        info!("Removal confirmation is visible");

        let back = self.site.return_to_watchlist_link();
        expect::to_be_visible(&mut *self.driver, &back, timeouts.bound(timeouts.expect())).await?;
        self.driver.click(&back).await?;

        let pattern = self.site.watchlist_pattern()?;
        expect::to_have_url(&mut *self.driver, &pattern, timeouts.bound(timeouts.navigation())).await?;
        self.driver
            .wait_for_load_state(LoadState::NetworkIdle, timeouts.navigation())
            .await?;
        info!("Navigated back to Special:Watchlist");

        Ok(StepOutcome::Completed)
    }

    async fn verify_removal(&mut self) -> E2eResult<StepOutcome> {
        let primary = &self.scenario.primary;
        let bound = self.scenario.timeouts.bound(self.scenario.timeouts.watchlist_absent());
        expect::not_to_contain_text(&mut *self.driver, &self.site.body(), primary.display(), bound)
            .await?;
        info!("Verified {} is not on the main watchlist", primary);
        Ok(StepOutcome::Completed)
    }

    async fn verify_survivor(&mut self) -> E2eResult<StepOutcome> {
        let scenario = self.scenario;
        self.driver.goto(&self.site.edit_watchlist_url()).await?;

        let body = self.site.body();
        expect::to_contain_text(
            &mut *self.driver,
            &body,
            scenario.survivor.display(),
            scenario.timeouts.bound(scenario.timeouts.survivor()),
        )
        .await?;
        info!("'{}' is still present on Edit Watchlist", scenario.survivor);

        expect::not_to_contain_text(
            &mut *self.driver,
            &body,
            scenario.primary.display(),
            scenario.timeouts.bound(scenario.timeouts.expect()),
        )
        .await?;
        info!("'{}' is not present on Edit Watchlist", scenario.primary);

        Ok(StepOutcome::Completed)
    }

    async fn open_survivor(&mut self) -> E2eResult<StepOutcome> {
        let survivor = &self.scenario.survivor;
        let link = self.site.article_link(survivor);

        if self.driver.count(&link).await? == 0 {
            return Err(E2eError::ElementNotFound(format!(
                "link for '{}' should be present on Edit Watchlist",
                survivor
            )));
        }

        self.driver.click(&link).await?;
        info!("Clicked link for {} on Edit Watchlist", survivor.id());
        self.driver
            .wait_for_load_state(LoadState::NetworkIdle, self.scenario.timeouts.navigation())
            .await?;
        Ok(StepOutcome::Completed)
    }

    async fn verify_heading(&mut self) -> E2eResult<StepOutcome> {
        let survivor = &self.scenario.survivor;
        let bound = self.scenario.timeouts.bound(self.scenario.timeouts.expect());
        expect::to_have_text(&mut *self.driver, &self.site.heading(), survivor.display(), bound)
            .await?;
        info!("Page title matches '{}'", survivor);
        Ok(StepOutcome::Completed)
    }

    /// Remove the survivor if it is still watched and confirm the main
    /// watchlist no longer mentions it. The caller treats errors as non-fatal.
    async fn cleanup(&mut self) -> E2eResult<StepOutcome> {
        let survivor = &self.scenario.survivor;
        let bound = self.scenario.timeouts.bound(self.scenario.timeouts.cleanup());
        info!("Starting cleanup for {}", survivor);

        self.driver.goto(&self.site.edit_watchlist_url()).await?;

        let checkbox = self.site.removal_checkbox(survivor);
        let outcome = match probe(&mut *self.driver, &checkbox, None).await? {
            ControlState::Actionable => {
                info!("Found '{}' on watchlist during cleanup, removing", survivor);
                self.driver.check(&checkbox).await?;

                let remove = self.site.remove_titles_button();
                expect::to_be_visible(&mut *self.driver, &remove, bound).await?;
                self.driver.click(&remove).await?;

                let confirmation = self.site.removal_confirmation();
                expect::to_be_visible(&mut *self.driver, &confirmation, bound).await?;
                info!("Removed '{}'", survivor);

                // The reload below replaces the confirmation page either way.
                let outcome = match expect::to_be_hidden(&mut *self.driver, &confirmation, bound).await {
                    Ok(()) => StepOutcome::Completed,
                    Err(E2eError::Timeout(what)) => {
                        warn!("Removal confirmation did not clear: {}", what);
                        StepOutcome::Tolerated("removal confirmation stayed visible until reload".into())
                    }
                    Err(e) => return Err(e),
                };

                self.driver.goto(&self.site.edit_watchlist_url()).await?;
                outcome
            }
            ControlState::AlternateState | ControlState::Absent => {
                info!("'{}' not found on watchlist during cleanup, skipping removal", survivor);
                StepOutcome::Tolerated(format!("'{}' was not on the watchlist", survivor))
            }
        };

        self.driver.goto(&self.site.watchlist_url()).await?;
        expect::not_to_contain_text(&mut *self.driver, &self.site.body(), survivor.display(), bound)
            .await?;
        info!("Confirmed {} is removed", survivor);

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_sequence_excludes_cleanup() {
        assert_eq!(WorkflowStep::MAIN_SEQUENCE.len(), 8);
        assert!(!WorkflowStep::MAIN_SEQUENCE.contains(&WorkflowStep::Cleanup));
        assert_eq!(WorkflowStep::MAIN_SEQUENCE[0], WorkflowStep::WatchPrimary);
        assert_eq!(WorkflowStep::MAIN_SEQUENCE[7], WorkflowStep::VerifyHeading);
    }

    #[test]
    fn test_step_names_match_serde() {
        for step in WorkflowStep::MAIN_SEQUENCE {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.name()));
        }
    }
}
