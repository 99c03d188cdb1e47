//! Main runner: credentials, preflight, session setup, the step sequence,
//! best-effort cleanup and unconditional teardown

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::credentials::Credentials;
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult, ErrorClass};
use crate::playwright::{PlaywrightConfig, PlaywrightDriver};
use crate::preflight;
use crate::scenario::Scenario;
use crate::workflow::{StepOutcome, WatchlistWorkflow, WorkflowStep};

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    /// Accepted divergence, e.g. an article that was already watched
    pub note: Option<String>,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl StepResult {
    fn passed(step_name: &str, duration_ms: u64, outcome: &StepOutcome) -> Self {
        Self {
            success: true,
            step_name: step_name.to_string(),
            duration_ms,
            note: outcome.note().map(String::from),
            error: None,
            screenshot_path: None,
        }
    }

    fn failed(step_name: &str, duration_ms: u64, err: &E2eError) -> Self {
        Self {
            success: false,
            step_name: step_name.to_string(),
            duration_ms,
            note: None,
            error: Some(err.to_string()),
            screenshot_path: None,
        }
    }
}

/// Result of one full scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub setup: Option<StepResult>,
    pub steps: Vec<StepResult>,
    /// Present only when the main sequence passed. Never affects `success`.
    pub cleanup: Option<StepResult>,
    pub error: Option<String>,
    pub error_class: Option<ErrorClass>,
}

impl TestResult {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            started_at: Utc::now(),
            duration_ms: 0,
            setup: None,
            steps: Vec::new(),
            cleanup: None,
            error: None,
            error_class: None,
        }
    }

    fn fail(&mut self, err: &E2eError) {
        self.error = Some(err.to_string());
        self.error_class = Some(err.class());
    }

    fn finish(mut self, start: Instant) -> Self {
        self.success = self.error.is_none();
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }

    /// The first step that failed, if any
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.setup
            .iter()
            .chain(self.steps.iter())
            .find(|s| !s.success)
    }
}

/// Result of running the scenario one or more times
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub scenario: Scenario,
    pub playwright: PlaywrightConfig,
    pub output_dir: PathBuf,
    pub screenshot_on_failure: bool,
    pub preflight: bool,
    pub preflight_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::default(),
            playwright: PlaywrightConfig::default(),
            output_dir: PathBuf::from("test-results"),
            screenshot_on_failure: true,
            preflight: false,
            preflight_timeout: Duration::from_secs(10),
        }
    }
}

/// Runs the watchlist scenario
pub struct TestRunner {
    config: RunnerConfig,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.config.scenario
    }

    /// Run the scenario in a fresh Playwright session.
    ///
    /// Configuration problems (missing credentials, an invalid scenario) and
    /// failure to start the browser are returned as errors before any page is
    /// touched. Everything after that is reported in the [`TestResult`].
    pub async fn run(&self) -> E2eResult<TestResult> {
        let credentials = self.prepare()?;

        if self.config.preflight {
            preflight::check_site(&self.config.scenario.site(), self.config.preflight_timeout).await?;
        }

        let mut playwright = self.config.playwright.clone();
        playwright.navigation_timeout = self.config.scenario.timeouts.navigation();
        let driver = PlaywrightDriver::launch(playwright).await?;

        Ok(self.run_with(driver, &credentials).await)
    }

    /// Validate the scenario and resolve credentials from the environment.
    /// Nothing here touches a browser.
    pub fn prepare(&self) -> E2eResult<Credentials> {
        self.prepare_from(|key| std::env::var(key).ok())
    }

    /// [`TestRunner::prepare`] with an explicit variable lookup
    pub fn prepare_from<F>(&self, lookup: F) -> E2eResult<Credentials>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.config.scenario.validate()?;
        Credentials::from_lookup(lookup)
    }

    /// Run the scenario `times` times in a row, each in its own session
    pub async fn run_repeated(&self, times: usize) -> E2eResult<TestSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::with_capacity(times);

        for round in 1..=times {
            info!("Run {}/{}", round, times);
            results.push(self.run().await?);
        }

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// Run the scenario on an already-open session. The session is closed
    /// before returning, whatever the outcome.
    pub async fn run_with<D: BrowserDriver>(&self, mut driver: D, credentials: &Credentials) -> TestResult {
        let result = self.execute(&mut driver, credentials).await;

        match driver.close().await {
            Ok(()) => info!("Browser closed"),
            Err(e) => warn!("Failed to close browser cleanly: {}", e),
        }

        if result.success {
            info!("✓ {} ({} ms)", result.name, result.duration_ms);
        } else {
            error!(
                "✗ {} - {}",
                result.name,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
        result
    }

    async fn execute<D: BrowserDriver>(&self, driver: &mut D, credentials: &Credentials) -> TestResult {
        let scenario = &self.config.scenario;
        let start = Instant::now();
        let mut result = TestResult::new(&scenario.name);
        let mut workflow = WatchlistWorkflow::new(driver, scenario);

        info!("Starting scenario '{}'", scenario.name);

        let (login, duration_ms) = timed(workflow.login(credentials)).await;
        match login {
            Ok(()) => {
                result.setup = Some(StepResult::passed("login", duration_ms, &StepOutcome::Completed));
            }
            Err(e) => {
                error!("Login failed: {}", e);
                let mut setup = StepResult::failed("login", duration_ms, &e);
                setup.screenshot_path = self.capture_failure(workflow.driver_mut(), "login").await;
                result.setup = Some(setup);
                result.fail(&e);
                return result.finish(start);
            }
        }

        for step in WorkflowStep::MAIN_SEQUENCE {
            debug!("Running step: {}", step);
            let (outcome, duration_ms) = timed(workflow.run_step(step)).await;
            match outcome {
                Ok(outcome) => {
                    if let Some(note) = outcome.note() {
                        info!("{}: {}", step, note);
                    }
                    result.steps.push(StepResult::passed(step.name(), duration_ms, &outcome));
                }
                Err(e) => {
                    error!("Step {} failed: {}", step, e);
                    let mut failed = StepResult::failed(step.name(), duration_ms, &e);
                    failed.screenshot_path = self.capture_failure(workflow.driver_mut(), step.name()).await;
                    result.steps.push(failed);
                    result.fail(&e);
                    return result.finish(start);
                }
            }
        }

        let step = WorkflowStep::Cleanup;
        let (outcome, duration_ms) = timed(workflow.run_step(step)).await;
        result.cleanup = Some(match outcome {
            Ok(outcome) => StepResult::passed(step.name(), duration_ms, &outcome),
            Err(e) => {
                warn!("Cleanup failed, ignoring: {}", e);
                StepResult::failed(step.name(), duration_ms, &e)
            }
        });

        result.finish(start)
    }

    async fn capture_failure<D: BrowserDriver + ?Sized>(&self, driver: &mut D, step: &str) -> Option<PathBuf> {
        if !self.config.screenshot_on_failure {
            return None;
        }

        let file = format!(
            "{}-{}-{}.png",
            self.config.scenario.name,
            step,
            Utc::now().format("%Y%m%dT%H%M%S")
        );
        let path = self.config.output_dir.join("screenshots").join(file);

        match driver.screenshot(&path).await {
            Ok(()) => {
                info!("Failure screenshot: {}", path.display());
                Some(path)
            }
            Err(e) => {
                warn!("Could not capture failure screenshot: {}", e);
                None
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

async fn timed<T, F>(fut: F) -> (E2eResult<T>, u64)
where
    F: Future<Output = E2eResult<T>>,
{
    let start = Instant::now();
    let result = fut.await;
    (result, start.elapsed().as_millis() as u64)
}
