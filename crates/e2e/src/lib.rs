//! WikiWatch E2E
//!
//! Drives a real browser through the Wikipedia watchlist round trip:
//! - Logs in with credentials taken from the environment
//! - Watches two articles and checks both are listed
//! - Removes the first, checks it is gone and the second remains
//! - Follows the remaining entry and checks the article heading
//! - Removes the remaining entry again (best effort)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestRunner (Rust)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Credentials::from_env()      configuration errors first    │
//! │  preflight::check_site()      optional reachability check   │
//! │  PlaywrightDriver::launch()   one session for the whole run │
//! │  WatchlistWorkflow                                          │
//! │    ├── login()                                              │
//! │    ├── run_step(step) for each of MAIN_SEQUENCE             │
//! │    └── run_step(Cleanup)      errors logged, not fatal      │
//! │  driver.close()               always                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver (trait)                                      │
//! │    └── PlaywrightDriver ── JSON lines ──▶ node bridge.js    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod article;
pub mod credentials;
pub mod driver;
pub mod error;
pub mod expect;
pub mod playwright;
pub mod preflight;
pub mod probe;
pub mod runner;
pub mod scenario;
pub mod site;
pub mod workflow;

pub use article::ArticleRef;
pub use credentials::Credentials;
pub use driver::{AriaRole, BrowserDriver, LoadState, Locator, UrlPattern};
pub use error::{E2eError, E2eResult, ErrorClass};
pub use runner::{RunnerConfig, StepResult, TestResult, TestRunner, TestSuiteResult};
pub use scenario::{Scenario, Timeouts};
pub use workflow::{StepOutcome, WatchlistWorkflow, WorkflowStep};
