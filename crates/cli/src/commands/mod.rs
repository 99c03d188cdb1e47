//! CLI Commands

pub mod check;
pub mod run;
pub mod scenario;

use std::path::Path;

use wikiwatch_e2e::{E2eResult, Scenario};

/// Exit code for a failed scenario run
pub const EXIT_FAILED: i32 = 1;
/// Exit code for configuration problems and browser launch errors
pub const EXIT_CONFIG: i32 = 2;

/// Load the scenario file, or the built-in scenario when none is given
pub fn load_scenario(path: Option<&Path>) -> E2eResult<Scenario> {
    let scenario = match path {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::default(),
    };
    scenario.validate()?;
    Ok(scenario)
}
