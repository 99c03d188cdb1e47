//! Scenario Command

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use wikiwatch_e2e::Scenario;

use super::{load_scenario, EXIT_CONFIG};
use crate::output::{print_error, print_list, print_structured, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct ScenarioArgs {
    /// Scenario file (YAML); the built-in scenario is shown when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
}

#[derive(Serialize)]
struct Setting {
    key: String,
    value: String,
}

impl TableDisplay for Setting {
    fn headers() -> Vec<&'static str> {
        vec!["Setting", "Value"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.key.clone(), self.value.clone()]
    }
}

fn setting(key: &str, value: impl ToString) -> Setting {
    Setting {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn settings(scenario: &Scenario) -> Vec<Setting> {
    let site = scenario.site();
    let t = &scenario.timeouts;
    vec![
        setting("name", &scenario.name),
        setting("base_url", &scenario.base_url),
        setting("primary", &scenario.primary),
        setting("survivor", &scenario.survivor),
        setting("login_url", site.login_url()),
        setting("primary_url", site.article_url(&scenario.primary)),
        setting("survivor_url", site.article_url(&scenario.survivor)),
        setting("edit_watchlist_url", site.edit_watchlist_url()),
        setting("watchlist_url", site.watchlist_url()),
        setting("timeouts.login_ms", t.login_ms),
        setting("timeouts.watch_toggle_ms", t.watch_toggle_ms),
        setting("timeouts.listing_ms", t.listing_ms),
        setting("timeouts.confirmation_ms", t.confirmation_ms),
        setting("timeouts.watchlist_absent_ms", t.watchlist_absent_ms),
        setting("timeouts.survivor_ms", t.survivor_ms),
        setting("timeouts.expect_ms", t.expect_ms),
        setting("timeouts.cleanup_ms", t.cleanup_ms),
        setting("timeouts.navigation_ms", t.navigation_ms),
        setting("timeouts.poll_interval_ms", t.poll_interval_ms),
    ]
}

pub fn execute(args: ScenarioArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let scenario = match load_scenario(args.scenario.as_deref()) {
        Ok(scenario) => scenario,
        Err(e) => {
            print_error(&e.to_string());
            return Ok(EXIT_CONFIG);
        }
    };

    if !print_structured(&scenario, format) {
        print_list(&settings(&scenario), format);
    }
    Ok(0)
}
