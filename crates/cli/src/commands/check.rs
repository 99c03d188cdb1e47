//! Check Command

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use wikiwatch_e2e::playwright::PlaywrightDriver;
use wikiwatch_e2e::{preflight, Credentials};

use super::{load_scenario, EXIT_CONFIG, EXIT_FAILED};
use crate::output::{print_error, print_list, print_structured, OutputFormat, TableDisplay};

#[derive(Args)]
pub struct CheckArgs {
    /// Scenario file (YAML); the built-in scenario is used when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Directory whose node_modules provides Playwright
    #[arg(long, env = "WIKIWATCH_NODE_DIR", default_value = ".")]
    pub node_dir: PathBuf,

    /// Request timeout for the site check, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Serialize)]
struct CheckRow {
    check: &'static str,
    ok: bool,
    detail: String,
}

impl TableDisplay for CheckRow {
    fn headers() -> Vec<&'static str> {
        vec!["Check", "OK", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let ok = if self.ok {
            "✓".green().to_string()
        } else {
            "✗".red().to_string()
        };
        vec![self.check.to_string(), ok, self.detail.clone()]
    }
}

pub async fn execute(args: CheckArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let scenario = match load_scenario(args.scenario.as_deref()) {
        Ok(scenario) => scenario,
        Err(e) => {
            print_error(&e.to_string());
            return Ok(EXIT_CONFIG);
        }
    };

    let mut rows = Vec::new();

    rows.push(match preflight::check_site(&scenario.site(), Duration::from_secs(args.timeout)).await {
        Ok(report) => CheckRow {
            check: "site",
            ok: true,
            detail: format!("{} returned {} in {} ms", report.url, report.status, report.elapsed_ms),
        },
        Err(e) => CheckRow {
            check: "site",
            ok: false,
            detail: e.to_string(),
        },
    });

    rows.push(match PlaywrightDriver::check_playwright_installed(&args.node_dir) {
        Ok(()) => CheckRow {
            check: "playwright",
            ok: true,
            detail: format!("found from {}", args.node_dir.display()),
        },
        Err(e) => CheckRow {
            check: "playwright",
            ok: false,
            detail: e.to_string(),
        },
    });

    rows.push(match Credentials::from_env() {
        Ok(credentials) => CheckRow {
            check: "credentials",
            ok: true,
            detail: format!("user {}", credentials.username),
        },
        Err(e) => CheckRow {
            check: "credentials",
            ok: false,
            detail: e.to_string(),
        },
    });

    if !print_structured(&rows, format) {
        print_list(&rows, format);
    }

    if rows.iter().all(|r| r.ok) {
        Ok(0)
    } else {
        Ok(EXIT_FAILED)
    }
}
