//! Run Command

use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use wikiwatch_e2e::playwright::{Browser, PlaywrightConfig};
use wikiwatch_e2e::{E2eResult, RunnerConfig, StepResult, TestRunner, TestSuiteResult};

use super::{load_scenario, EXIT_CONFIG, EXIT_FAILED};
use crate::output::{print_error, print_list, print_structured, print_success, print_warning};
use crate::output::{OutputFormat, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Scenario file (YAML); the built-in scenario is used when omitted
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Browser engine (chromium, firefox, webkit)
    #[arg(short, long, default_value = "chromium")]
    pub browser: String,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Directory for results and failure screenshots
    #[arg(short, long, default_value = "test-results")]
    pub output: PathBuf,

    /// Run the scenario this many times, each in a fresh session
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Fetch the login page once before launching the browser
    #[arg(long)]
    pub preflight: bool,

    /// Skip screenshots of failed steps
    #[arg(long)]
    pub no_screenshots: bool,

    /// Directory whose node_modules provides Playwright
    #[arg(long, env = "WIKIWATCH_NODE_DIR", default_value = ".")]
    pub node_dir: PathBuf,
}

/// One row of the step table
#[derive(Serialize)]
pub struct StepRow {
    pub run: usize,
    pub step: String,
    pub status: &'static str,
    pub duration_ms: u64,
    pub detail: String,
}

impl StepRow {
    fn new(run: usize, step: &StepResult) -> Self {
        let (status, detail) = match (&step.error, &step.note) {
            (Some(err), _) => ("failed", err.clone()),
            (None, Some(note)) => ("tolerated", note.clone()),
            (None, None) => ("passed", String::new()),
        };
        let detail = match &step.screenshot_path {
            Some(path) => format!("{} (screenshot: {})", detail, path.display()),
            None => detail,
        };
        Self {
            run,
            step: step.step_name.clone(),
            status,
            duration_ms: step.duration_ms,
            detail,
        }
    }
}

impl TableDisplay for StepRow {
    fn headers() -> Vec<&'static str> {
        vec!["Run", "Step", "Status", "Duration", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        let status = match self.status {
            "passed" => "✓ passed".green().to_string(),
            "tolerated" => "~ tolerated".yellow().to_string(),
            _ => "✗ failed".red().to_string(),
        };
        vec![
            self.run.to_string(),
            self.step.clone(),
            status,
            format!("{}ms", self.duration_ms),
            self.detail.clone(),
        ]
    }
}

fn build_config(args: &RunArgs) -> E2eResult<RunnerConfig> {
    let scenario = load_scenario(args.scenario.as_deref())?;
    let playwright = PlaywrightConfig {
        browser: Browser::from_str(&args.browser)?,
        headless: !args.headed,
        node_dir: args.node_dir.clone(),
        ..Default::default()
    };

    Ok(RunnerConfig {
        scenario,
        playwright,
        output_dir: args.output.clone(),
        screenshot_on_failure: !args.no_screenshots,
        preflight: args.preflight,
        ..Default::default()
    })
}

/// Execute the run command and return the process exit code
pub async fn execute(args: RunArgs, format: OutputFormat) -> i32 {
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            print_error(&e.to_string());
            return EXIT_CONFIG;
        }
    };

    let runner = TestRunner::with_config(config);
    let suite = match runner.run_repeated(args.repeat as usize).await {
        Ok(suite) => suite,
        Err(e) => {
            print_error(&format!("{} ({:?})", e, e.class()));
            return EXIT_CONFIG;
        }
    };

    if let Err(e) = runner.write_results(&suite) {
        print_warning(&format!("Could not write results: {}", e));
    }

    print_suite(&suite, format);

    if suite.failed == 0 {
        0
    } else {
        EXIT_FAILED
    }
}

fn print_suite(suite: &TestSuiteResult, format: OutputFormat) {
    if print_structured(suite, format) {
        return;
    }

    let rows: Vec<StepRow> = suite
        .results
        .iter()
        .enumerate()
        .flat_map(|(i, result)| {
            result
                .setup
                .iter()
                .chain(result.steps.iter())
                .chain(result.cleanup.iter())
                .map(move |step| StepRow::new(i + 1, step))
        })
        .collect();
    print_list(&rows, format);

    for result in &suite.results {
        if let Some(cleanup) = result.cleanup.as_ref().filter(|c| !c.success) {
            print_warning(&format!(
                "Cleanup did not finish; the account may still watch an article: {}",
                cleanup.error.as_deref().unwrap_or("unknown error")
            ));
        }
    }

    let summary = format!(
        "{} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
    if suite.failed == 0 {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}
