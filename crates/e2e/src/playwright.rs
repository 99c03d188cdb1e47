//! Playwright browser automation
//!
//! A single `node` process runs an embedded bridge script that owns one
//! browser, one context and one page for the lifetime of the driver. Requests
//! and replies are JSON lines on the child's stdin/stdout, matched by id.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::driver::{BrowserDriver, LoadState, Locator};
use crate::error::{E2eError, E2eResult};

/// Extra time granted to the bridge on top of Playwright's own timeouts
const REPLY_MARGIN: Duration = Duration::from_secs(10);

/// How long `close` waits for the bridge to exit on its own
const EXIT_GRACE: Duration = Duration::from_secs(5);

const BRIDGE_SCRIPT: &str = r##"
const readline = require('readline');
const { chromium, firefox, webkit } = require(
  require.resolve('playwright', { paths: [process.cwd()] })
);
const engines = { chromium, firefox, webkit };

let browser = null;
let context = null;
let page = null;

function resolve(loc) {
  switch (loc.kind) {
    case 'css':
      return page.locator(loc.selector);
    case 'role':
      return page.getByRole(loc.role, { name: loc.name, exact: loc.exact });
    case 'text':
      return page.getByText(loc.text);
    case 'first':
      return resolve(loc.inner).first();
    default:
      throw new Error(`unknown locator kind: ${loc.kind}`);
  }
}

const handlers = {
  async launch(msg) {
    browser = await engines[msg.browser].launch({ headless: msg.headless });
    context = await browser.newContext({
      viewport: { width: msg.viewport_width, height: msg.viewport_height },
    });
    context.setDefaultTimeout(msg.action_timeout_ms);
    context.setDefaultNavigationTimeout(msg.navigation_timeout_ms);
    page = await context.newPage();
    return null;
  },
  async goto(msg) {
    await page.goto(msg.url);
    return null;
  },
  async fill(msg) {
    await resolve(msg.locator).fill(msg.value);
    return null;
  },
  async click(msg) {
    await resolve(msg.locator).click();
    return null;
  },
  async check(msg) {
    await resolve(msg.locator).check();
    return null;
  },
  async is_visible(msg) {
    return await resolve(msg.locator).first().isVisible();
  },
  async count(msg) {
    return await resolve(msg.locator).count();
  },
  async inner_text(msg) {
    return await resolve(msg.locator).first().innerText();
  },
  async current_url() {
    return page.url();
  },
  async wait_for_load_state(msg) {
    await page.waitForLoadState(msg.state, { timeout: msg.timeout_ms });
    return null;
  },
  async screenshot(msg) {
    await page.screenshot({ path: msg.path, fullPage: true });
    return null;
  },
  async close() {
    if (context) await context.close();
    if (browser) await browser.close();
    context = null;
    browser = null;
    return null;
  },
};

function reply(obj) {
  process.stdout.write(JSON.stringify(obj) + '\n');
}

async function handle(line) {
  let msg;
  try {
    msg = JSON.parse(line);
  } catch (e) {
    reply({ id: null, ok: false, error: `malformed request: ${e.message}` });
    return;
  }
  const handler = handlers[msg.cmd];
  if (!handler) {
    reply({ id: msg.id, ok: false, error: `unknown command: ${msg.cmd}` });
    return;
  }
  try {
    const value = await handler(msg);
    reply({ id: msg.id, ok: true, value });
  } catch (e) {
    reply({ id: msg.id, ok: false, error: e.message, timeout: e.name === 'TimeoutError' });
  }
}

let queue = Promise.resolve();
const rl = readline.createInterface({ input: process.stdin });
rl.on('line', (line) => {
  queue = queue.then(() => handle(line));
});
rl.on('close', () => {
  queue
    .then(() => (browser ? browser.close() : null))
    .catch(() => {})
    .finally(() => process.exit(0));
});
"##;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> E2eResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// `node` executable
    pub node_binary: PathBuf,
    /// Directory whose `node_modules` provides the `playwright` package
    pub node_dir: PathBuf,
    /// Default bound for clicks, fills and other actions
    pub action_timeout: Duration,
    pub navigation_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            node_binary: PathBuf::from("node"),
            node_dir: PathBuf::from("."),
            action_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum BridgeCommand {
    Launch {
        browser: Browser,
        headless: bool,
        viewport_width: u32,
        viewport_height: u32,
        action_timeout_ms: u64,
        navigation_timeout_ms: u64,
    },
    Goto {
        url: String,
    },
    Fill {
        locator: Locator,
        value: String,
    },
    Click {
        locator: Locator,
    },
    Check {
        locator: Locator,
    },
    IsVisible {
        locator: Locator,
    },
    Count {
        locator: Locator,
    },
    InnerText {
        locator: Locator,
    },
    CurrentUrl,
    WaitForLoadState {
        state: LoadState,
        timeout_ms: u64,
    },
    Screenshot {
        path: String,
    },
    Close,
}

impl BridgeCommand {
    /// Log label; never includes filled values
    fn describe(&self) -> String {
        match self {
            BridgeCommand::Launch { browser, .. } => format!("launch:{}", browser.as_str()),
            BridgeCommand::Goto { url } => format!("goto:{}", url),
            BridgeCommand::Fill { locator, .. } => format!("fill:{}", locator),
            BridgeCommand::Click { locator } => format!("click:{}", locator),
            BridgeCommand::Check { locator } => format!("check:{}", locator),
            BridgeCommand::IsVisible { locator } => format!("is_visible:{}", locator),
            BridgeCommand::Count { locator } => format!("count:{}", locator),
            BridgeCommand::InnerText { locator } => format!("inner_text:{}", locator),
            BridgeCommand::CurrentUrl => "current_url".to_string(),
            BridgeCommand::WaitForLoadState { state, .. } => format!("wait_for_load_state:{:?}", state),
            BridgeCommand::Screenshot { path } => format!("screenshot:{}", path),
            BridgeCommand::Close => "close".to_string(),
        }
    }
}

#[derive(Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: &'a BridgeCommand,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: Option<u64>,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timeout: bool,
}

/// Playwright-backed [`BrowserDriver`]
pub struct PlaywrightDriver {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    reply_timeout: Duration,
    closed: bool,
    /// Holds the bridge script on disk for the child's lifetime
    _script_dir: tempfile::TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge and open a fresh browser session
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config.node_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.node_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "Failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            reply_timeout: config.action_timeout.max(config.navigation_timeout) + REPLY_MARGIN,
            closed: false,
            _script_dir: script_dir,
        };

        driver
            .request(BridgeCommand::Launch {
                browser: config.browser,
                headless: config.headless,
                viewport_width: config.viewport_width,
                viewport_height: config.viewport_height,
                action_timeout_ms: config.action_timeout.as_millis() as u64,
                navigation_timeout_ms: config.navigation_timeout.as_millis() as u64,
            })
            .await?;

        info!("Launched {} (headless: {})", config.browser.as_str(), config.headless);
        Ok(driver)
    }

    /// Check if Playwright is installed
    pub fn check_playwright_installed(node_dir: &Path) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .current_dir(node_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&mut self, command: BridgeCommand) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::DriverClosed);
        }

        self.next_id += 1;
        let id = self.next_id;
        let label = command.describe();

        let mut line = serde_json::to_string(&BridgeRequest {
            id,
            command: &command,
        })?;
        line.push('\n');

        debug!("-> #{} {}", id, label);
        let stdin = self.stdin.as_mut().ok_or(E2eError::DriverClosed)?;
        stdin.write_all(line.as_bytes()).await?;
        stdin.flush().await?;

        let reply = timeout(self.reply_timeout, self.read_reply(id))
            .await
            .map_err(|_| E2eError::Timeout(format!("bridge reply to {}", label)))??;

        if reply.ok {
            debug!("<- #{} ok", id);
            return Ok(reply.value);
        }

        let message = reply.error.unwrap_or_else(|| "unknown bridge error".to_string());
        if reply.timeout {
            Err(E2eError::Timeout(format!("{}: {}", label, message)))
        } else {
            Err(E2eError::Playwright(format!("{}: {}", label, message)))
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<BridgeReply> {
        loop {
            let line = match self.stdout.next_line().await? {
                Some(line) => line,
                None => return Err(E2eError::DriverClosed),
            };

            let reply: BridgeReply = match serde_json::from_str(&line) {
                Ok(reply) => reply,
                Err(_) => {
                    debug!(target: "playwright", "{}", line);
                    continue;
                }
            };

            match reply.id {
                Some(reply_id) if reply_id == id => return Ok(reply),
                None if !reply.ok => {
                    return Err(E2eError::Playwright(
                        reply.error.unwrap_or_else(|| "bridge rejected request".to_string()),
                    ))
                }
                other => warn!("Discarding stale bridge reply {:?} (waiting for #{})", other, id),
            }
        }
    }

    async fn terminate(&mut self) {
        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                    && timeout(Duration::from_millis(500), self.child.wait()).await.is_ok()
                {
                    return;
                }
            }
        }

        let _ = self.child.kill().await;
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Goto { url: url.to_string() }).await?;
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.request(BridgeCommand::Fill {
            locator: locator.clone(),
            value: value.to_string(),
        })
        .await?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.request(BridgeCommand::Click { locator: locator.clone() }).await?;
        Ok(())
    }

    async fn check(&mut self, locator: &Locator) -> E2eResult<()> {
        self.request(BridgeCommand::Check { locator: locator.clone() }).await?;
        Ok(())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let value = self
            .request(BridgeCommand::IsVisible { locator: locator.clone() })
            .await?;
        value
            .as_bool()
            .ok_or_else(|| E2eError::Playwright(format!("is_visible returned {}", value)))
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        let value = self
            .request(BridgeCommand::Count { locator: locator.clone() })
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Playwright(format!("count returned {}", value)))
    }

    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String> {
        let value = self
            .request(BridgeCommand::InnerText { locator: locator.clone() })
            .await?;
        match value {
            serde_json::Value::String(text) => Ok(text),
            other => Err(E2eError::Playwright(format!("inner_text returned {}", other))),
        }
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        match self.request(BridgeCommand::CurrentUrl).await? {
            serde_json::Value::String(url) => Ok(url),
            other => Err(E2eError::Playwright(format!("current_url returned {}", other))),
        }
    }

    async fn wait_for_load_state(&mut self, state: LoadState, timeout: Duration) -> E2eResult<()> {
        self.request(BridgeCommand::WaitForLoadState {
            state,
            timeout_ms: timeout.as_millis() as u64,
        })
        .await?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.request(BridgeCommand::Screenshot {
            path: path.to_string_lossy().into_owned(),
        })
        .await?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.request(BridgeCommand::Close).await.map(|_| ());
        self.closed = true;

        // EOF on stdin makes the bridge exit.
        drop(self.stdin.take());
        if timeout(EXIT_GRACE, self.child.wait()).await.is_err() {
            warn!("Playwright bridge did not exit, terminating");
            self.terminate().await;
        }

        result
    }
}

impl Drop for PlaywrightDriver {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::AriaRole;

    fn sample_commands() -> Vec<BridgeCommand> {
        let locator = Locator::css("#ca-watch");
        vec![
            BridgeCommand::Launch {
                browser: Browser::Chromium,
                headless: true,
                viewport_width: 1280,
                viewport_height: 720,
                action_timeout_ms: 30_000,
                navigation_timeout_ms: 30_000,
            },
            BridgeCommand::Goto { url: "https://en.wikipedia.org".into() },
            BridgeCommand::Fill { locator: locator.clone(), value: "x".into() },
            BridgeCommand::Click { locator: locator.clone() },
            BridgeCommand::Check { locator: locator.clone() },
            BridgeCommand::IsVisible { locator: locator.clone() },
            BridgeCommand::Count { locator: locator.clone() },
            BridgeCommand::InnerText { locator },
            BridgeCommand::CurrentUrl,
            BridgeCommand::WaitForLoadState { state: LoadState::NetworkIdle, timeout_ms: 1 },
            BridgeCommand::Screenshot { path: "a.png".into() },
            BridgeCommand::Close,
        ]
    }

    #[test]
    fn test_every_command_has_a_bridge_handler() {
        for command in sample_commands() {
            let json = serde_json::to_value(&command).unwrap();
            let name = json["cmd"].as_str().unwrap().to_string();
            let needle = format!("async {}(", name);
            assert!(BRIDGE_SCRIPT.contains(&needle), "bridge has no handler for {}", name);
        }
    }

    #[test]
    fn test_request_wire_format() {
        let command = BridgeCommand::Check {
            locator: Locator::role_exact(AriaRole::Checkbox, "The Matrix (talk | history)"),
        };
        let json = serde_json::to_value(BridgeRequest { id: 7, command: &command }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "cmd": "check",
                "locator": {
                    "kind": "role",
                    "role": "checkbox",
                    "name": "The Matrix (talk | history)",
                    "exact": true
                }
            })
        );
    }

    #[test]
    fn test_fill_description_hides_value() {
        let command = BridgeCommand::Fill {
            locator: Locator::css("#wpPassword1"),
            value: "hunter2".into(),
        };
        let label = command.describe();
        assert!(label.contains("#wpPassword1"));
        assert!(!label.contains("hunter2"));
    }

    #[test]
    fn test_reply_parsing() {
        let reply: BridgeReply =
            serde_json::from_str(r#"{"id":3,"ok":false,"error":"Timeout 5000ms exceeded","timeout":true}"#)
                .unwrap();
        assert_eq!(reply.id, Some(3));
        assert!(!reply.ok);
        assert!(reply.timeout);

        let reply: BridgeReply = serde_json::from_str(r#"{"id":4,"ok":true,"value":true}"#).unwrap();
        assert_eq!(reply.value, serde_json::Value::Bool(true));
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("Firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert_eq!("chrome".parse::<Browser>().unwrap(), Browser::Chromium);
        assert!("netscape".parse::<Browser>().is_err());
    }
}
