//! In-memory stand-in for the MediaWiki pages the workflow touches

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, MutexGuard};

use wikiwatch_e2e::site;
use wikiwatch_e2e::{
    AriaRole, BrowserDriver, Credentials, E2eError, E2eResult, LoadState, Locator, Scenario,
    Timeouts,
};

pub const BASE_URL: &str = "https://wiki.test";
pub const USERNAME: &str = "Example";
pub const PASSWORD: &str = "correct horse";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("wikiwatch_e2e=debug")
        .try_init();
}

pub fn credentials() -> Credentials {
    Credentials {
        username: USERNAME.to_string(),
        password: PASSWORD.to_string(),
    }
}

/// Default articles against the fake site, with short bounds
pub fn scenario() -> Scenario {
    Scenario {
        base_url: BASE_URL.to_string(),
        timeouts: Timeouts {
            login_ms: 50,
            watch_toggle_ms: 50,
            listing_ms: 50,
            confirmation_ms: 50,
            watchlist_absent_ms: 50,
            survivor_ms: 50,
            expect_ms: 50,
            cleanup_ms: 30,
            navigation_ms: 50,
            poll_interval_ms: 5,
        },
        ..Scenario::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Blank,
    Login,
    Article(String),
    EditWatchlist,
    RemovalDone(Vec<String>),
    Watchlist,
}

#[derive(Debug, Default)]
pub struct SiteState {
    // Persistent, server-side
    /// Display titles on the account's watchlist
    pub watchlist: BTreeSet<String>,

    // Per session
    pub page: Page,
    pub url: String,
    pub logged_in: bool,
    pub closed: bool,
    typed_username: String,
    typed_password: String,
    checked: BTreeSet<String>,

    // Observations
    pub visited: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub close_calls: usize,

    // Fault injection
    pub hide_article_links: bool,
    pub heading_override: Option<String>,
    pub watch_click_ignored: bool,
    /// Extra text rendered on the main watchlist
    pub watchlist_banner: Option<String>,
    /// Extra text rendered on Special:EditWatchlist
    pub edit_watchlist_banner: Option<String>,
    /// "Remove titles" confirms but leaves the watchlist as it was
    pub removal_ignored: bool,
    /// Article id whose page renders neither watch control
    pub controls_hidden_on: Option<String>,
}

#[derive(Clone, Default)]
pub struct FakeWiki {
    state: Arc<Mutex<SiteState>>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watched(titles: &[&str]) -> Self {
        let wiki = Self::new();
        wiki.state()
            .watchlist
            .extend(titles.iter().map(|t| t.to_string()));
        wiki
    }

    pub fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock()
    }

    /// A new browser session against the same account
    pub fn reopen(&self) -> Self {
        {
            let mut s = self.state();
            s.page = Page::Blank;
            s.url = String::new();
            s.logged_in = false;
            s.closed = false;
            s.typed_username.clear();
            s.typed_password.clear();
            s.checked.clear();
        }
        self.clone()
    }

    pub fn watchlist(&self) -> Vec<String> {
        self.state().watchlist.iter().cloned().collect()
    }
}

fn display(id: &str) -> String {
    id.replace('_', " ")
}

fn checkbox_label(title: &str) -> String {
    format!("{} (talk | history)", title)
}

fn not_found(locator: &Locator) -> E2eError {
    E2eError::Timeout(format!("{} to be actionable", locator))
}

impl SiteState {
    fn open(&self) -> E2eResult<()> {
        if self.closed {
            Err(E2eError::DriverClosed)
        } else {
            Ok(())
        }
    }

    fn navigate(&mut self, url: &str) {
        let path = url.strip_prefix(BASE_URL).unwrap_or(url);
        self.page = if path == "/wiki/Special:UserLogin" {
            Page::Login
        } else if path == "/wiki/Special:EditWatchlist" {
            Page::EditWatchlist
        } else if path.starts_with("/wiki/Special:Watchlist") {
            Page::Watchlist
        } else if let Some(id) = path.strip_prefix("/wiki/") {
            Page::Article(id.to_string())
        } else {
            Page::Blank
        };
        self.url = url.to_string();
        self.visited.push(url.to_string());
        self.checked.clear();
    }

    fn text(&self) -> String {
        match &self.page {
            Page::Blank => String::new(),
            Page::Login => "Log in\nUsername\nPassword\nLog in".to_string(),
            Page::Article(id) => format!(
                "{}\nFrom Wikipedia, the free encyclopedia\n{} is an article.",
                self.heading(id),
                display(id)
            ),
            Page::EditWatchlist => {
                let mut text = String::from("Edit watchlist\nTitles on your watchlist\n");
                for title in &self.watchlist {
                    text.push_str(&checkbox_label(title));
                    text.push('\n');
                }
                if let Some(banner) = &self.edit_watchlist_banner {
                    text.push_str(banner);
                    text.push('\n');
                }
                text.push_str("Remove titles");
                text
            }
            Page::RemovalDone(titles) => {
                let mut text = if titles.len() == 1 {
                    format!("{}\n", site::REMOVAL_CONFIRMATION)
                } else {
                    format!("{} titles were removed from your watchlist:\n", titles.len())
                };
                for title in titles {
                    text.push_str(&checkbox_label(title));
                    text.push('\n');
                }
                text.push_str("Return to Special:Watchlist.");
                text
            }
            Page::Watchlist => {
                let mut text = String::from("Watchlist\n");
                for title in &self.watchlist {
                    text.push_str(&format!("diff hist {} . . (+12) . . Editor\n", title));
                }
                if let Some(banner) = &self.watchlist_banner {
                    text.push_str(banner);
                }
                text
            }
        }
    }

    fn controls_shown(&self, id: &str) -> bool {
        self.logged_in && self.controls_hidden_on.as_deref() != Some(id)
    }

    fn heading(&self, id: &str) -> String {
        self.heading_override.clone().unwrap_or_else(|| display(id))
    }

    fn count(&self, locator: &Locator) -> usize {
        match locator {
            Locator::First { inner } => self.count(inner).min(1),
            Locator::Css { selector } => {
                let visible = match selector.as_str() {
                    site::LOGGED_IN_INDICATOR => self.logged_in,
                    site::USERNAME_INPUT | site::PASSWORD_INPUT | site::LOGIN_BUTTON => {
                        self.page == Page::Login
                    }
                    site::WATCH_CONTROL => match &self.page {
                        Page::Article(id) if self.controls_shown(id) => {
                            !self.watchlist.contains(&display(id))
                        }
                        _ => false,
                    },
                    site::UNWATCH_CONTROL => match &self.page {
                        Page::Article(id) if self.controls_shown(id) => {
                            self.watchlist.contains(&display(id))
                        }
                        _ => false,
                    },
                    site::FIRST_HEADING => matches!(self.page, Page::Article(_)),
                    site::PAGE_BODY => true,
                    _ => false,
                };
                visible as usize
            }
            Locator::Role { role, name, exact } => match (role, &self.page) {
                (AriaRole::Checkbox, Page::EditWatchlist) => self
                    .watchlist
                    .iter()
                    .filter(|t| name_matches(&checkbox_label(t), name, *exact))
                    .count(),
                (AriaRole::Button, Page::EditWatchlist) => {
                    (!self.watchlist.is_empty() && name_matches(site::REMOVE_TITLES_LABEL, name, *exact))
                        as usize
                }
                (AriaRole::Link, Page::RemovalDone(_)) => {
                    name_matches(site::RETURN_TO_WATCHLIST_LABEL, name, *exact) as usize
                }
                (AriaRole::Link, Page::EditWatchlist) if !self.hide_article_links => self
                    .watchlist
                    .iter()
                    .filter(|t| name_matches(t, name, *exact))
                    .count(),
                (AriaRole::Heading, Page::Article(id)) => {
                    name_matches(&self.heading(id), name, *exact) as usize
                }
                _ => 0,
            },
            Locator::Text { text } => self.text().contains(text.as_str()) as usize,
        }
    }
}

fn name_matches(actual: &str, wanted: &str, exact: bool) -> bool {
    if exact {
        actual == wanted
    } else {
        actual.to_lowercase().contains(&wanted.to_lowercase())
    }
}

fn unwrap_first(locator: &Locator) -> &Locator {
    match locator {
        Locator::First { inner } => unwrap_first(inner),
        other => other,
    }
}

#[async_trait]
impl BrowserDriver for FakeWiki {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let mut s = self.state();
        s.open()?;
        s.navigate(url);
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()> {
        let mut s = self.state();
        s.open()?;
        if s.count(locator) == 0 {
            return Err(not_found(locator));
        }
        match locator {
            Locator::Css { selector } if selector == site::USERNAME_INPUT => {
                s.typed_username = value.to_string()
            }
            Locator::Css { selector } if selector == site::PASSWORD_INPUT => {
                s.typed_password = value.to_string()
            }
            _ => return Err(not_found(locator)),
        }
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        let mut s = self.state();
        s.open()?;
        if s.count(locator) == 0 {
            return Err(not_found(locator));
        }

        match unwrap_first(locator).clone() {
            Locator::Css { selector } if selector == site::LOGIN_BUTTON => {
                if s.typed_username == USERNAME && s.typed_password == PASSWORD {
                    s.logged_in = true;
                    s.navigate(&format!("{}/wiki/Main_Page", BASE_URL));
                }
            }
            Locator::Css { selector } if selector == site::WATCH_CONTROL => {
                if let Page::Article(id) = s.page.clone() {
                    if !s.watch_click_ignored {
                        s.watchlist.insert(display(&id));
                    }
                }
            }
            Locator::Role { role: AriaRole::Button, .. } => {
                let removed: Vec<String> = s.checked.iter().cloned().collect();
                if !s.removal_ignored {
                    for title in &removed {
                        s.watchlist.remove(title);
                    }
                }
                s.checked.clear();
                s.page = Page::RemovalDone(removed);
            }
            Locator::Role { role: AriaRole::Link, name, .. } => match s.page.clone() {
                Page::RemovalDone(_) => s.navigate(&format!("{}/wiki/Special:Watchlist", BASE_URL)),
                Page::EditWatchlist => {
                    s.navigate(&format!("{}/wiki/{}", BASE_URL, name.replace(' ', "_")))
                }
                _ => return Err(not_found(locator)),
            },
            _ => return Err(not_found(locator)),
        }
        Ok(())
    }

    async fn check(&mut self, locator: &Locator) -> E2eResult<()> {
        let mut s = self.state();
        s.open()?;
        if s.count(locator) != 1 {
            return Err(not_found(locator));
        }
        match locator {
            Locator::Role {
                role: AriaRole::Checkbox,
                name,
                ..
            } => {
                let title = name.trim_end_matches(" (talk | history)").to_string();
                s.checked.insert(title);
                Ok(())
            }
            _ => Err(not_found(locator)),
        }
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let s = self.state();
        s.open()?;
        Ok(s.count(locator) > 0)
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        let s = self.state();
        s.open()?;
        Ok(s.count(locator))
    }

    async fn inner_text(&mut self, locator: &Locator) -> E2eResult<String> {
        let s = self.state();
        s.open()?;
        match (unwrap_first(locator), &s.page) {
            (Locator::Css { selector }, _) if selector == site::PAGE_BODY => Ok(s.text()),
            (Locator::Css { selector }, Page::Article(id)) if selector == site::FIRST_HEADING => {
                Ok(format!("{}\n", s.heading(id)))
            }
            _ => Err(not_found(locator)),
        }
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let s = self.state();
        s.open()?;
        Ok(s.url.clone())
    }

    async fn wait_for_load_state(&mut self, _state: LoadState, _timeout: Duration) -> E2eResult<()> {
        self.state().open()
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        let mut s = self.state();
        s.open()?;
        s.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        let mut s = self.state();
        s.close_calls += 1;
        s.closed = true;
        Ok(())
    }
}
