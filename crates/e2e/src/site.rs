//! URLs and selectors of the remote MediaWiki site
//!
//! This is the whole contract with the site's markup. If the site renames an
//! element id or rewords a message, this is the only file to touch.

use serde::Serialize;

use crate::article::ArticleRef;
use crate::driver::{AriaRole, Locator, UrlPattern};
use crate::error::E2eResult;

pub const USERNAME_INPUT: &str = "#wpName1";
pub const PASSWORD_INPUT: &str = "#wpPassword1";
pub const LOGIN_BUTTON: &str = "#wpLoginAttempt";
/// Personal-tools watchlist link, only rendered for logged-in users
pub const LOGGED_IN_INDICATOR: &str = "#pt-watchlist-2";
pub const WATCH_CONTROL: &str = "#ca-watch";
pub const UNWATCH_CONTROL: &str = "#ca-unwatch";
pub const PAGE_BODY: &str = "body";
pub const FIRST_HEADING: &str = "#firstHeading";
pub const REMOVE_TITLES_LABEL: &str = "Remove titles";
pub const REMOVAL_CONFIRMATION: &str = "A single title was removed from your watchlist:";
pub const RETURN_TO_WATCHLIST_LABEL: &str = "Special:Watchlist";

#[derive(Debug, Clone, Serialize)]
pub struct SiteMap {
    base_url: String,
}

impl SiteMap {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn login_url(&self) -> String {
        format!("{}/wiki/Special:UserLogin", self.base_url)
    }

    pub fn article_url(&self, article: &ArticleRef) -> String {
        article.url(&self.base_url)
    }

    pub fn edit_watchlist_url(&self) -> String {
        format!("{}/wiki/Special:EditWatchlist", self.base_url)
    }

    pub fn watchlist_url(&self) -> String {
        format!("{}/wiki/Special:Watchlist", self.base_url)
    }

    /// Main watchlist, with or without query parameters
    pub fn watchlist_pattern(&self) -> E2eResult<UrlPattern> {
        UrlPattern::glob(format!("{}*", self.watchlist_url()))
    }

    pub fn username_input(&self) -> Locator {
        Locator::css(USERNAME_INPUT)
    }

    pub fn password_input(&self) -> Locator {
        Locator::css(PASSWORD_INPUT)
    }

    pub fn login_button(&self) -> Locator {
        Locator::css(LOGIN_BUTTON)
    }

    pub fn logged_in_indicator(&self) -> Locator {
        Locator::css(LOGGED_IN_INDICATOR)
    }

    pub fn watch_control(&self) -> Locator {
        Locator::css(WATCH_CONTROL)
    }

    pub fn unwatch_control(&self) -> Locator {
        Locator::css(UNWATCH_CONTROL)
    }

    pub fn body(&self) -> Locator {
        Locator::css(PAGE_BODY)
    }

    pub fn heading(&self) -> Locator {
        Locator::css(FIRST_HEADING)
    }

    pub fn removal_checkbox(&self, article: &ArticleRef) -> Locator {
        Locator::role_exact(AriaRole::Checkbox, article.checkbox_label())
    }

    pub fn remove_titles_button(&self) -> Locator {
        Locator::role(AriaRole::Button, REMOVE_TITLES_LABEL)
    }

    pub fn removal_confirmation(&self) -> Locator {
        Locator::text(REMOVAL_CONFIRMATION)
    }

    pub fn return_to_watchlist_link(&self) -> Locator {
        Locator::role(AriaRole::Link, RETURN_TO_WATCHLIST_LABEL)
    }

    pub fn article_link(&self, article: &ArticleRef) -> Locator {
        Locator::role_exact(AriaRole::Link, article.display()).first()
    }
}
