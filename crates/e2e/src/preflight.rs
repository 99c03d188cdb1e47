//! Site preflight - one reachability check before a browser is launched

use std::time::Duration;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};
use crate::site::SiteMap;

/// Outcome of a successful preflight
#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub url: String,
    pub status: u16,
    pub elapsed_ms: u64,
}

/// Fetch the login page once. Any transport error or non-success status
/// means the site is unreachable; there is no retry.
pub async fn check_site(site: &SiteMap, request_timeout: Duration) -> E2eResult<PreflightReport> {
    let url = site.login_url();
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .user_agent(concat!("wikiwatch/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let start = std::time::Instant::now();
    let resp = client.get(&url).send().await.map_err(|e| {
        warn!("Preflight request failed: {}", e);
        E2eError::SiteUnreachable(format!("{}: {}", url, e))
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(E2eError::SiteUnreachable(format!("{} returned {}", url, status)));
    }

    let report = PreflightReport {
        url,
        status: status.as_u16(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!("Site reachable at {} ({} ms)", report.url, report.elapsed_ms);
    Ok(report)
}
