//! Capability probing for toggle-style controls

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{BrowserDriver, Locator};
use crate::error::E2eResult;

/// What a page currently offers for a control that can be in one of two
/// states (watch/unwatch, checkbox present or not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlState {
    /// The control we want to act on is visible
    Actionable,
    /// The control is showing its other state
    AlternateState,
    /// Neither form is visible
    Absent,
}

/// Probe `primary` first, then `alternate` if there is one.
pub async fn probe<D>(
    driver: &mut D,
    primary: &Locator,
    alternate: Option<&Locator>,
) -> E2eResult<ControlState>
where
    D: BrowserDriver + ?Sized,
{
    let state = if driver.is_visible(primary).await? {
        ControlState::Actionable
    } else if let Some(alternate) = alternate {
        if driver.is_visible(alternate).await? {
            ControlState::AlternateState
        } else {
            ControlState::Absent
        }
    } else {
        ControlState::Absent
    };

    debug!("probe {}: {:?}", primary, state);
    Ok(state)
}
