//! Standard wait conditions

use crate::driver::{ElementHandle, Locator};
use crate::Result;
use super::engine::{WaitCondition, WaitKind};

/// Script reporting the document loading state
pub const READY_STATE_SCRIPT: &str = "return document.readyState";

/// Element present in the DOM and displayed
pub fn element_visible(locator: Locator) -> WaitCondition<ElementHandle> {
    let description = format!("element {} to be visible", locator);
    WaitCondition::new(WaitKind::Visibility, description, move |handle| {
        let locator = locator.clone();
        async move {
            let Some(element) = handle.find_element(&locator).await? else {
                return Ok(None);
            };
            not_stale(handle.is_displayed(&element).await)
                .map(|displayed| displayed.then_some(element))
        }
    })
}

/// Element present, displayed and enabled
pub fn element_clickable(locator: Locator) -> WaitCondition<ElementHandle> {
    let description = format!("element {} to be clickable", locator);
    WaitCondition::new(WaitKind::Clickability, description, move |handle| {
        let locator = locator.clone();
        async move {
            let Some(element) = handle.find_element(&locator).await? else {
                return Ok(None);
            };
            if !not_stale(handle.is_displayed(&element).await)? {
                return Ok(None);
            }
            not_stale(handle.is_enabled(&element).await)
                .map(|enabled| enabled.then_some(element))
        }
    })
}

/// A detached element counts as "not yet"; the next poll looks it up again
fn not_stale(check: Result<bool>) -> Result<bool> {
    match check {
        Err(e) if e.is_stale_element() => {
            tracing::debug!("Element went stale, retrying: {}", e);
            Ok(false)
        }
        other => other,
    }
}

/// `document.readyState` reports `complete`
pub fn page_ready() -> WaitCondition<()> {
    WaitCondition::new(WaitKind::PageLoad, "page to finish loading", |handle| async move {
        let state = handle.execute_script(READY_STATE_SCRIPT).await?;
        Ok((state.as_str() == Some("complete")).then_some(()))
    })
}
