//! Contains the contract between the tracker and the browser it observes.
//! [TabQuery] is the main artifact of this module. The daemon answers it with
//! [mirror::BrowserMirror], which is fed by [native] messages sent from the extension.

pub mod domain;
pub mod mirror;
pub mod native;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sentinel the browser uses when focus leaves all of its windows.
pub const WINDOW_ID_NONE: WindowId = WindowId(-1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub id: TabId,
    /// Address shown in the tab. Internal pages (for example a fresh new tab) may not expose
    /// one.
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabFilter {
    /// Active tab of the window the user interacted with last.
    CurrentWindow,
    Window(WindowId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFocus {
    None,
    Window(WindowId),
}

impl From<WindowId> for WindowFocus {
    fn from(value: WindowId) -> Self {
        if value == WINDOW_ID_NONE {
            WindowFocus::None
        } else {
            WindowFocus::Window(value)
        }
    }
}

/// Lifecycle events the tracker reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEvent {
    /// A named periodic trigger fired.
    Alarm { name: Arc<str> },
    TabActivated { tab_id: TabId },
    /// A tab changed. `url` is only present when the tab navigated somewhere new.
    TabUpdated {
        tab_id: TabId,
        url: Option<String>,
        active: bool,
    },
    WindowFocusChanged(WindowFocus),
}

/// Intended to serve as a contract every browser bridge must implement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TabQuery: Send + Sync {
    /// Returns the active tab matching the filter, if there is one.
    async fn active_tab(&self, filter: TabFilter) -> Result<Option<Tab>>;
}

#[cfg(test)]
mod tests {
    use super::{WindowFocus, WindowId};

    #[test]
    fn test_window_focus_sentinel() {
        assert_eq!(WindowFocus::from(WindowId(-1)), WindowFocus::None);
        assert_eq!(
            WindowFocus::from(WindowId(7)),
            WindowFocus::Window(WindowId(7))
        );
    }
}
