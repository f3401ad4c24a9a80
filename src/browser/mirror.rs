use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::trace;

use super::{native::NativeMessage, Tab, TabFilter, TabId, TabQuery, WindowFocus, WindowId};

#[derive(Debug, Default)]
struct MirrorState {
    /// Last window that had focus. Stays set while no window is focused, the same way the
    /// browser keeps a "current" window around.
    current_window: Option<WindowId>,
    active_tabs: HashMap<WindowId, TabId>,
    urls: HashMap<TabId, String>,
}

/// Copy of the browser state assembled from [NativeMessage]s. Cloning is cheap and every clone
/// observes the same state.
#[derive(Debug, Clone, Default)]
pub struct BrowserMirror {
    inner: Arc<Mutex<MirrorState>>,
}

impl BrowserMirror {
    fn lock(&self) -> Result<MutexGuard<'_, MirrorState>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Browser mirror lock was poisoned"))
    }

    pub fn apply(&self, message: &NativeMessage) -> Result<()> {
        let mut state = self.lock()?;
        match message {
            NativeMessage::Snapshot {
                focused_window_id,
                tabs,
            } => {
                *state = MirrorState::default();
                for tab in tabs {
                    if tab.active {
                        state.active_tabs.insert(tab.window_id, tab.tab_id);
                    }
                    if let Some(url) = &tab.url {
                        state.urls.insert(tab.tab_id, url.clone());
                    }
                }
                state.current_window = match WindowFocus::from(*focused_window_id) {
                    WindowFocus::Window(window_id) => Some(window_id),
                    WindowFocus::None => tabs.iter().find(|tab| tab.active).map(|tab| tab.window_id),
                };
            }
            NativeMessage::TabActivated {
                tab_id,
                window_id,
                url,
            } => {
                state.active_tabs.insert(*window_id, *tab_id);
                if state.current_window.is_none() {
                    state.current_window = Some(*window_id);
                }
                if let Some(url) = url {
                    state.urls.insert(*tab_id, url.clone());
                }
            }
            NativeMessage::TabUpdated {
                tab_id,
                window_id,
                url,
                active,
            } => {
                if *active {
                    state.active_tabs.insert(*window_id, *tab_id);
                }
                if let Some(url) = url {
                    state.urls.insert(*tab_id, url.clone());
                }
            }
            NativeMessage::TabRemoved { tab_id } => {
                state.urls.remove(tab_id);
                state.active_tabs.retain(|_, active| *active != *tab_id);
            }
            NativeMessage::WindowFocusChanged { window_id } => {
                if let WindowFocus::Window(window_id) = WindowFocus::from(*window_id) {
                    state.current_window = Some(window_id);
                }
            }
        }
        trace!("Mirror state {:?}", *state);
        Ok(())
    }
}

#[async_trait]
impl TabQuery for BrowserMirror {
    async fn active_tab(&self, filter: TabFilter) -> Result<Option<Tab>> {
        let state = self.lock()?;
        let window = match filter {
            TabFilter::CurrentWindow => state.current_window,
            TabFilter::Window(window) => Some(window),
        };

        Ok(window
            .and_then(|window| state.active_tabs.get(&window))
            .map(|id| Tab {
                id: *id,
                url: state.urls.get(id).cloned(),
            }))
    }
}
