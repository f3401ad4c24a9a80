use anyhow::Result;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{
    browser::{domain::extract_domain, TabFilter, TabId, WindowFocus},
    utils::clock::Clock,
};

use super::TrackerContext;

/// Disagreement between wall and monotonic time that is worth reporting.
const WALL_CLOCK_TOLERANCE: TimeDelta = TimeDelta::seconds(1);

/// Point in time an interval starts from. Elapsed time is measured on the monotonic clock, the
/// wall time is only kept to report clock changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Checkpoint {
    pub fn now(clock: &dyn Clock) -> Self {
        Self {
            instant: clock.instant(),
            wall: clock.time(),
        }
    }

    pub fn elapsed_since(&self, earlier: &Checkpoint) -> TimeDelta {
        let elapsed = TimeDelta::from_std(self.instant.saturating_duration_since(earlier.instant))
            .unwrap_or(TimeDelta::MAX);
        let skew = (self.wall - earlier.wall) - elapsed;
        if skew.abs() > WALL_CLOCK_TOLERANCE {
            warn!(
                "Wall clock moved {}s apart from elapsed time, crediting {}s",
                skew.num_seconds(),
                elapsed.num_seconds()
            );
        }
        elapsed
    }
}

/// Which tab is being tracked and since when its time was last accounted.
///
/// Handlers credit the domain of a tab only when the same tab is seen at both ends of an
/// interval. Switching tabs or windows restarts the interval without crediting the part that
/// already elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingState {
    active_tab: Option<TabId>,
    checkpoint: Checkpoint,
}

impl TrackingState {
    pub fn new(now: Checkpoint) -> Self {
        Self {
            active_tab: None,
            checkpoint: now,
        }
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    fn restart(&mut self, tab: Option<TabId>, now: Checkpoint) {
        self.active_tab = tab;
        self.checkpoint = now;
    }

    /// Finalizes the running interval of the active tab in the current window and starts a new
    /// one. A tab seen for the first time is adopted without being credited. A page without a
    /// hostname restarts the interval without crediting anything.
    pub async fn on_timer_tick(&mut self, ctx: &TrackerContext) -> Result<()> {
        let Some(tab) = ctx.browser.active_tab(TabFilter::CurrentWindow).await? else {
            trace!("No active tab");
            return Ok(());
        };
        let Some(url) = tab.url.as_deref() else {
            trace!("Tab {:?} has no url, skipping", tab.id);
            return Ok(());
        };

        let now = Checkpoint::now(ctx.clock.as_ref());
        let previous = self.active_tab;
        let elapsed = now.elapsed_since(&self.checkpoint);
        self.restart(Some(tab.id), now);

        let Some(domain) = extract_domain(url) else {
            trace!("Tab {:?} shows {url} without a domain", tab.id);
            return Ok(());
        };
        if previous == Some(tab.id) {
            ctx.accounting.credit_time(domain, elapsed).await?;
        } else {
            debug!("Started tracking tab {:?} on {domain}", tab.id);
        }
        Ok(())
    }

    pub fn on_tab_activated(&mut self, tab_id: TabId, ctx: &TrackerContext) {
        debug!("Switched to tab {:?}", tab_id);
        self.restart(Some(tab_id), Checkpoint::now(ctx.clock.as_ref()));
    }

    /// Credits the running interval to the domain the active tab navigated to.
    pub async fn on_tab_updated(
        &mut self,
        tab_id: TabId,
        url: Option<&str>,
        active: bool,
        ctx: &TrackerContext,
    ) -> Result<()> {
        let Some(url) = url.filter(|_| active) else {
            return Ok(());
        };

        let now = Checkpoint::now(ctx.clock.as_ref());
        let elapsed = now.elapsed_since(&self.checkpoint);
        self.restart(Some(tab_id), now);

        match extract_domain(url) {
            Some(domain) => ctx.accounting.credit_time(domain, elapsed).await,
            None => {
                trace!("Navigation to {url} has no domain, nothing credited");
                Ok(())
            }
        }
    }

    /// Restarts the interval. Time spent before the focus change isn't credited.
    pub async fn on_window_focus_changed(
        &mut self,
        focus: WindowFocus,
        ctx: &TrackerContext,
    ) -> Result<()> {
        self.checkpoint = Checkpoint::now(ctx.clock.as_ref());
        match focus {
            WindowFocus::None => {
                debug!("Browser lost focus");
                self.active_tab = None;
            }
            WindowFocus::Window(window) => {
                if let Some(tab) = ctx.browser.active_tab(TabFilter::Window(window)).await? {
                    debug!("Window {:?} focused on tab {:?}", window, tab.id);
                    self.active_tab = Some(tab.id);
                }
            }
        }
        Ok(())
    }
}
