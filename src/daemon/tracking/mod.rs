//! The tracking loop. [TrackerModule] owns the [state::TrackingState] and is the only place events
//! are applied to it, one at a time.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, debug_span, error, Instrument};

use crate::{
    browser::{BrowserEvent, TabQuery},
    utils::clock::Clock,
};

use self::{
    alarm::TRACK_TIME_ALARM,
    state::{Checkpoint, TrackingState},
};

use super::accounting::AccountingEngine;

pub mod alarm;
pub mod state;

/// Collaborators handed to every handler of [TrackingState].
pub struct TrackerContext {
    pub browser: Box<dyn TabQuery>,
    pub accounting: AccountingEngine,
    pub clock: Box<dyn Clock>,
}

impl TrackerContext {
    pub fn new(
        browser: Box<dyn TabQuery>,
        accounting: AccountingEngine,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            browser,
            accounting,
            clock,
        }
    }
}

pub struct TrackerModule {
    events: mpsc::Receiver<BrowserEvent>,
    state: TrackingState,
    context: TrackerContext,
}

impl TrackerModule {
    pub fn new(events: mpsc::Receiver<BrowserEvent>, context: TrackerContext) -> Self {
        Self {
            events,
            state: TrackingState::new(Checkpoint::now(context.clock.as_ref())),
            context,
        }
    }

    async fn dispatch(&mut self, event: BrowserEvent) -> Result<()> {
        let ctx = &self.context;
        match event {
            BrowserEvent::Alarm { name } if *name == *TRACK_TIME_ALARM => {
                self.state.on_timer_tick(ctx).await
            }
            BrowserEvent::Alarm { name } => {
                debug!("Ignoring unknown alarm {name}");
                Ok(())
            }
            BrowserEvent::TabActivated { tab_id } => {
                self.state.on_tab_activated(tab_id, ctx);
                Ok(())
            }
            BrowserEvent::TabUpdated {
                tab_id,
                url,
                active,
            } => {
                self.state
                    .on_tab_updated(tab_id, url.as_deref(), active, ctx)
                    .await
            }
            BrowserEvent::WindowFocusChanged(focus) => {
                self.state.on_window_focus_changed(focus, ctx).await
            }
        }
    }

    /// Executes the tracker event loop. A failing handler is logged and doesn't affect the
    /// following events. The loop ends once every event producer is gone, dropping the
    /// [AccountingEngine] so the ledger writer can finish too.
    pub async fn run(mut self) -> Result<()> {
        while let Some(event) = self.events.recv().await {
            let span = debug_span!("Handling event", ?event);
            if let Err(e) = self.dispatch(event).instrument(span).await {
                error!("Encountered an error during event handling {e:?}");
            }
        }
        debug!("Tracker finished with {:?}", self.state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Result};
    use chrono::TimeDelta;
    use tokio::sync::mpsc;

    use crate::{
        browser::{BrowserEvent, MockTabQuery, Tab, TabId},
        daemon::accounting::{AccountingEngine, Credit},
        utils::clock::testing::ManualClock,
    };

    use super::{alarm::TRACK_TIME_ALARM, TrackerContext, TrackerModule};

    #[tokio::test]
    async fn test_run_survives_failing_handler() -> Result<()> {
        let tab = || -> Result<Option<Tab>> {
            Ok(Some(Tab {
                id: TabId(1),
                url: Some("https://a.com/".into()),
            }))
        };
        let mut responses = vec![tab(), Err(anyhow!("Browser unavailable")), tab()].into_iter();
        let mut browser = MockTabQuery::new();
        browser
            .expect_active_tab()
            .times(3)
            .returning(move |_| responses.next().unwrap_or(Ok(None)));

        let clock = ManualClock::new();
        let (event_sender, events) = mpsc::channel(10);
        let (credit_sender, mut credits) = mpsc::channel(10);
        let mut tracker = TrackerModule::new(
            events,
            TrackerContext::new(
                Box::new(browser),
                AccountingEngine::new(credit_sender),
                Box::new(clock.clone()),
            ),
        );
        let tick = || BrowserEvent::Alarm {
            name: TRACK_TIME_ALARM.into(),
        };

        clock.advance(TimeDelta::seconds(3));
        tracker.dispatch(tick()).await?;
        tracker
            .dispatch(BrowserEvent::Alarm {
                name: "other".into(),
            })
            .await?;

        clock.advance(TimeDelta::seconds(6));
        event_sender.send(tick()).await?;
        event_sender.send(tick()).await?;
        drop(event_sender);
        tracker.run().await?;

        assert_eq!(
            credits.recv().await,
            Some(Credit {
                domain: "a.com".into(),
                seconds: 6.
            })
        );
        // The tracker dropped its engine on exit.
        assert_eq!(credits.recv().await, None);
        Ok(())
    }
}
