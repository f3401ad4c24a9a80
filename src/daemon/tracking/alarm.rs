use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::{browser::BrowserEvent, utils::clock::Clock};

/// Name of the alarm that requests a time-accounting tick.
pub const TRACK_TIME_ALARM: &str = "trackTime";

/// Named periodic trigger. Fires every `period`, the first time one period after [Self::run] is
/// called.
pub struct AlarmSource {
    name: Arc<str>,
    next: mpsc::Sender<BrowserEvent>,
    shutdown: CancellationToken,
    period: Duration,
    time_provider: Box<dyn Clock>,
}

impl AlarmSource {
    pub fn new(
        name: impl Into<Arc<str>>,
        next: mpsc::Sender<BrowserEvent>,
        shutdown: CancellationToken,
        period: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            next,
            shutdown,
            period,
            time_provider,
        }
    }

    /// Executes the alarm loop.
    pub async fn run(self) -> Result<()> {
        let mut fire_at = self.time_provider.instant();
        loop {
            fire_at += self.period;

            tokio::select! {
                // Cancelation drops the sender, which lets the tracker finish once the other
                // producers are gone too.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(fire_at) => ()
            }

            trace!("Alarm {} fired", self.name);
            self.next
                .send(BrowserEvent::Alarm {
                    name: self.name.clone(),
                })
                .await
                .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{browser::BrowserEvent, utils::clock::DefaultClock};

    use super::{AlarmSource, TRACK_TIME_ALARM};

    #[tokio::test(start_paused = true)]
    async fn test_alarm_fires_every_period() -> Result<()> {
        let (sender, mut receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();
        let alarm = AlarmSource::new(
            TRACK_TIME_ALARM,
            sender,
            shutdown.clone(),
            Duration::from_secs(3),
            Box::new(DefaultClock),
        );

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                shutdown.cancel()
            },
            alarm.run(),
        );
        result?;

        let mut fired = vec![];
        while let Some(event) = receiver.recv().await {
            fired.push(event);
        }
        assert_eq!(
            fired,
            vec![
                BrowserEvent::Alarm {
                    name: TRACK_TIME_ALARM.into()
                };
                3
            ]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_alarm_stops_when_tracker_is_gone() {
        let (sender, receiver) = mpsc::channel(1);
        drop(receiver);
        let alarm = AlarmSource::new(
            TRACK_TIME_ALARM,
            sender,
            CancellationToken::new(),
            Duration::from_secs(3),
            Box::new(DefaultClock),
        );

        assert!(alarm.run().await.is_err());
    }
}
