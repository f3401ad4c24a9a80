use std::{path::PathBuf, time::Duration};

use accounting::{AccountingEngine, Credit};
use anyhow::Result;
use processing::{ledger_writer::LedgerWriter, ProcessingModule};
use storage::{ledger::LedgerStore, store::JsonFileStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracking::{alarm::AlarmSource, alarm::TRACK_TIME_ALARM, TrackerContext, TrackerModule};

use crate::{
    browser::{mirror::BrowserMirror, native::NativeHostModule, BrowserEvent, TabQuery},
    utils::clock::{Clock, DefaultClock},
};

pub mod accounting;
pub mod args;
pub mod processing;
pub mod shutdown;
pub mod storage;
pub mod tracking;

pub const DEFAULT_ALARM_PERIOD: Duration = Duration::from_secs(3);

/// Name of the key-value document inside the application directory.
pub const STORAGE_FILE: &str = "storage.json";

/// Represents the starting point for the daemon. Browser messages are read from stdin until the
/// browser disconnects or the process is interrupted.
pub async fn start_daemon(dir: PathBuf, alarm_period: Duration) -> Result<()> {
    let (event_sender, event_receiver) = mpsc::channel::<BrowserEvent>(32);
    let (credit_sender, credit_receiver) = mpsc::channel::<Credit>(32);
    let mirror = BrowserMirror::default();

    let shutdown_token = CancellationToken::new();

    let host = NativeHostModule::new(
        tokio::io::stdin(),
        mirror.clone(),
        event_sender.clone(),
        shutdown_token.clone(),
    );
    let alarm = create_alarm(event_sender, &shutdown_token, alarm_period, DefaultClock);
    let tracker = create_tracker(event_receiver, mirror, credit_sender, DefaultClock);
    let writer = create_ledger_writer(dir.join(STORAGE_FILE), credit_receiver)?;

    info!("Tracking into {:?} every {:?}", dir, alarm_period);

    let (_, host_result, alarm_result, tracker_result, writer_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        host.run(),
        alarm.run(),
        tracker.run(),
        writer.run(),
    );

    if let Err(host_result) = host_result {
        error!("Native host module got an error {:?}", host_result);
    }

    if let Err(alarm_result) = alarm_result {
        error!("Alarm got an error {:?}", alarm_result);
    }

    if let Err(tracker_result) = tracker_result {
        error!("Tracker got an error {:?}", tracker_result);
    }

    if let Err(writer_result) = writer_result {
        error!("Ledger writer got an error {:?}", writer_result);
    }

    Ok(())
}

fn create_alarm(
    sender: mpsc::Sender<BrowserEvent>,
    shutdown_token: &CancellationToken,
    period: Duration,
    clock: impl Clock,
) -> AlarmSource {
    AlarmSource::new(
        TRACK_TIME_ALARM,
        sender,
        shutdown_token.clone(),
        period,
        Box::new(clock),
    )
}

fn create_tracker(
    receiver: mpsc::Receiver<BrowserEvent>,
    browser: impl TabQuery + 'static,
    credit_sender: mpsc::Sender<Credit>,
    clock: impl Clock,
) -> TrackerModule {
    TrackerModule::new(
        receiver,
        TrackerContext::new(
            Box::new(browser),
            AccountingEngine::new(credit_sender),
            Box::new(clock),
        ),
    )
}

fn create_ledger_writer(
    storage_path: PathBuf,
    receiver: mpsc::Receiver<Credit>,
) -> Result<ProcessingModule<LedgerWriter<LedgerStore<JsonFileStore>>>, anyhow::Error> {
    let store = JsonFileStore::new(storage_path)?;
    let writer = LedgerWriter::new(LedgerStore::new(store));
    Ok(ProcessingModule::new(receiver, writer))
}
