use anyhow::Result;
use module::CreditProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info, trace};

use super::accounting::Credit;

pub mod ledger_writer;
pub mod module;

/// What happened to the credits the writer received.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct CreditTally {
    pub applied: usize,
    pub dropped: usize,
    pub dropped_seconds: f64,
}

/// Single writer of the ledger. Credits are received in order and each one is fully applied
/// before the next is taken from the queue.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<Credit>,
    processor: Processor,
}

impl<P: CreditProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<Credit>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    /// Runs until every [super::accounting::AccountingEngine] is dropped and the queue is drained.
    /// A credit that can't be applied is lost, the following ones are still applied.
    pub async fn run(mut self) -> Result<CreditTally> {
        let mut tally = CreditTally::default();
        while let Some(credit) = self.receiver.recv().await {
            match self.processor.apply_credit(&credit).await {
                Ok(()) => {
                    tally.applied += 1;
                    trace!("Credited {}s to {}", credit.seconds, credit.domain);
                }
                Err(e) => {
                    tally.dropped += 1;
                    tally.dropped_seconds += credit.seconds;
                    error!(
                        "Lost {}s of {} after the ledger update failed: {e:?}",
                        credit.seconds, credit.domain
                    );
                }
            }
        }
        self.receiver.close();

        info!(
            "Ledger writer finished, {} credits applied, {} dropped ({}s lost)",
            tally.applied, tally.dropped, tally.dropped_seconds
        );
        Ok(tally)
    }
}
