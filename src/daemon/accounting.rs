use std::sync::Arc;

use anyhow::Result;
use chrono::TimeDelta;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::utils::time::elapsed_seconds;

/// Time to be added to a domain in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Credit {
    pub domain: Arc<str>,
    pub seconds: f64,
}

impl Credit {
    /// Creates a credit for the elapsed time. Elapsed time below zero is clamped to zero.
    pub fn from_elapsed(domain: Arc<str>, elapsed: TimeDelta) -> Self {
        let seconds = elapsed_seconds(elapsed);
        if seconds < 0. {
            warn!("Negative elapsed time of {seconds}s, crediting nothing to {domain}");
        }
        Self {
            domain,
            seconds: seconds.max(0.),
        }
    }
}

/// Front of the ledger writer. Credits are queued for [crate::daemon::processing::ProcessingModule],
/// which applies them one at a time, so two credits never interleave their read-modify-write.
#[derive(Clone)]
pub struct AccountingEngine {
    next: mpsc::Sender<Credit>,
}

impl AccountingEngine {
    pub fn new(next: mpsc::Sender<Credit>) -> Self {
        Self { next }
    }

    pub async fn credit_time(&self, domain: Arc<str>, elapsed: TimeDelta) -> Result<()> {
        let credit = Credit::from_elapsed(domain, elapsed);
        debug!("Queueing {:?}", credit);
        self.next
            .send(credit)
            .await
            .inspect_err(|e| error!("Ledger writer is gone, dropping {:?}", e.0))?;
        Ok(())
    }
}
