use anyhow::Result;
use tracing::{debug, warn};

use crate::daemon::{accounting::Credit, storage::ledger::LedgerStorage};

use super::module::CreditProcessor;

/// Applies credits to the stored ledger with a read-modify-write. A failed update is retried once
/// before the credit is given up on.
pub struct LedgerWriter<S: LedgerStorage> {
    storage: S,
}

impl<S: LedgerStorage> LedgerWriter<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    async fn apply(&self, credit: &Credit) -> Result<()> {
        let mut ledger = self.storage.load().await?;
        ledger.credit(&credit.domain, credit.seconds);
        self.storage.save(&ledger).await?;
        debug!(
            "{} is now at {:?}s",
            credit.domain,
            ledger.seconds_for(&credit.domain)
        );
        Ok(())
    }
}

impl<S: LedgerStorage> CreditProcessor for LedgerWriter<S> {
    async fn apply_credit(&mut self, credit: &Credit) -> Result<()> {
        match self.apply(credit).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Failed to update ledger for {}, retrying once: {e:?}", credit.domain);
                self.apply(credit).await
            }
        }
    }
}
