use std::future::Future;

use anyhow::Result;

use crate::daemon::accounting::Credit;

/// Consumer of credits. [super::ProcessingModule] awaits each call before taking the next credit,
/// which is what keeps ledger updates from interleaving.
pub trait CreditProcessor {
    fn apply_credit(&mut self, credit: &Credit) -> impl Future<Output = Result<()>>;
}
