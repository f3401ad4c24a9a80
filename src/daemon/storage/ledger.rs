use std::{collections::BTreeMap, future::Future, ops::Deref, sync::Arc};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::store::KeyValueStore;

/// Key under which the whole ledger is stored.
pub const SITE_TIME_KEY: &str = "siteTime";

/// Cumulative seconds spent per domain. Entries only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteTimeLedger(BTreeMap<Arc<str>, f64>);

impl SiteTimeLedger {
    /// Adds `seconds` to `domain`, creating the entry if needed. Negative values are ignored.
    pub fn credit(&mut self, domain: &Arc<str>, seconds: f64) {
        let seconds = seconds.max(0.);
        *self.0.entry(domain.clone()).or_insert(0.) += seconds;
    }

    pub fn seconds_for(&self, domain: &str) -> Option<f64> {
        self.0.get(domain).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<D: Into<Arc<str>>> FromIterator<(D, f64)> for SiteTimeLedger {
    fn from_iter<T: IntoIterator<Item = (D, f64)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(domain, seconds)| (domain.into(), seconds))
                .collect(),
        )
    }
}

/// Interface for abstracting durable storage of the ledger.
pub trait LedgerStorage {
    /// Returns the current ledger, or an empty one if nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<SiteTimeLedger>>;

    /// Replaces the stored ledger as a whole.
    fn save(&self, ledger: &SiteTimeLedger) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> LedgerStorage for T
where
    T::Target: LedgerStorage,
{
    fn load(&self) -> impl Future<Output = Result<SiteTimeLedger>> {
        self.deref().load()
    }

    fn save(&self, ledger: &SiteTimeLedger) -> impl Future<Output = Result<()>> {
        self.deref().save(ledger)
    }
}

/// Keeps the ledger under [SITE_TIME_KEY] of a [KeyValueStore].
pub struct LedgerStore<S> {
    store: S,
}

impl<S: KeyValueStore> LedgerStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: KeyValueStore> LedgerStorage for LedgerStore<S> {
    async fn load(&self) -> Result<SiteTimeLedger> {
        self.store
            .get(SITE_TIME_KEY, SiteTimeLedger::default())
            .await
    }

    async fn save(&self, ledger: &SiteTimeLedger) -> Result<()> {
        self.store.set(SITE_TIME_KEY, ledger).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use tempfile::tempdir;

    use crate::daemon::storage::store::JsonFileStore;

    use super::{LedgerStorage, LedgerStore, SiteTimeLedger};

    #[test]
    fn test_credit_accumulates() {
        let mut ledger = SiteTimeLedger::default();
        let domain: Arc<str> = "a.com".into();
        ledger.credit(&domain, 3.);
        ledger.credit(&domain, 1.5);
        ledger.credit(&"b.com".into(), 0.);

        assert_eq!(ledger.seconds_for("a.com"), Some(4.5));
        assert_eq!(ledger.seconds_for("b.com"), Some(0.));
        assert_eq!(ledger.seconds_for("c.com"), None);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_credit_ignores_negative() {
        let mut ledger = SiteTimeLedger::from_iter([("a.com", 2.)]);
        ledger.credit(&"a.com".into(), -10.);
        assert_eq!(ledger.seconds_for("a.com"), Some(2.));
    }

    #[tokio::test]
    async fn test_ledger_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let storage = LedgerStore::new(JsonFileStore::new(dir.path().join("storage.json"))?);

        assert!(storage.load().await?.is_empty());

        let ledger = SiteTimeLedger::from_iter([
            ("sub.example.com", 12.25),
            ("a.com", 3.),
            ("newtab", 0.),
        ]);
        storage.save(&ledger).await?;

        let first = storage.load().await?;
        let second = storage.load().await?;
        assert_eq!(first, ledger);
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("storage.json");
        let storage = LedgerStore::new(JsonFileStore::new(path.clone())?);

        storage
            .save(&SiteTimeLedger::from_iter([("a.com", 1.5), ("b.com", 3.)]))
            .await?;

        assert_eq!(
            std::fs::read_to_string(path)?,
            r#"{"siteTime":{"a.com":1.5,"b.com":3.0}}"#
        );
        Ok(())
    }
}
