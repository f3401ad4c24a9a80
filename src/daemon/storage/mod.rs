//!  Storage is organized through [store::JsonFileStore].
//!  The basic idea is:
//!   - There is a single json document in the application directory.
//!   - The document maps well-known keys to values, and is rewritten as a whole on every write.
//!   - The ledger of seconds per domain is the only value the daemon keeps, under
//!     [ledger::SITE_TIME_KEY].

pub mod ledger;
pub mod store;
