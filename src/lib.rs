//! Native messaging host that tallies how much time is spent on each website.
//! The browser extension forwards tab and window events, the daemon samples the active tab on a
//! fixed interval and keeps cumulative seconds per domain in a small json store.
//!

pub mod browser;
pub mod daemon;
pub mod utils;
