//! Push Builder - keeps local clones of watched repositories in sync and
//! rebuilds them when a signed push webhook arrives.
//!
//! A push is classified ([`webhooks`]), checked against the watchlist
//! ([`persistence`]), authenticated, synced with pull-or-clone ([`git`]) and
//! built ([`build`]); [`pipeline`] ties the steps together and [`server`]
//! exposes them over HTTP.

pub mod build;
pub mod config;
pub mod git;
pub mod persistence;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
