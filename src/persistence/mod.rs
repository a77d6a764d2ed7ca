//! Persistence for the watchlist.
//!
//! # File Layout
//!
//! ```text
//! <base_dir>/
//!   watch_conf.json        # the watchlist (JSON array)
//!   watch_conf.json.lock   # advisory lock for rewrites
//!   watch_conf.json.tmp    # transient, only during an atomic save
//! ```

pub mod fsync;
pub mod lock;
pub mod watchlist;

pub use fsync::{fsync_dir, fsync_file};
pub use lock::WatchlistLock;
pub use watchlist::{TrackedRepo, Watchlist, WatchlistError, WatchlistStore};
