//! Reconciliation between the local replica and the remote store.
//!
//! Push makes the remote match local existence, pull makes the local replica
//! match remote content and existence. [`SyncEngine`] is the only way in: it
//! runs both in that order behind the connectivity gate and a re-entrancy
//! guard.

mod connectivity;
mod engine;
mod pull;
mod push;
mod report;

pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use engine::{SyncEngine, SyncOutcome, SyncSummary, SyncTrigger};
pub use report::{EntityCounts, PushBacklog, SyncDirection, SyncReport};
