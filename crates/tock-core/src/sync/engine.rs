use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use super::connectivity::Connectivity;
use super::pull::pull;
use super::push::push;
use super::report::{PushBacklog, SyncReport};
use crate::remote::RemoteEntityService;
use crate::services::LocalStore;
use crate::util::now_ms;
use crate::Result;

/// Why a sync was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    AppStart,
    VisibilityRegained,
    BackOnline,
    LocalMutation,
    Manual,
}

impl SyncTrigger {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AppStart => "app-start",
            Self::VisibilityRegained => "visibility-regained",
            Self::BackOnline => "back-online",
            Self::LocalMutation => "local-mutation",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reports of the last push/pull round of a completed sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub push: SyncReport,
    pub pull: SyncReport,
    /// Rounds run, more than one when triggers arrived mid-sync
    pub passes: u32,
    pub finished_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was attempted because the gate reported offline
    Offline,
    /// Another pass holds the engine; it runs one more round before releasing
    Coalesced,
    Completed(SyncSummary),
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs Push then Pull behind the connectivity gate.
///
/// At most one pass (full sync, push-only or pull-only) runs at a time.
/// Sync triggers arriving while one is in flight are collapsed into a single
/// follow-up round, run before the engine is released.
pub struct SyncEngine<R, C> {
    store: LocalStore,
    remote: R,
    connectivity: C,
    in_flight: AtomicBool,
    pending: AtomicBool,
}

impl<R: RemoteEntityService, C: Connectivity> SyncEngine<R, C> {
    pub const fn new(store: LocalStore, remote: R, connectivity: C) -> Self {
        Self {
            store,
            remote,
            connectivity,
            in_flight: AtomicBool::new(false),
            pending: AtomicBool::new(false),
        }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn connectivity(&self) -> &C {
        &self.connectivity
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Push local changes, then pull the remote state.
    ///
    /// Returns `Err` only for local store failures; remote trouble is
    /// reported inside the summary.
    pub async fn sync(&self, trigger: SyncTrigger) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            debug!(%trigger, "offline, sync skipped");
            return Ok(SyncOutcome::Offline);
        }
        // Raised before trying the guard so a holder releasing concurrently
        // still sees it.
        self.pending.store(true, Ordering::SeqCst);
        let Some(in_flight) = self.try_acquire() else {
            debug!(%trigger, "sync in flight, queued follow-up round");
            return Ok(SyncOutcome::Coalesced);
        };

        info!(%trigger, "sync started");
        let mut passes = 0;
        let Some((push_report, pull_report)) = self.drain(in_flight, &mut passes).await? else {
            debug!(%trigger, "went offline before the first round");
            return Ok(SyncOutcome::Offline);
        };

        let summary = SyncSummary {
            push: push_report,
            pull: pull_report,
            passes,
            finished_at: now_ms(),
        };
        info!(
            %trigger,
            passes,
            push = %summary.push,
            pull = %summary.pull,
            "sync finished"
        );
        Ok(SyncOutcome::Completed(summary))
    }

    /// Gated pull only; `None` when offline or another pass is in flight
    pub async fn pull(&self) -> Result<Option<SyncReport>> {
        if !self.connectivity.is_online() {
            return Ok(None);
        }
        let Some(in_flight) = self.try_acquire() else {
            debug!("sync in flight, pull skipped");
            return Ok(None);
        };
        let report = pull(&self.store, &self.remote, &PushBacklog::default()).await?;
        self.drain(in_flight, &mut 0).await?;
        Ok(Some(report))
    }

    /// Gated push only; `None` when offline or another pass is in flight
    pub async fn push(&self) -> Result<Option<SyncReport>> {
        if !self.connectivity.is_online() {
            return Ok(None);
        }
        let Some(in_flight) = self.try_acquire() else {
            debug!("sync in flight, push skipped");
            return Ok(None);
        };
        let report = push(&self.store, &self.remote).await?;
        self.drain(in_flight, &mut 0).await?;
        Ok(Some(report))
    }

    fn try_acquire(&self) -> Option<InFlight<'_>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlight(&self.in_flight))
        }
    }

    /// Run rounds while triggers are pending, then release the engine.
    ///
    /// A trigger that raced the release leaves `pending` set; the engine is
    /// re-taken for it unless another caller got there first.
    async fn drain(
        &self,
        in_flight: InFlight<'_>,
        passes: &mut u32,
    ) -> Result<Option<(SyncReport, SyncReport)>> {
        let mut last = None;
        let mut held = Some(in_flight);
        loop {
            while self.connectivity.is_online() && self.pending.swap(false, Ordering::SeqCst) {
                *passes += 1;
                if *passes > 1 {
                    debug!(passes = *passes, "triggers arrived during sync, running again");
                }
                last = Some(self.round().await?);
            }
            drop(held.take());
            if !self.pending.load(Ordering::SeqCst) || !self.connectivity.is_online() {
                return Ok(last);
            }
            match self.try_acquire() {
                Some(in_flight) => held = Some(in_flight),
                None => return Ok(last),
            }
        }
    }

    async fn round(&self) -> Result<(SyncReport, SyncReport)> {
        let push_report = push(&self.store, &self.remote).await?;
        let pull_report = pull(&self.store, &self.remote, &push_report.backlog).await?;
        Ok((push_report, pull_report))
    }
}
