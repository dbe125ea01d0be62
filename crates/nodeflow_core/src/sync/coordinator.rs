//! Pending-change replay against the remote authority.
//!
//! # Responsibility
//! - Track connectivity and the user-visible sync status.
//! - Drain the pending-change log, push only the newest payload, and clear
//!   every drained entry once the push succeeds.
//! - When the newest row no longer decodes, push the saved local record
//!   instead of an older entry.
//!
//! # Invariants
//! - At most one drain is in flight; a trigger during a drain is coalesced
//!   into a single follow-up run.
//! - A failed push leaves the pending log untouched.
//! - Entries enqueued after `begin_drain` are not cleared by that drain.

use crate::model::snapshot::WorkspaceSnapshot;
use crate::repo::workspace_repo::{PendingChangeId, WorkspaceRepository};
use crate::sync::remote::{RemoteResult, RemoteStore};
use log::{info, warn};

/// User-visible replication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing attempted yet.
    #[default]
    Idle,
    Saving,
    Saved,
    /// Offline, no remote link, or the last push failed.
    Error,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Saving => "saving",
            Self::Saved => "saved",
            Self::Error => "error",
        }
    }
}

/// Result of one drain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Connectivity signal reports offline.
    Offline,
    /// Remote link is missing or unreachable.
    RemoteUnavailable,
    /// Pending log was empty.
    NothingPending,
    /// Newest payload pushed; `cleared` entries removed from the log.
    Pushed { cleared: usize },
    /// Push failed; the log is unchanged.
    PushFailed,
    /// Pending log could not be read.
    StoreFailed,
    /// Another drain is in flight; a rerun was requested instead.
    Coalesced,
}

/// Work captured by `begin_drain`: the entries to clear and the payload to push.
#[derive(Debug, Clone)]
pub struct DrainJob {
    entry_ids: Vec<PendingChangeId>,
    latest: WorkspaceSnapshot,
}

impl DrainJob {
    pub fn entry_ids(&self) -> &[PendingChangeId] {
        &self.entry_ids
    }

    /// Payload of the newest drained entry, or the saved local record.
    pub fn payload(&self) -> &WorkspaceSnapshot {
        &self.latest
    }
}

/// First phase of a drain.
#[derive(Debug)]
pub enum DrainStart {
    Ready(DrainJob),
    Finished(SyncOutcome),
}

/// Replication state machine.
#[derive(Debug, Clone)]
pub struct SyncCoordinator {
    workspace_key: String,
    online: bool,
    status: SyncStatus,
    in_flight: bool,
    rerun_requested: bool,
}

impl SyncCoordinator {
    pub fn new(workspace_key: impl Into<String>) -> Self {
        Self {
            workspace_key: workspace_key.into(),
            online: true,
            status: SyncStatus::Idle,
            in_flight: false,
            rerun_requested: false,
        }
    }

    pub fn workspace_key(&self) -> &str {
        &self.workspace_key
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Records a connectivity change. Returns `true` when the link came back.
    pub fn set_online(&mut self, online: bool) -> bool {
        let restored = online && !self.online;
        self.online = online;
        if !online {
            self.status = SyncStatus::Error;
        }
        info!(
            "event=connectivity module=sync status=ok online={online} restored={restored}"
        );
        restored
    }

    /// Marks a local persist in progress.
    pub fn mark_saving(&mut self) {
        self.status = SyncStatus::Saving;
    }

    /// Forces a status, used once at boot.
    pub fn set_status(&mut self, status: SyncStatus) {
        self.status = status;
    }

    /// Phase one: checks the link, then captures the pending log.
    ///
    /// While a drain is in flight this only requests a rerun.
    pub fn begin_drain<R, S>(&mut self, repo: &R, remote: &S) -> DrainStart
    where
        R: WorkspaceRepository + ?Sized,
        S: RemoteStore + ?Sized,
    {
        if self.in_flight {
            self.rerun_requested = true;
            return DrainStart::Finished(SyncOutcome::Coalesced);
        }
        if !self.online {
            self.status = SyncStatus::Error;
            return DrainStart::Finished(SyncOutcome::Offline);
        }
        if !remote.is_available() {
            self.status = SyncStatus::Error;
            return DrainStart::Finished(SyncOutcome::RemoteUnavailable);
        }

        let drain = match repo.drain_pending_changes() {
            Ok(drain) => drain,
            Err(err) => {
                warn!("event=sync_drain module=sync status=error error_code=store_read error={err}");
                self.status = SyncStatus::Error;
                return DrainStart::Finished(SyncOutcome::StoreFailed);
            }
        };
        if drain.is_empty() {
            self.status = SyncStatus::Saved;
            return DrainStart::Finished(SyncOutcome::NothingPending);
        }

        let entry_ids = drain.all_ids();
        let latest = match drain.latest_valid() {
            Some(entry) => Some(entry.payload.clone()),
            None => self.saved_record(repo).or_else(|| {
                drain.entries.last().map(|entry| entry.payload.clone())
            }),
        };
        let Some(latest) = latest else {
            // Only undecodable rows and nothing saved locally: nothing to push.
            let cleared = self.clear_entries(repo, &entry_ids);
            self.status = SyncStatus::Saved;
            warn!(
                "event=sync_drain module=sync status=skipped reason=corrupt_only cleared={cleared}"
            );
            return DrainStart::Finished(SyncOutcome::NothingPending);
        };

        self.in_flight = true;
        self.status = SyncStatus::Saving;
        DrainStart::Ready(DrainJob { entry_ids, latest })
    }

    fn saved_record<R>(&self, repo: &R) -> Option<WorkspaceSnapshot>
    where
        R: WorkspaceRepository + ?Sized,
    {
        match repo.load_snapshot() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("event=sync_drain module=sync status=error error_code=store_load error={err}");
                None
            }
        }
    }

    fn clear_entries<R>(&self, repo: &R, ids: &[PendingChangeId]) -> usize
    where
        R: WorkspaceRepository + ?Sized,
    {
        let mut cleared = 0;
        for id in ids {
            match repo.clear_pending_change(*id) {
                Ok(()) => cleared += 1,
                Err(err) => warn!(
                    "event=sync_drain module=sync status=error error_code=store_clear entry_id={id} error={err}"
                ),
            }
        }
        cleared
    }

    /// Phase two: applies the push result to the log and status.
    pub fn complete_drain<R>(
        &mut self,
        repo: &R,
        job: DrainJob,
        pushed: RemoteResult<i64>,
    ) -> SyncOutcome
    where
        R: WorkspaceRepository + ?Sized,
    {
        self.in_flight = false;
        match pushed {
            Ok(updated_at) => {
                let cleared = self.clear_entries(repo, &job.entry_ids);
                self.status = SyncStatus::Saved;
                info!(
                    "event=sync_drain module=sync status=ok drained={} cleared={cleared} updated_at={updated_at}",
                    job.entry_ids.len()
                );
                SyncOutcome::Pushed { cleared }
            }
            Err(err) => {
                self.status = SyncStatus::Error;
                warn!(
                    "event=sync_drain module=sync status=error error_code={} pending={}",
                    err.code(),
                    job.entry_ids.len()
                );
                SyncOutcome::PushFailed
            }
        }
    }

    /// Returns and clears the coalesced rerun request.
    pub fn take_rerun(&mut self) -> bool {
        std::mem::take(&mut self.rerun_requested)
    }

    /// Runs a full drain synchronously, then any coalesced rerun.
    pub fn replay<R, S>(&mut self, repo: &R, remote: &S) -> SyncOutcome
    where
        R: WorkspaceRepository + ?Sized,
        S: RemoteStore + ?Sized,
    {
        loop {
            let outcome = match self.begin_drain(repo, remote) {
                DrainStart::Finished(outcome) => outcome,
                DrainStart::Ready(job) => {
                    let pushed = remote.upsert(&self.workspace_key, job.payload());
                    self.complete_drain(repo, job, pushed)
                }
            };
            if outcome == SyncOutcome::Coalesced || !self.take_rerun() {
                return outcome;
            }
        }
    }
}
