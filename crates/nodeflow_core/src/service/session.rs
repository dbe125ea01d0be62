//! Session facade tying the workspace to persistence and sync.
//!
//! # Responsibility
//! - Own the in-memory workspace, the local store, the remote, the sync
//!   coordinator and the timers.
//! - Reconcile local, legacy and remote state at startup.
//! - Turn `mark_dirty`/`tick` calls into debounced persists and sync drains.
//!
//! # Invariants
//! - No method returns a fatal error for storage or remote failures; those
//!   are logged and reflected in `sync_status()`. The in-memory workspace
//!   stays authoritative.
//! - Each persist captures one snapshot; mutations after it land in the next.
//! - Local data wins over remote data at boot; no merge is attempted.

use crate::config::EngineConfig;
use crate::graph::view::Point;
use crate::graph::workspace::Workspace;
use crate::layout::layout_page;
use crate::model::snapshot::WorkspaceSnapshot;
use crate::repo::legacy::LegacySource;
use crate::repo::workspace_repo::WorkspaceRepository;
use crate::sync::coordinator::{SyncCoordinator, SyncOutcome, SyncStatus};
use crate::sync::remote::RemoteStore;
use crate::sync::schedule::{PersistScheduler, ScheduledAction};
use log::{info, warn};
use std::time::Instant;

/// Where the booted workspace came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    Local,
    Legacy,
    Remote,
    /// Nothing usable anywhere; a default page was created.
    Fresh,
}

impl BootSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Legacy => "legacy",
            Self::Remote => "remote",
            Self::Fresh => "fresh",
        }
    }
}

/// What one `tick` did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Set when a debounced persist ran (it includes a sync drain).
    pub persisted: Option<SyncOutcome>,
    /// Set when the periodic sync ran on its own.
    pub synced: Option<SyncOutcome>,
}

pub struct Session<R, S>
where
    R: WorkspaceRepository,
    S: RemoteStore,
{
    config: EngineConfig,
    workspace: Workspace,
    repo: R,
    remote: S,
    coordinator: SyncCoordinator,
    scheduler: PersistScheduler,
    last_history_at: Option<Instant>,
    layout_center: Point,
}

impl<R, S> Session<R, S>
where
    R: WorkspaceRepository,
    S: RemoteStore,
{
    /// Creates an unbooted session holding an empty workspace.
    pub fn new(config: EngineConfig, repo: R, remote: S, now: Instant) -> Self {
        let scheduler = PersistScheduler::new(config.debounce(), config.sync_interval(), now);
        let coordinator = SyncCoordinator::new(config.workspace_key.clone());
        Self {
            config,
            workspace: Workspace::new(),
            repo,
            remote,
            coordinator,
            scheduler,
            last_history_at: None,
            layout_center: Point::ORIGIN,
        }
    }

    /// Sets the point single-root pages are centered on.
    pub fn with_layout_center(mut self, center: Point) -> Self {
        self.layout_center = center;
        self
    }

    /// Loads the workspace and writes it back to the local store.
    ///
    /// Priority: local store, then `legacy`, then remote. Remote data is only
    /// adopted when neither local source has pages. Boot never pushes: the
    /// remote record is left as found until the first persist.
    pub fn boot(&mut self, legacy: Option<&dyn LegacySource>) -> BootSource {
        let mut candidate = match self.repo.load_snapshot() {
            Ok(Some(snapshot)) if snapshot.has_pages() => Some((snapshot, BootSource::Local)),
            Ok(_) => None,
            Err(err) => {
                warn!("event=boot module=session status=error error_code=local_load error={err}");
                None
            }
        };

        if candidate.is_none() {
            candidate = legacy
                .and_then(|source| source.take())
                .filter(WorkspaceSnapshot::has_pages)
                .map(|snapshot| (snapshot, BootSource::Legacy));
        }

        if candidate.is_none() {
            candidate = self.fetch_remote_snapshot();
        }

        let source = match candidate {
            Some((snapshot, source)) => {
                self.workspace = Workspace::from_snapshot(snapshot);
                source
            }
            None => {
                self.workspace = Workspace::with_default_page();
                BootSource::Fresh
            }
        };
        info!(
            "event=boot module=session status=ok source={} pages={}",
            source.as_str(),
            self.workspace.pages().len()
        );

        self.relayout();
        self.coordinator.set_status(SyncStatus::Saved);
        if let Err(err) = self.repo.save_snapshot(&self.workspace.snapshot()) {
            warn!("event=boot module=session status=error error_code=initial_save error={err}");
        }
        source
    }

    fn fetch_remote_snapshot(&self) -> Option<(WorkspaceSnapshot, BootSource)> {
        if !self.coordinator.is_online() || !self.remote.is_available() {
            return None;
        }
        match self.remote.fetch(&self.config.workspace_key) {
            Ok(Some(record)) if record.data.has_pages() => Some((record.data, BootSource::Remote)),
            Ok(_) => None,
            Err(err) => {
                warn!(
                    "event=boot module=session status=error error_code=remote_{} error={err}",
                    err.code()
                );
                None
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Mutable workspace access. Callers follow edits with `relayout` and
    /// `mark_dirty`.
    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn remote(&self) -> &S {
        &self.remote
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.coordinator.status()
    }

    pub fn is_online(&self) -> bool {
        self.coordinator.is_online()
    }

    /// Whether a debounced persist is waiting.
    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_dirty()
    }

    /// Earliest instant at which `tick` has work.
    pub fn next_deadline(&self) -> Instant {
        self.scheduler.next_deadline()
    }

    /// Recomputes coordinates of the active page. Returns moved node count.
    pub fn relayout(&mut self) -> usize {
        let center = self.layout_center;
        match self.workspace.active_page_mut() {
            Some(page) => layout_page(page, &self.config.layout, center),
            None => 0,
        }
    }

    /// Schedules persistence after a mutation of persisted fields.
    ///
    /// `immediate` persists right away and returns the sync outcome.
    pub fn mark_dirty(&mut self, immediate: bool, now: Instant) -> Option<SyncOutcome> {
        if self.scheduler.mark_dirty(immediate, now) {
            return Some(self.persist_now(now));
        }
        None
    }

    /// Runs whatever timers are due at `now`.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        for action in self.scheduler.poll(now) {
            match action {
                ScheduledAction::Persist => report.persisted = Some(self.persist_now(now)),
                ScheduledAction::Sync if report.persisted.is_none() => {
                    report.synced = Some(self.sync_now());
                }
                ScheduledAction::Sync => {}
            }
        }
        report
    }

    /// Saves the current snapshot, enqueues it for sync, records history if
    /// the throttle allows, then drains the pending log.
    pub fn persist_now(&mut self, now: Instant) -> SyncOutcome {
        self.scheduler.cancel_persist();
        let snapshot = self.workspace.snapshot();

        if let Err(err) = self.repo.save_snapshot(&snapshot) {
            warn!("event=persist module=session status=error error_code=save error={err}");
        }
        if let Err(err) = self.repo.enqueue_pending_change(&snapshot) {
            warn!("event=persist module=session status=error error_code=enqueue error={err}");
        }
        if self.history_due(now) {
            match self.repo.push_history_snapshot(&snapshot) {
                Ok(_) => self.last_history_at = Some(now),
                Err(err) => {
                    warn!("event=persist module=session status=error error_code=history error={err}")
                }
            }
        }

        self.coordinator.mark_saving();
        self.coordinator.replay(&self.repo, &self.remote)
    }

    fn history_due(&self, now: Instant) -> bool {
        self.last_history_at.map_or(true, |last| {
            now.saturating_duration_since(last) >= self.config.history_throttle()
        })
    }

    /// Drains the pending log without persisting first.
    pub fn sync_now(&mut self) -> SyncOutcome {
        self.coordinator.replay(&self.repo, &self.remote)
    }

    /// Applies a connectivity signal. Restoring the link triggers a drain.
    pub fn set_online(&mut self, online: bool) -> Option<SyncOutcome> {
        if self.coordinator.set_online(online) {
            return Some(self.sync_now());
        }
        None
    }

    /// Serializes the full workspace snapshot.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.workspace.snapshot())
    }

    /// Replaces the workspace with an imported snapshot and persists it.
    ///
    /// An import without pages yields a default page.
    pub fn import_json(&mut self, text: &str, now: Instant) -> Result<SyncOutcome, serde_json::Error> {
        let snapshot: WorkspaceSnapshot = serde_json::from_str(text)?;
        self.workspace = Workspace::from_snapshot(snapshot);
        info!(
            "event=import module=session status=ok pages={}",
            self.workspace.pages().len()
        );
        self.relayout();
        Ok(self.persist_now(now))
    }
}
