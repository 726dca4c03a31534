//! Session controller — one live script-execution context.
//!
//! A session owns the worker supervisor and the derived UI state (snapshot
//! table and canvas layout), applies generation-tagged worker events through
//! a single-threaded loop, and drives the progress indicator. Events tagged
//! with a superseded generation never mutate anything; that check is the
//! central correctness guard for restart races.

pub mod worker;

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::canvas::{CanvasLayout, LayoutError};
use crate::config::{RestartPolicy, SandboxConfig};
use crate::protocol::ProtocolMessage;
use crate::response::{Notification, ProgressState};
use crate::snapshot::{Snapshot, SnapshotId, SnapshotTable};
use self::worker::{Supervisor, WorkerEvent, WorkerPayload};


/// One live script-execution context with its own worker process and
/// derived UI state.
pub struct Session {
    id: u32,
    config: Option<SandboxConfig>,
    supervisor: Supervisor,
    events_rx: Receiver<WorkerEvent>,
    snapshots: SnapshotTable,
    canvas: CanvasLayout,
    progress: ProgressState,
    /// View id of the currently active hover annotation, if any.
    annotation: Option<String>,
    notifications: Vec<Notification>,
    destroyed: bool,
}

impl Session {
    pub fn new(id: u32) -> Session {
        let (events_tx, events_rx) = mpsc::channel();
        Session {
            id,
            config: None,
            supervisor: Supervisor::new(events_tx),
            events_rx,
            snapshots: SnapshotTable::new(),
            canvas: CanvasLayout::new(),
            progress: ProgressState::Idle,
            annotation: None,
            notifications: Vec::new(),
            destroyed: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Generation of the most recent worker spawn.
    pub fn generation(&self) -> u64 {
        self.supervisor.generation()
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_live()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    pub fn config(&self) -> Option<&SandboxConfig> {
        self.config.as_ref()
    }

    pub fn snapshots(&self) -> &SnapshotTable {
        &self.snapshots
    }

    pub fn canvas(&self) -> &CanvasLayout {
        &self.canvas
    }

    /// Set the run configuration. Takes effect on the next restart.
    pub fn configure(&mut self, config: SandboxConfig) {
        self.config = Some(config);
    }

    // -----------------------------------------------------------------------
    // Worker lifecycle
    // -----------------------------------------------------------------------

    /// Terminate any live worker and start a new one for the current
    /// configuration. Returns the new generation.
    pub fn restart(&mut self) -> Result<u64, String> {
        let Some(config) = self.config.clone() else {
            return Err(format!("session {} has no sandbox configured", self.id));
        };
        self.supervisor.terminate();
        match self.supervisor.spawn(&config) {
            Ok(generation) => Ok(generation),
            Err(e) => {
                let message = e.to_string();
                self.notify(Notification::SpawnFailure {
                    message: message.clone(),
                });
                Err(message)
            }
        }
    }

    /// A watched file changed on disk. Restarts the run when the change is
    /// relevant under the configured policy and shows indeterminate
    /// progress. An unconfigured session only hides its indicator.
    pub fn on_file_changed(&mut self, path: &str) {
        if self.destroyed {
            return;
        }
        let Some(config) = self.config.as_ref() else {
            self.set_progress(ProgressState::Hidden);
            return;
        };
        if config.restart == RestartPolicy::ScriptOnly && path != config.script {
            return;
        }
        match self.restart() {
            Ok(_) => self.set_progress(ProgressState::Indeterminate),
            Err(_) => self.set_progress(ProgressState::Hidden),
        }
    }

    /// The user edited a file. Only the progress indicator reacts; the
    /// worker is left alone until the change is committed to disk.
    pub fn on_file_edit(&mut self, _path: &str) {
        if self.supervisor.is_live() {
            self.set_progress(ProgressState::Determinate { percent: 0.0 });
        }
    }

    /// Countdown until the pending edit is submitted as a change. Only
    /// meaningful while the indicator is determinate.
    pub fn on_time_to_change(&mut self, remaining_ms: u64, max_ms: u64) {
        if max_ms == 0 {
            return;
        }
        if let ProgressState::Determinate { .. } = self.progress {
            let percent =
                max_ms.saturating_sub(remaining_ms) as f32 / max_ms as f32 * 100.0;
            self.set_progress(ProgressState::Determinate {
                percent: percent.clamp(0.0, 100.0),
            });
        }
    }

    /// Tear down the session: terminate the worker, release the annotation,
    /// hide the indicator. Idempotent; safe to call mid-restart.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.supervisor.terminate();
        self.release_annotation();
        self.set_progress(ProgressState::Hidden);
    }

    // -----------------------------------------------------------------------
    // Event application
    // -----------------------------------------------------------------------

    /// Apply one worker event. Events tagged with a generation other than
    /// the current one are discarded without touching any state.
    pub fn apply_event(&mut self, event: WorkerEvent) {
        if event.generation != self.generation() {
            debug!(
                session = self.id,
                event_generation = event.generation,
                current = self.generation(),
                "discarding stale worker event"
            );
            return;
        }
        match event.payload {
            WorkerPayload::Message(ProtocolMessage::ScriptStart) => {
                self.release_annotation();
                self.snapshots.clear();
                self.canvas.clear_all();
            }
            WorkerPayload::Message(ProtocolMessage::ViewUpdate {
                file_path,
                line_number,
                view,
            }) => {
                let snapshot_id = self.snapshots.insert(file_path, line_number, view);
                self.canvas.add_inspector(snapshot_id, None, None);
            }
            WorkerPayload::Message(ProtocolMessage::ScriptEnd) => {
                self.set_progress(ProgressState::Hidden);
            }
            WorkerPayload::Malformed { error, .. } => {
                self.notify(Notification::MalformedLine { error });
            }
            WorkerPayload::Exited { .. } => {
                self.supervisor.notice_exit(event.generation);
                self.set_progress(ProgressState::Hidden);
            }
        }
    }

    /// Drain and apply all queued events without blocking. Returns the
    /// number of events taken off the queue.
    pub fn poll_events(&mut self) -> usize {
        let mut taken = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
            taken += 1;
        }
        taken
    }

    /// Wait up to `timeout` for the next worker event.
    pub fn next_event(&self, timeout: Duration) -> Option<WorkerEvent> {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    // -----------------------------------------------------------------------
    // Inspector operations (direct user actions)
    // -----------------------------------------------------------------------

    pub fn add_inspector(
        &mut self,
        snapshot_id: SnapshotId,
        view_id: Option<String>,
        insert_after_idx: Option<isize>,
    ) {
        self.canvas.add_inspector(snapshot_id, view_id, insert_after_idx);
    }

    pub fn remove_inspector(&mut self, idx: usize) -> Result<(), LayoutError> {
        self.canvas.remove_inspector(idx).map(|_| ())
    }

    pub fn reorder_inspector(&mut self, src: usize, dest: usize) -> Result<(), LayoutError> {
        self.canvas.reorder_inspector(src, dest)
    }

    pub fn duplicate_inspector(&mut self, idx: usize) -> Result<(), LayoutError> {
        self.canvas.duplicate_inspector(idx)
    }

    pub fn clear_inspectors(&mut self) {
        self.canvas.clear_all();
    }

    pub fn clear_snapshots(&mut self) {
        self.snapshots.clear();
    }

    // -----------------------------------------------------------------------
    // Hover annotations
    // -----------------------------------------------------------------------

    /// The pointer entered a rendered view. Placing a new annotation always
    /// releases the previous one first, so at most one is active.
    pub fn on_viewer_hover(&mut self, view_id: &str, file_path: &str, line_number: u32) {
        self.release_annotation();
        self.annotation = Some(view_id.to_string());
        self.notify(Notification::AnnotationPlace {
            view_id: view_id.to_string(),
            file_path: file_path.to_string(),
            line_number,
        });
    }

    /// The pointer left the rendered view.
    pub fn on_viewer_unhover(&mut self) {
        self.release_annotation();
    }

    /// View id of the active annotation, if one is placed.
    pub fn active_annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    fn release_annotation(&mut self) {
        if self.annotation.take().is_some() {
            self.notify(Notification::AnnotationRelease);
        }
    }

    // -----------------------------------------------------------------------
    // Host-facing output
    // -----------------------------------------------------------------------

    fn set_progress(&mut self, state: ProgressState) {
        if self.progress != state {
            self.progress = state;
            self.notify(Notification::Progress { state });
        }
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Notifications queued since the last drain.
    pub fn pending_notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Take and clear accumulated notifications.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Read-only rendering state for display collaborators.
    pub fn render(&self) -> RenderState {
        RenderState {
            progress: self.progress,
            inspectors: self
                .canvas
                .inspectors()
                .iter()
                .map(|inspector| RenderedInspector {
                    snapshot_id: inspector.snapshot_id,
                    view_id: inspector.view_id.clone(),
                    snapshot: self.snapshots.get(inspector.snapshot_id).cloned(),
                })
                .collect(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.destroy();
    }
}


/// Serializable view of a session's display state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    pub progress: ProgressState,
    pub inspectors: Vec<RenderedInspector>,
}

/// One inspector joined with its snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedInspector {
    pub snapshot_id: SnapshotId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_id: Option<String>,
    /// `None` while the referenced snapshot is absent from the table; the
    /// display collaborator shows a pending placeholder, never an error.
    pub snapshot: Option<Snapshot>,
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
