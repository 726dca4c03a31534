//! Response and notification types shared between the core and its hosts.
//!
//! `Response` is the synchronous answer to a dispatched `Command`.
//! `Notification` entries accumulate on a session while events are applied
//! and are drained by the host on its own schedule.

use serde::{Deserialize, Serialize};


/// Synchronous result of executing a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "result")]
pub enum Response {
    #[serde(rename = "ok")]
    Ok { output: String },

    #[serde(rename = "error")]
    Error { message: String },
}


/// Visibility state of a session's progress indicator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProgressState {
    /// No run has happened yet.
    Idle,
    /// A run is in flight with no completion estimate.
    Indeterminate,
    /// Counting down until a pending edit becomes a file change.
    Determinate { percent: f32 },
    /// The indicator is not shown.
    Hidden,
}


/// Asynchronous event emitted by a session for its host to act on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind")]
pub enum Notification {
    /// The progress indicator changed state.
    #[serde(rename = "progress")]
    Progress { state: ProgressState },

    /// Place a transient line annotation in the editor. At most one
    /// annotation is active per session at any instant.
    #[serde(rename = "annotation.place")]
    AnnotationPlace {
        view_id: String,
        file_path: String,
        line_number: u32,
    },

    /// Remove the currently active line annotation.
    #[serde(rename = "annotation.release")]
    AnnotationRelease,

    /// The worker process could not be started. The session is left
    /// workerless; no automatic retry happens.
    #[serde(rename = "spawn.failure")]
    SpawnFailure { message: String },

    /// One line of worker output failed to decode. The worker keeps
    /// running and no state was mutated.
    #[serde(rename = "protocol.malformed")]
    MalformedLine { error: String },
}
