//! Vizbench core — run a script under an external interpreter and observe
//! the visualizations it emits, line by line, in a live workspace.
//!
//! # Architecture
//!
//! 1. **Protocol codec** (`protocol`) -- decodes the worker's line-delimited
//!    JSON records into tagged messages.
//!
//! 2. **Worker supervisor** (`session::worker`) -- owns the zero-or-one live
//!    interpreter process per session and tags every event it forwards with
//!    the generation current at that worker's spawn time.
//!
//! 3. **Session controller** (`session`) -- applies worker events to the
//!    snapshot table and canvas layout through a single-threaded loop,
//!    discarding events from superseded generations, and drives the
//!    progress indicator.
//!
//! 4. **Workbench** (`workbench`) -- the command dispatch surface hosts talk
//!    to; owns the sandbox registry and the active sessions.

pub mod canvas;
pub mod command;
pub mod config;
pub mod help;
pub mod protocol;
pub mod response;
pub mod session;
pub mod snapshot;
pub mod workbench;
