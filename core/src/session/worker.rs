//! Worker supervisor — owns the zero-or-one live interpreter process of a
//! session and stamps everything it emits with a generation number.
//!
//! Each spawn increments the generation; the reader thread captures the
//! value current at spawn time, so output from a superseded worker arrives
//! tagged with the old number and is dropped by the session's apply loop.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::protocol::{self, ProtocolMessage};


/// Payload of one event delivered from a worker to its session.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerPayload {
    /// A decoded protocol message.
    Message(ProtocolMessage),
    /// A line that failed to decode. The worker keeps running.
    Malformed { line: String, error: String },
    /// The process exited and was reaped.
    Exited { status: Option<i32> },
}


/// A worker event tagged with the generation of the process that emitted
/// it — the generation at its spawn time, not the session's current one.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerEvent {
    pub generation: u64,
    pub payload: WorkerPayload,
}


#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("failed to launch '{interpreter}': {source}")]
    Launch {
        interpreter: String,
        source: std::io::Error,
    },
    #[error("worker stdio unavailable")]
    Stdio,
    #[error("failed to send start directive: {0}")]
    Start(std::io::Error),
}


/// Handle to a live worker process.
///
/// The `Child` itself lives in the reader thread, which reaps it after its
/// output closes; the handle keeps only what terminate needs. Dropping the
/// handle closes the worker's stdin.
#[derive(Debug)]
struct WorkerHandle {
    pid: u32,
    generation: u64,
    _stdin: ChildStdin,
}


/// Supervisor for a session's worker process. At most one worker is live
/// per supervisor at any instant.
#[derive(Debug)]
pub struct Supervisor {
    generation: u64,
    handle: Option<WorkerHandle>,
    events_tx: Sender<WorkerEvent>,
}

impl Supervisor {
    pub fn new(events_tx: Sender<WorkerEvent>) -> Supervisor {
        Supervisor {
            generation: 0,
            handle: None,
            events_tx,
        }
    }

    /// Generation of the most recent spawn. Events tagged with anything
    /// older must not mutate session state.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True while a worker handle is held.
    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn a new worker for `config`, replacing any live one. Returns the
    /// generation assigned to the new worker.
    ///
    /// On launch failure the generation is still consumed and the session
    /// is left workerless; there is no automatic retry.
    pub fn spawn(&mut self, config: &SandboxConfig) -> Result<u64, SpawnError> {
        self.terminate();
        self.generation += 1;
        let generation = self.generation;

        let mut child = Command::new(&config.interpreter)
            .arg(&config.script)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|source| SpawnError::Launch {
                interpreter: config.interpreter.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(SpawnError::Stdio)?;
        let stdout = child.stdout.take().ok_or(SpawnError::Stdio)?;
        let pid = child.id();

        if let Err(e) = writeln!(stdin, "{}", protocol::encode_start()) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(SpawnError::Start(e));
        }

        let events_tx = self.events_tx.clone();
        thread::spawn(move || read_worker_output(child, stdout, generation, events_tx));

        self.handle = Some(WorkerHandle {
            pid,
            generation,
            _stdin: stdin,
        });
        debug!(generation, pid, "worker spawned");
        Ok(generation)
    }

    /// Terminate the live worker, if any. Idempotent; the generation is
    /// left unchanged (the next spawn increments it), and a worker that was
    /// already replaced is never signalled again.
    pub fn terminate(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        debug!(
            generation = handle.generation,
            pid = handle.pid,
            "terminating worker"
        );
        // The reader thread reaps the process once its output closes.
        unsafe {
            libc::kill(handle.pid as libc::pid_t, libc::SIGTERM);
        }
    }

    /// Clear the handle after the worker of `generation` exited on its own.
    /// A handle belonging to a newer spawn is left alone.
    pub fn notice_exit(&mut self, generation: u64) {
        if self.handle.as_ref().map(|h| h.generation) == Some(generation) {
            self.handle = None;
        }
    }
}


/// Reader loop for one worker process. Owns the child: decodes each line of
/// stdout and forwards it tagged with the spawn-time generation, then reaps
/// the process and reports its exit.
fn read_worker_output(
    mut child: Child,
    stdout: ChildStdout,
    generation: u64,
    events_tx: Sender<WorkerEvent>,
) {
    let reader = BufReader::new(stdout);
    let mut forwarding = true;
    for line in reader.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        // Once the session is gone, keep draining so the worker never
        // blocks on a full pipe before it exits.
        if !forwarding {
            continue;
        }
        let payload = match protocol::decode_line(&line) {
            Ok(message) => WorkerPayload::Message(message),
            Err(error) => {
                warn!(generation, %error, "undecodable worker line");
                WorkerPayload::Malformed {
                    error: error.to_string(),
                    line,
                }
            }
        };
        if events_tx
            .send(WorkerEvent {
                generation,
                payload,
            })
            .is_err()
        {
            forwarding = false;
        }
    }
    let status = child.wait().ok().and_then(|s| s.code());
    debug!(generation, ?status, "worker exited");
    let _ = events_tx.send(WorkerEvent {
        generation,
        payload: WorkerPayload::Exited { status },
    });
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
