//! Central runtime for Vizbench. Dispatches session, inspector, and file
//! commands across the active sessions.

use std::collections::HashMap;

use crate::command::Command;
use crate::config::{SandboxConfig, SandboxRegistry};
use crate::response::{Notification, Response};
use crate::session::Session;


/// Owns every active session plus the sandbox registry, and maps commands
/// to session operations. One session exists per open sandbox view.
pub struct Workbench {
    registry: SandboxRegistry,
    sessions: HashMap<u32, Session>,
}


impl Workbench {
    pub fn new(registry: SandboxRegistry) -> Workbench {
        Workbench {
            registry,
            sessions: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &SandboxRegistry {
        &self.registry
    }

    pub fn session(&self, id: u32) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Drain and apply queued worker events on every session. Returns the
    /// total number of events taken.
    pub fn poll_all(&mut self) -> usize {
        self.sessions.values_mut().map(|s| s.poll_events()).sum()
    }

    /// Take the accumulated notifications of one session.
    pub fn drain_notifications(&mut self, session: u32) -> Vec<Notification> {
        self.sessions
            .get_mut(&session)
            .map(|s| s.drain_notifications())
            .unwrap_or_default()
    }

    /// The single dispatch method.
    pub fn execute(&mut self, cmd: Command) -> Response {
        match cmd {
            Command::Status => self.cmd_status(),
            Command::SandboxList => self.cmd_sandbox_list(),
            Command::Help { topic } => self.cmd_help(topic),
            Command::SessionCreate { session } => self.cmd_session_create(session),
            Command::SessionSelect { session, sandbox } => {
                self.cmd_session_select(session, sandbox)
            }
            Command::SessionConfigure {
                session,
                interpreter,
                script,
                args,
            } => self.cmd_session_configure(session, interpreter, script, args),
            Command::SessionRestart { session } => self.cmd_session_restart(session),
            Command::SessionRender { session } => self.cmd_session_render(session),
            Command::SessionDestroy { session } => self.cmd_session_destroy(session),
            Command::FileChanged { path } => self.cmd_file_changed(path),
            Command::FileEdit { path } => self.cmd_file_edit(path),
            Command::FileCountdown {
                remaining_ms,
                max_ms,
            } => self.cmd_file_countdown(remaining_ms, max_ms),
            Command::InspectorAdd {
                session,
                snapshot,
                view,
                insert_after,
            } => self.with_session(session, |s| {
                s.add_inspector(snapshot, view, insert_after);
                Response::Ok {
                    output: "Inspector added".into(),
                }
            }),
            Command::InspectorRemove { session, index } => {
                self.with_session(session, |s| match s.remove_inspector(index) {
                    Ok(()) => Response::Ok {
                        output: "Inspector removed".into(),
                    },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                })
            }
            Command::InspectorReorder { session, src, dest } => {
                self.with_session(session, |s| match s.reorder_inspector(src, dest) {
                    Ok(()) => Response::Ok {
                        output: "Inspector moved".into(),
                    },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                })
            }
            Command::InspectorDuplicate { session, index } => {
                self.with_session(session, |s| match s.duplicate_inspector(index) {
                    Ok(()) => Response::Ok {
                        output: "Inspector duplicated".into(),
                    },
                    Err(e) => Response::Error {
                        message: e.to_string(),
                    },
                })
            }
            Command::InspectorClear { session } => self.with_session(session, |s| {
                s.clear_inspectors();
                Response::Ok {
                    output: "Canvas cleared".into(),
                }
            }),
            Command::SnapshotsClear { session } => self.with_session(session, |s| {
                s.clear_snapshots();
                Response::Ok {
                    output: "Snapshots cleared".into(),
                }
            }),
            Command::HoverEnter {
                session,
                view,
                path,
                line,
            } => self.with_session(session, |s| {
                s.on_viewer_hover(&view, &path, line);
                Response::Ok {
                    output: String::new(),
                }
            }),
            Command::HoverLeave { session } => self.with_session(session, |s| {
                s.on_viewer_unhover();
                Response::Ok {
                    output: String::new(),
                }
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Top-level commands
    // -----------------------------------------------------------------------

    fn cmd_status(&mut self) -> Response {
        let running = self.sessions.values().filter(|s| s.is_running()).count();
        Response::Ok {
            output: serde_json::json!({
                "sessions": self.sessions.len(),
                "running": running,
                "sandboxes": self.registry.len(),
            })
            .to_string(),
        }
    }

    fn cmd_sandbox_list(&self) -> Response {
        Response::Ok {
            output: self.registry.to_json(),
        }
    }

    fn cmd_help(&self, topic: Option<String>) -> Response {
        Response::Ok {
            output: crate::help::help_text(topic.as_deref()),
        }
    }

    // -----------------------------------------------------------------------
    // Session commands
    // -----------------------------------------------------------------------

    fn cmd_session_create(&mut self, id: u32) -> Response {
        if self.sessions.contains_key(&id) {
            return Response::Error {
                message: format!("session {} already exists", id),
            };
        }
        self.sessions.insert(id, Session::new(id));
        Response::Ok {
            output: format!("Session {} created", id),
        }
    }

    fn cmd_session_select(&mut self, id: u32, sandbox: String) -> Response {
        let Some(config) = self.registry.get(&sandbox).cloned() else {
            return Response::Error {
                message: format!("unknown sandbox: '{}'", sandbox),
            };
        };
        self.with_session(id, |s| {
            s.configure(config);
            Response::Ok {
                output: format!("Sandbox '{}' selected", sandbox),
            }
        })
    }

    fn cmd_session_configure(
        &mut self,
        id: u32,
        interpreter: String,
        script: String,
        args: Vec<String>,
    ) -> Response {
        self.with_session(id, |s| {
            s.configure(SandboxConfig {
                interpreter,
                script,
                args,
                restart: Default::default(),
            });
            Response::Ok {
                output: "Session configured".into(),
            }
        })
    }

    fn cmd_session_restart(&mut self, id: u32) -> Response {
        self.with_session(id, |s| match s.restart() {
            Ok(generation) => Response::Ok {
                output: format!("Worker started (generation {})", generation),
            },
            Err(message) => Response::Error { message },
        })
    }

    fn cmd_session_render(&mut self, id: u32) -> Response {
        self.with_session(id, |s| {
            // Apply anything the worker already queued so the render is fresh.
            s.poll_events();
            match serde_json::to_string(&s.render()) {
                Ok(output) => Response::Ok { output },
                Err(e) => Response::Error {
                    message: format!("Failed to serialize render state: {}", e),
                },
            }
        })
    }

    fn cmd_session_destroy(&mut self, id: u32) -> Response {
        match self.sessions.remove(&id) {
            Some(mut session) => {
                session.destroy();
                Response::Ok {
                    output: format!("Session {} destroyed", id),
                }
            }
            None => unknown_session(id),
        }
    }

    // -----------------------------------------------------------------------
    // File events
    // -----------------------------------------------------------------------

    fn cmd_file_changed(&mut self, path: String) -> Response {
        for session in self.sessions.values_mut() {
            session.on_file_changed(&path);
        }
        Response::Ok {
            output: format!("Change to {} forwarded", path),
        }
    }

    fn cmd_file_edit(&mut self, path: String) -> Response {
        for session in self.sessions.values_mut() {
            session.on_file_edit(&path);
        }
        Response::Ok {
            output: String::new(),
        }
    }

    fn cmd_file_countdown(&mut self, remaining_ms: u64, max_ms: u64) -> Response {
        for session in self.sessions.values_mut() {
            session.on_time_to_change(remaining_ms, max_ms);
        }
        Response::Ok {
            output: String::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn with_session<F>(&mut self, id: u32, f: F) -> Response
    where
        F: FnOnce(&mut Session) -> Response,
    {
        match self.sessions.get_mut(&id) {
            Some(session) => f(session),
            None => unknown_session(id),
        }
    }
}


fn unknown_session(id: u32) -> Response {
    Response::Error {
        message: format!("unknown session: {}", id),
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ProgressState;

    fn workbench() -> Workbench {
        Workbench::new(SandboxRegistry::default())
    }

    fn is_ok(r: &Response) -> bool {
        matches!(r, Response::Ok { .. })
    }

    fn output(r: &Response) -> &str {
        match r {
            Response::Ok { output } => output,
            Response::Error { message } => message,
        }
    }

    #[test]
    fn status_reports_counts() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::Status);
        assert!(is_ok(&r));
        let parsed: serde_json::Value = serde_json::from_str(output(&r)).unwrap();
        assert_eq!(parsed["sessions"], 1);
        assert_eq!(parsed["running"], 0);
    }

    #[test]
    fn create_twice_is_error() {
        let mut wb = workbench();
        assert!(is_ok(&wb.execute(Command::SessionCreate { session: 1 })));
        let r = wb.execute(Command::SessionCreate { session: 1 });
        assert!(matches!(r, Response::Error { .. }));
    }

    #[test]
    fn select_unknown_sandbox_is_error() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::SessionSelect {
            session: 1,
            sandbox: "bogus".into(),
        });
        assert!(matches!(r, Response::Error { .. }));
        assert!(output(&r).contains("unknown sandbox"));
    }

    #[test]
    fn select_known_sandbox_configures_session() {
        let registry = SandboxRegistry::from_yaml(
            "sandboxes:\n  demo:\n    interpreter: /bin/sh\n    script: demo.sh\n",
        )
        .unwrap();
        let mut wb = Workbench::new(registry);
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::SessionSelect {
            session: 1,
            sandbox: "demo".into(),
        });
        assert!(is_ok(&r));
        let config = wb.session(1).unwrap().config().unwrap();
        assert_eq!(config.script, "demo.sh");
    }

    #[test]
    fn commands_on_unknown_session_are_errors() {
        let mut wb = workbench();
        let r = wb.execute(Command::SessionRestart { session: 9 });
        assert!(output(&r).contains("unknown session"));
        let r = wb.execute(Command::InspectorClear { session: 9 });
        assert!(output(&r).contains("unknown session"));
    }

    #[test]
    fn restart_unconfigured_session_is_error() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::SessionRestart { session: 1 });
        assert!(matches!(r, Response::Error { .. }));
    }

    #[test]
    fn inspector_remove_out_of_range_maps_to_error() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::InspectorRemove {
            session: 1,
            index: 5,
        });
        assert!(matches!(r, Response::Error { .. }));
        assert!(output(&r).contains("out of range"));
    }

    #[test]
    fn render_returns_json_state() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        let r = wb.execute(Command::SessionRender { session: 1 });
        assert!(is_ok(&r));
        let parsed: serde_json::Value = serde_json::from_str(output(&r)).unwrap();
        assert!(parsed["inspectors"].as_array().unwrap().is_empty());
        assert_eq!(parsed["progress"]["state"], "idle");
    }

    #[test]
    fn destroy_removes_session() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        assert!(is_ok(&wb.execute(Command::SessionDestroy { session: 1 })));
        assert!(wb.session(1).is_none());
        let r = wb.execute(Command::SessionDestroy { session: 1 });
        assert!(matches!(r, Response::Error { .. }));
    }

    #[test]
    fn file_events_broadcast_to_sessions() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        wb.execute(Command::SessionCreate { session: 2 });
        // No session is configured, so a change only hides the indicators.
        let r = wb.execute(Command::FileChanged {
            path: "/tmp/a.py".into(),
        });
        assert!(is_ok(&r));
        assert_eq!(
            wb.session(1).unwrap().progress(),
            ProgressState::Hidden
        );
        assert_eq!(
            wb.session(2).unwrap().progress(),
            ProgressState::Hidden
        );
    }

    #[test]
    fn hover_commands_queue_notifications() {
        let mut wb = workbench();
        wb.execute(Command::SessionCreate { session: 1 });
        wb.execute(Command::HoverEnter {
            session: 1,
            view: "v1".into(),
            path: "/tmp/a.py".into(),
            line: 3,
        });
        wb.execute(Command::HoverLeave { session: 1 });
        let notes = wb.drain_notifications(1);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn drain_notifications_unknown_session_is_empty() {
        let mut wb = workbench();
        assert!(wb.drain_notifications(9).is_empty());
    }

    #[test]
    fn help_overview() {
        let mut wb = workbench();
        let r = wb.execute(Command::Help { topic: None });
        assert!(is_ok(&r));
        assert!(output(&r).contains("vizbench"));
    }
}
