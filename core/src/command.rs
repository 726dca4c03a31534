//! Command — the typed interface for all Vizbench operations.
//!
//! Hosts (the CLI, an editor integration) drive sessions exclusively
//! through these commands; layout operations are reachable both from
//! protocol events and from direct user action.

use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotId;


#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command")]
pub enum Command {
    // -----------------------------------------------------------------
    // Top-level commands
    // -----------------------------------------------------------------

    #[serde(rename = "status")]
    Status,

    #[serde(rename = "sandbox.list")]
    SandboxList,

    #[serde(rename = "help")]
    Help {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
    },

    // -----------------------------------------------------------------
    // Session commands
    // -----------------------------------------------------------------

    #[serde(rename = "session.create")]
    SessionCreate {
        session: u32,
    },

    #[serde(rename = "session.select")]
    SessionSelect {
        session: u32,
        sandbox: String,
    },

    #[serde(rename = "session.configure")]
    SessionConfigure {
        session: u32,
        interpreter: String,
        script: String,
        #[serde(default)]
        args: Vec<String>,
    },

    #[serde(rename = "session.restart")]
    SessionRestart {
        session: u32,
    },

    #[serde(rename = "session.render")]
    SessionRender {
        session: u32,
    },

    #[serde(rename = "session.destroy")]
    SessionDestroy {
        session: u32,
    },

    // -----------------------------------------------------------------
    // File events (broadcast to all live sessions)
    // -----------------------------------------------------------------

    #[serde(rename = "file.changed")]
    FileChanged {
        path: String,
    },

    #[serde(rename = "file.edit")]
    FileEdit {
        path: String,
    },

    #[serde(rename = "file.countdown")]
    FileCountdown {
        remaining_ms: u64,
        max_ms: u64,
    },

    // -----------------------------------------------------------------
    // Inspector commands
    // -----------------------------------------------------------------

    #[serde(rename = "inspector.add")]
    InspectorAdd {
        session: u32,
        snapshot: SnapshotId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        view: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_after: Option<isize>,
    },

    #[serde(rename = "inspector.remove")]
    InspectorRemove {
        session: u32,
        index: usize,
    },

    #[serde(rename = "inspector.reorder")]
    InspectorReorder {
        session: u32,
        src: usize,
        dest: usize,
    },

    #[serde(rename = "inspector.duplicate")]
    InspectorDuplicate {
        session: u32,
        index: usize,
    },

    #[serde(rename = "inspector.clear")]
    InspectorClear {
        session: u32,
    },

    #[serde(rename = "snapshots.clear")]
    SnapshotsClear {
        session: u32,
    },

    // -----------------------------------------------------------------
    // Hover commands
    // -----------------------------------------------------------------

    #[serde(rename = "hover.enter")]
    HoverEnter {
        session: u32,
        view: String,
        path: String,
        line: u32,
    },

    #[serde(rename = "hover.leave")]
    HoverLeave {
        session: u32,
    },
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        let cmd = Command::Status;
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"status\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn sandbox_list_round_trip() {
        let cmd = Command::SandboxList;
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"sandbox.list\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn session_configure_round_trip() {
        let cmd = Command::SessionConfigure {
            session: 1,
            interpreter: "/usr/bin/python3".into(),
            script: "demo.py".into(),
            args: vec!["--fast".into()],
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"session.configure\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn session_configure_args_default_empty() {
        let json = r#"{"command": "session.configure", "session": 1,
                       "interpreter": "/usr/bin/python3", "script": "demo.py"}"#;
        let cmd: Command = serde_json::from_str(json).unwrap();
        match cmd {
            Command::SessionConfigure { args, .. } => assert!(args.is_empty()),
            other => panic!("expected SessionConfigure, got {:?}", other),
        }
    }

    #[test]
    fn file_changed_round_trip() {
        let cmd = Command::FileChanged {
            path: "/tmp/a.py".into(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"file.changed\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn inspector_reorder_round_trip() {
        let cmd = Command::InspectorReorder {
            session: 1,
            src: 2,
            dest: 0,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"inspector.reorder\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn hover_enter_round_trip() {
        let cmd = Command::HoverEnter {
            session: 1,
            view: "v1".into(),
            path: "/tmp/a.py".into(),
            line: 12,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"hover.enter\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn help_topic_omitted_when_none() {
        let cmd = Command::Help { topic: None };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"command":"help"}"#);
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
