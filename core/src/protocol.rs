//! Worker wire protocol — line-delimited JSON records exchanged with the
//! interpreter process.
//!
//! Every record on the worker's stdout carries all five fields, with nulls
//! for the unused ones:
//!
//! ```text
//! {"filePath": "a.py", "lineNumber": 5, "view": {...}, "scriptStart": false, "scriptEnd": false}
//! ```
//!
//! Decoding maps one line to exactly one tagged `ProtocolMessage`; lines
//! within one generation are decoded strictly in arrival order, never
//! batched or reordered.

use serde::{Deserialize, Serialize};
use serde_json::Value;


/// One raw record as emitted by the worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub line_number: Option<u32>,
    #[serde(default)]
    pub view: Option<Value>,
    #[serde(default)]
    pub script_start: bool,
    #[serde(default)]
    pub script_end: bool,
}


/// A decoded worker message.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    /// A new run began; all previously captured state is stale.
    ScriptStart,
    /// The script produced one visualization at a source location.
    ViewUpdate {
        file_path: String,
        line_number: u32,
        view: Value,
    },
    /// The run finished.
    ScriptEnd,
}


#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(String),
}


/// Decode one line of worker output into a tagged message.
///
/// When a record sets several fields at once, `scriptStart` wins, then a
/// non-null `view`, then `scriptEnd`. The engine's crash path emits a final
/// record carrying both an error view and `scriptEnd: true`; it decodes as
/// the view update, and the worker-exit event closes the run.
pub fn decode_line(line: &str) -> Result<ProtocolMessage, ProtocolError> {
    let record: WireRecord =
        serde_json::from_str(line).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    if record.script_start {
        return Ok(ProtocolMessage::ScriptStart);
    }
    if let Some(view) = record.view {
        let file_path = record
            .file_path
            .ok_or_else(|| ProtocolError::Malformed("view update without filePath".into()))?;
        // Line numbers are 1-based; the engine's fallback error path reports 0.
        let line_number = record.line_number.unwrap_or(1).max(1);
        return Ok(ProtocolMessage::ViewUpdate {
            file_path,
            line_number,
            view,
        });
    }
    if record.script_end {
        return Ok(ProtocolMessage::ScriptEnd);
    }
    Err(ProtocolError::Malformed(
        "record asserts no event".into(),
    ))
}


/// The single control directive written to the worker's stdin right after
/// spawn. No other outbound control exists.
pub fn encode_start() -> &'static str {
    "start"
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
