//! Sandbox configuration — named run configurations loaded from YAML.
//!
//! A sandbox names an interpreter, a script, and the arguments the script
//! is started with. Hosts select one by name to configure a session.
//!
//! File format:
//!
//! ```yaml
//! sandboxes:
//!   demo:
//!     interpreter: /usr/bin/python3
//!     script: demo.py
//!     args: ["--fast"]
//!     restart: always
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};


/// Which file changes trigger a restart of a running sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// Any reported change restarts the run.
    Always,
    /// Only a change to the configured script restarts the run.
    ScriptOnly,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Always
    }
}


/// One runnable configuration: interpreter, script, and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    pub interpreter: String,
    pub script: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
}


#[derive(Debug, Default, Deserialize)]
struct SandboxFile {
    #[serde(default)]
    sandboxes: BTreeMap<String, SandboxConfig>,
}


/// A registry of named sandbox configurations.
#[derive(Debug, Clone, Default)]
pub struct SandboxRegistry {
    sandboxes: BTreeMap<String, SandboxConfig>,
}

impl SandboxRegistry {
    /// Parse a registry from YAML text.
    pub fn from_yaml(input: &str) -> Result<SandboxRegistry, String> {
        let file: SandboxFile = serde_yaml::from_str(input)
            .map_err(|e| format!("Failed to parse sandbox config: {}", e))?;
        Ok(SandboxRegistry {
            sandboxes: file.sandboxes,
        })
    }

    /// Load from a file path. A missing file yields an empty registry.
    pub fn from_file(path: &Path) -> Result<SandboxRegistry, String> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content),
            Err(_) => Ok(SandboxRegistry::default()),
        }
    }

    /// Find a sandbox by name.
    pub fn get(&self, name: &str) -> Option<&SandboxConfig> {
        self.sandboxes.get(name)
    }

    /// Sandbox names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.sandboxes.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sandboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sandboxes.is_empty()
    }

    /// Serialize the registry to JSON (for listing in hosts).
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "sandboxes": self
                .sandboxes
                .iter()
                .map(|(name, cfg)| {
                    serde_json::json!({
                        "name": name,
                        "interpreter": cfg.interpreter,
                        "script": cfg.script,
                    })
                })
                .collect::<Vec<_>>(),
        })
        .to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
sandboxes:
  demo:
    interpreter: /usr/bin/python3
    script: demo.py
    args: [\"--fast\"]
  trainer:
    interpreter: /usr/bin/python3
    script: train.py
    restart: script-only
";

    #[test]
    fn parse_sandboxes() {
        let reg = SandboxRegistry::from_yaml(SAMPLE).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.names(), vec!["demo", "trainer"]);
    }

    #[test]
    fn sandbox_fields() {
        let reg = SandboxRegistry::from_yaml(SAMPLE).unwrap();
        let demo = reg.get("demo").unwrap();
        assert_eq!(demo.interpreter, "/usr/bin/python3");
        assert_eq!(demo.script, "demo.py");
        assert_eq!(demo.args, vec!["--fast"]);
        assert_eq!(demo.restart, RestartPolicy::Always);
    }

    #[test]
    fn restart_policy_parses() {
        let reg = SandboxRegistry::from_yaml(SAMPLE).unwrap();
        let trainer = reg.get("trainer").unwrap();
        assert_eq!(trainer.restart, RestartPolicy::ScriptOnly);
        assert!(trainer.args.is_empty());
    }

    #[test]
    fn get_nonexistent() {
        let reg = SandboxRegistry::from_yaml(SAMPLE).unwrap();
        assert!(reg.get("bogus").is_none());
    }

    #[test]
    fn empty_input() {
        let reg = SandboxRegistry::from_yaml("").unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_registry() {
        let reg =
            SandboxRegistry::from_file(Path::new("/nonexistent/sandboxes.yaml")).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn from_file_reads_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sandboxes.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let reg = SandboxRegistry::from_file(&path).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn invalid_yaml_is_error() {
        let result = SandboxRegistry::from_yaml("sandboxes: [not, a, map]");
        assert!(result.is_err());
    }

    #[test]
    fn to_json_lists_names() {
        let reg = SandboxRegistry::from_yaml(SAMPLE).unwrap();
        let json: serde_json::Value = serde_json::from_str(&reg.to_json()).unwrap();
        let list = json["sandboxes"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "demo");
        assert_eq!(list[0]["script"], "demo.py");
    }
}
