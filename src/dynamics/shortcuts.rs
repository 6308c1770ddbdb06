//! Builtin resource-shortcut registry.
//!
//! Shortcuts map a short name (e.g. `loadbalancer`) to a concrete resource
//! type plus the property names the builtin insert path knows how to fill.
//! The registry is read-only at insert time; it is populated
//! programmatically or loaded from YAML tables of the form:
//!
//! ```yaml
//! loadbalancer:
//!   resource_type: AWS::ElasticLoadBalancing::LoadBalancer
//!   property_names: [Listeners, Ports]
//! ```

use crate::error::{Result, StrataError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One resource shortcut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shortcut {
    /// Concrete resource type the shortcut expands to.
    pub resource_type: String,

    /// Property names the builtin insert path resolves from its config.
    #[serde(default)]
    pub property_names: Vec<String>,
}

/// Registry of resource shortcuts, keyed by shortcut name.
#[derive(Debug, Clone, Default)]
pub struct ShortcutRegistry {
    entries: IndexMap<String, Shortcut>,
}

impl ShortcutRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shortcut under a name. Last write wins.
    pub fn register(&mut self, name: impl Into<String>, shortcut: Shortcut) {
        self.entries.insert(name.into(), shortcut);
    }

    /// Look up a shortcut by name.
    pub fn get(&self, name: &str) -> Option<&Shortcut> {
        self.entries.get(name)
    }

    /// Load shortcut entries from a YAML table file, merging into this
    /// registry. Entries in the file overwrite same-named entries here.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            StrataError::NotFound(format!(
                "failed to read shortcut registry file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let table: IndexMap<String, Shortcut> = serde_yaml::from_str(&content).map_err(|e| {
            StrataError::Validation(format!(
                "malformed shortcut registry file '{}': {}",
                path.display(),
                e
            ))
        })?;
        for (name, shortcut) in table {
            self.entries.insert(name, shortcut);
        }
        Ok(())
    }

    /// Load every `.yml`/`.yaml` table in a directory, in file-name order.
    pub fn load_dir<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            StrataError::NotFound(format!(
                "failed to read shortcut registry directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                StrataError::NotFound(format!("failed to read directory entry: {e}"))
            })?;
            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some("yml") | Some("yaml") => paths.push(path),
                _ => {}
            }
        }
        paths.sort();

        for path in paths {
            self.load_file(&path)?;
        }
        Ok(())
    }
}
