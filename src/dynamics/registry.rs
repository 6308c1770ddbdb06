//! Registry of user-defined dynamics.

use super::insert::InsertArgs;
use crate::document::Document;
use crate::error::{Result, StrataError};
use indexmap::IndexMap;

/// Builder function for a dynamic.
///
/// A builder mutates the target document and returns the key path of the
/// node it built, so a caller-supplied refinement can be applied to it.
pub type DynamicBuilder = Box<dyn Fn(&mut Document, &InsertArgs) -> Result<Vec<String>>>;

/// Metadata describing one parameter a dynamic accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamInfo {
    pub description: Option<String>,
    pub type_name: Option<String>,
}

/// Parameter metadata for a dynamic, keyed by parameter name.
pub type ParamMeta = IndexMap<String, ParamInfo>;

/// A registered dynamic: its builder plus parameter metadata.
pub struct Dynamic {
    pub(crate) builder: DynamicBuilder,
    pub(crate) param_meta: ParamMeta,
}

/// Registry of named dynamics.
///
/// Re-registration under the same name overwrites the previous entry.
#[derive(Default)]
pub struct DynamicsRegistry {
    entries: IndexMap<String, Dynamic>,
}

impl DynamicsRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dynamic under a name. Last write wins.
    pub fn register<F>(&mut self, name: impl Into<String>, param_meta: ParamMeta, builder: F)
    where
        F: Fn(&mut Document, &InsertArgs) -> Result<Vec<String>> + 'static,
    {
        let name = name.into();
        log::debug!("registering dynamic '{name}'");
        self.entries.insert(
            name,
            Dynamic {
                builder: Box::new(builder),
                param_meta,
            },
        );
    }

    /// Parameter metadata for a registered dynamic.
    pub fn info(&self, name: &str) -> Result<&ParamMeta> {
        match self.entries.get(name) {
            Some(dynamic) => Ok(&dynamic.param_meta),
            None => Err(StrataError::Lookup(format!(
                "no dynamic registered with name '{}' (valid: {})",
                name,
                self.sorted_names().join(", ")
            ))),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Dynamic> {
        self.entries.get(name)
    }

    /// Registered dynamic names, sorted for stable error messages.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
