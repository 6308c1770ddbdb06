//! Insertion of dynamics and builtin shortcuts into a document.

use super::registry::DynamicsRegistry;
use super::shortcuts::ShortcutRegistry;
use crate::document::{Document, Node, RESOURCES};
use crate::error::{Result, StrataError};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Config key that overrides the resource-name suffix on the builtin path.
const RESOURCE_NAME_SUFFIX: &str = "resource_name_suffix";

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([a-z0-9])([A-Z])").expect("Invalid camel boundary regex"));

/// Convert a camel-case name to its snake-case spelling.
///
/// Only lower-to-upper boundaries split, so an acronym run stays together:
/// `LoadBalancerName` becomes `load_balancer_name`, `DBName` becomes
/// `dbname`.
pub fn snake(name: &str) -> String {
    CAMEL_BOUNDARY
        .replace_all(name, "${1}_${2}")
        .to_lowercase()
}

/// A refinement applied to a single node.
pub type RefineFn = Box<dyn Fn(&mut Node)>;

/// A value supplied in insert config: either a literal node, or a
/// refinement executed against the node at the property's path.
pub enum ConfigValue {
    Literal(Node),
    Refine(RefineFn),
}

/// Arguments for one insert call: an optional base name plus a config
/// mapping.
#[derive(Default)]
pub struct InsertArgs {
    base_name: Option<String>,
    config: IndexMap<String, ConfigValue>,
}

impl InsertArgs {
    /// Empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments carrying a base name for the builtin insert path.
    pub fn named(base_name: impl Into<String>) -> Self {
        InsertArgs {
            base_name: Some(base_name.into()),
            config: IndexMap::new(),
        }
    }

    /// Add a literal config value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.config
            .insert(key.into(), ConfigValue::Literal(value.into()));
        self
    }

    /// Add a refinement config value, executed against the property node.
    pub fn with_refine<F>(mut self, key: impl Into<String>, refine: F) -> Self
    where
        F: Fn(&mut Node) + 'static,
    {
        self.config
            .insert(key.into(), ConfigValue::Refine(Box::new(refine)));
        self
    }

    /// The base name, if one was given.
    pub fn base_name(&self) -> Option<&str> {
        self.base_name.as_deref()
    }

    /// Look up a config value for a declared property name: the literal
    /// key is tried first, then its snake-case spelling.
    pub fn lookup(&self, property_name: &str) -> Option<&ConfigValue> {
        self.config
            .get(property_name)
            .or_else(|| self.config.get(snake(property_name).as_str()))
    }

    fn take(&mut self, key: &str) -> Option<ConfigValue> {
        self.config.shift_remove(key)
    }
}

/// Resolves named insertions against a document.
///
/// Resolution order: a user-registered dynamic wins over a builtin
/// shortcut of the same name; if neither matches, the insert fails with a
/// lookup error enumerating every registered dynamic.
pub struct Inserter<'a> {
    dynamics: &'a DynamicsRegistry,
    shortcuts: &'a ShortcutRegistry,
}

impl<'a> Inserter<'a> {
    pub fn new(dynamics: &'a DynamicsRegistry, shortcuts: &'a ShortcutRegistry) -> Self {
        Inserter {
            dynamics,
            shortcuts,
        }
    }

    /// Insert a named dynamic or builtin shortcut into the target document.
    pub fn insert(&self, name: &str, target: &mut Document, args: InsertArgs) -> Result<()> {
        self.run(name, target, args, None)
    }

    /// Insert with a refinement applied to the built node.
    pub fn insert_refined<F>(
        &self,
        name: &str,
        target: &mut Document,
        args: InsertArgs,
        refine: F,
    ) -> Result<()>
    where
        F: Fn(&mut Node),
    {
        self.run(name, target, args, Some(&refine))
    }

    /// Run the builtin shortcut path alone.
    ///
    /// Returns `false` when the name has no shortcut or no base name was
    /// supplied.
    pub fn builtin_insert(
        &self,
        name: &str,
        target: &mut Document,
        args: InsertArgs,
    ) -> Result<bool> {
        self.builtin(name, target, args, None)
    }

    fn run(
        &self,
        name: &str,
        target: &mut Document,
        args: InsertArgs,
        refine: Option<&dyn Fn(&mut Node)>,
    ) -> Result<()> {
        if let Some(dynamic) = self.dynamics.get(name) {
            log::debug!("inserting user dynamic '{name}'");
            let path = (dynamic.builder)(target, &args)?;
            if let Some(refine) = refine {
                let built = target.get_mut(&path).ok_or_else(|| {
                    StrataError::Lookup(format!(
                        "dynamic '{name}' reported built node at '{}' but nothing exists there",
                        path.join(".")
                    ))
                })?;
                refine(built);
            }
            return Ok(());
        }

        if self.builtin(name, target, args, refine)? {
            return Ok(());
        }

        Err(StrataError::Lookup(format!(
            "failed to locate requested dynamic for insertion: {} (valid: {})",
            name,
            self.dynamics.sorted_names().join(", ")
        )))
    }

    fn builtin(
        &self,
        name: &str,
        target: &mut Document,
        mut args: InsertArgs,
        refine: Option<&dyn Fn(&mut Node)>,
    ) -> Result<bool> {
        let Some(shortcut) = self.shortcuts.get(name) else {
            return Ok(false);
        };
        let Some(base_name) = args.base_name().map(str::to_string) else {
            return Ok(false);
        };

        // The suffix key is consumed so it is never treated as a property.
        let suffix = match args.take(RESOURCE_NAME_SUFFIX) {
            Some(ConfigValue::Literal(node)) => {
                node.as_str().map(str::to_string).unwrap_or_else(|| name.to_string())
            }
            _ => name.to_string(),
        };
        let resource_name = format!("{base_name}_{suffix}");
        log::debug!("builtin insert '{name}' as resource '{resource_name}'");

        target.set(
            &[RESOURCES, resource_name.as_str(), "Type"],
            shortcut.resource_type.as_str(),
        );

        for property_name in &shortcut.property_names {
            let Some(value) = args.lookup(property_name) else {
                continue;
            };
            let path = [
                RESOURCES,
                resource_name.as_str(),
                "Properties",
                property_name.as_str(),
            ];
            match value {
                ConfigValue::Literal(node) => target.set(&path, node.clone()),
                ConfigValue::Refine(refinement) => {
                    if target.get(&path).is_none() {
                        target.set(&path, Node::mapping());
                    }
                    let property = target
                        .get_mut(&path)
                        .expect("property node created above");
                    refinement(property);
                }
            }
        }

        if let Some(refine) = refine {
            let resource = target
                .get_mut(&[RESOURCES, resource_name.as_str()])
                .expect("resource created above");
            refine(resource);
        }
        Ok(true)
    }
}
