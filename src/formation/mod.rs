//! Composition engine for strata.
//!
//! A [`Formation`] collects ordered fragments and layered overrides and
//! compiles them into a single cached document:
//!
//! - Fragments merge in load order (the base fragment first, then each
//!   explicitly loaded component); a later fragment's scalar, sequence or
//!   intrinsic value wins on path collisions
//! - Overrides run in registration order against the accumulated document,
//!   optionally injecting document-local state first
//!
//! Compilation is memoized per formation. `recompile` drops the cache and
//! rebuilds from the same fragment and override lists; fragment sources are
//! never consulted again.

#[cfg(test)]
mod tests;

use crate::document::{Document, Mapping};
use crate::error::{Result, StrataError};
use crate::nesting::{self, NestingOptions};
use crate::sources::{FragmentSource, TemplatePaths};
use serde_json::Value;

/// Key under which the base fragment participates in load order.
pub const BASE_KEY: &str = "__base__";

/// Keys a generation parameter may declare.
const ALLOWED_GENERATION_PARAMETERS: &[&str] = &["type", "default"];

/// A fragment in a formation's load order: a previously produced document
/// plus its stable key.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub key: String,
    pub document: Document,
}

/// Transform function of an override, invoked with the accumulated
/// document and a snapshot of document-local state.
pub type OverrideFn = Box<dyn Fn(&mut Document, &Mapping) -> Result<()>>;

/// A late-stage transform applied to the composed document, optionally
/// preceded by state injection.
pub struct Override {
    state_args: Mapping,
    transform: OverrideFn,
}

impl std::fmt::Debug for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Override")
            .field("state_args", &self.state_args)
            .field("transform", &"<fn>")
            .finish()
    }
}

impl Override {
    /// An override with no state injection.
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&mut Document, &Mapping) -> Result<()> + 'static,
    {
        Override {
            state_args: Mapping::new(),
            transform: Box::new(transform),
        }
    }

    /// An override whose `state_args` merge into document-local state
    /// before the transform runs (visible to this and all subsequent
    /// overrides).
    pub fn with_state<F>(state_args: Mapping, transform: F) -> Self
    where
        F: Fn(&mut Document, &Mapping) -> Result<()> + 'static,
    {
        Override {
            state_args,
            transform: Box::new(transform),
        }
    }
}

/// A named formation: ordered fragments, ordered overrides, validated
/// generation parameters and a cached compiled document.
#[derive(Debug)]
pub struct Formation {
    name: String,
    parameters: Mapping,
    fragments: Vec<Fragment>,
    overrides: Vec<Override>,
    compiled: Option<Document>,
}

impl Formation {
    /// Create a formation.
    ///
    /// Generation parameters are validated here, before any compile runs:
    /// every value must be a mapping declaring only `type` and `default`.
    pub fn new(name: impl Into<String>, parameters: Mapping) -> Result<Self> {
        validate_generation_parameters(&parameters)?;
        Ok(Formation {
            name: name.into(),
            parameters,
            fragments: Vec::new(),
            overrides: Vec::new(),
            compiled: None,
        })
    }

    /// The formation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validated generation-parameter mapping.
    pub fn parameters(&self) -> &Mapping {
        &self.parameters
    }

    /// Fragments in load order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Set the base fragment. It always merges first, regardless of when
    /// it is set; setting it again replaces the previous base.
    pub fn base(&mut self, document: Document) -> &mut Self {
        let fragment = Fragment {
            key: BASE_KEY.to_string(),
            document,
        };
        match self.fragments.first_mut() {
            Some(first) if first.key == BASE_KEY => *first = fragment,
            _ => self.fragments.insert(0, fragment),
        }
        self
    }

    /// Produce a fragment from a source now and append it to load order.
    pub fn load<S>(&mut self, key: impl Into<String>, source: &S) -> Result<&mut Self>
    where
        S: FragmentSource + ?Sized,
    {
        let document = source.produce()?;
        self.fragments.push(Fragment {
            key: key.into(),
            document,
        });
        Ok(self)
    }

    /// Load the component file `<components>/<name>` (YAML or JSON) as a
    /// fragment keyed by the component name.
    pub fn load_component(&mut self, paths: &TemplatePaths, name: &str) -> Result<&mut Self> {
        let file = paths.component_file(name)?;
        let document = crate::sources::load_document_file(&file)?;
        self.fragments.push(Fragment {
            key: name.to_string(),
            document,
        });
        Ok(self)
    }

    /// Append an override.
    pub fn push_override(&mut self, record: Override) -> &mut Self {
        self.overrides.push(record);
        self
    }

    /// Append an override with no state injection.
    pub fn override_with<F>(&mut self, transform: F) -> &mut Self
    where
        F: Fn(&mut Document, &Mapping) -> Result<()> + 'static,
    {
        self.push_override(Override::new(transform))
    }

    /// Append an override that injects state before running.
    pub fn override_with_state<F>(&mut self, state_args: Mapping, transform: F) -> &mut Self
    where
        F: Fn(&mut Document, &Mapping) -> Result<()> + 'static,
    {
        self.push_override(Override::with_state(state_args, transform))
    }

    /// Compile the formation, memoized.
    pub fn compile(&mut self) -> Result<&Document> {
        self.compile_with_state(Mapping::new())
    }

    /// Compile with injected initial state.
    ///
    /// The state is stored document-locally (never emitted by `dump`) for
    /// overrides to read. On a formation that is already compiled the
    /// cached document is returned and the state argument has no effect;
    /// call [`recompile`](Self::recompile) first for a fresh build.
    pub fn compile_with_state(&mut self, initial_state: Mapping) -> Result<&Document> {
        if self.compiled.is_none() {
            let document = self.build(initial_state)?;
            self.compiled = Some(document);
        }
        Ok(self.compiled.as_ref().expect("cache populated above"))
    }

    /// Discard the cache and compile again from the same fragment and
    /// override lists.
    pub fn recompile(&mut self) -> Result<&Document> {
        self.compiled = None;
        self.compile()
    }

    /// Whether the composed document contains any nested-stack resource.
    pub fn nested(&mut self) -> Result<bool> {
        Ok(nesting::has_nested_stacks(self.compile()?))
    }

    /// Whether the composed document contains only nested-stack resources.
    pub fn isolated_nests(&mut self) -> Result<bool> {
        Ok(nesting::only_nested_stacks(self.compile()?))
    }

    /// Compile and run the nesting pass. See [`nesting::apply_nesting`].
    pub fn apply_nesting<F>(&mut self, options: NestingOptions, locator: F) -> Result<Document>
    where
        F: FnMut(&str, &Value) -> Result<String>,
    {
        let document = self.compile()?.clone();
        nesting::apply_nesting(&document, options, locator)
    }

    /// Compile and dump to a plain nested structure.
    pub fn dump(&mut self) -> Result<Value> {
        Ok(self.compile()?.dump())
    }

    /// Compile and dump to a compact JSON string.
    pub fn to_json(&mut self) -> Result<String> {
        Ok(self.compile()?.to_json())
    }

    fn build(&self, initial_state: Mapping) -> Result<Document> {
        log::debug!(
            "compiling formation '{}' ({} fragments, {} overrides)",
            self.name,
            self.fragments.len(),
            self.overrides.len()
        );
        let mut document = Document::new();
        if !initial_state.is_empty() {
            document.merge_state(initial_state);
        }
        for fragment in &self.fragments {
            log::trace!("merging fragment '{}'", fragment.key);
            document.merge_from(&fragment.document);
        }
        for record in &self.overrides {
            if !record.state_args.is_empty() {
                document.merge_state(record.state_args.clone());
            }
            let state = document.state().clone();
            (record.transform)(&mut document, &state)?;
        }
        Ok(document)
    }
}

/// Validate generation parameters: every value a mapping, every key in the
/// allowed set.
fn validate_generation_parameters(parameters: &Mapping) -> Result<()> {
    for (name, value) in parameters {
        let Some(map) = value.as_mapping() else {
            return Err(StrataError::Validation(format!(
                "generation parameter '{name}' must be a mapping"
            )));
        };
        if let Some(key) = map
            .keys()
            .find(|key| !ALLOWED_GENERATION_PARAMETERS.contains(&key.as_str()))
        {
            return Err(StrataError::Validation(format!(
                "invalid generation parameter key `{key}` on '{name}' (allowed: {})",
                ALLOWED_GENERATION_PARAMETERS.join(", ")
            )));
        }
    }
    Ok(())
}
