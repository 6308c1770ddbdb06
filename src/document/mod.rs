//! Document model for strata.
//!
//! A document is an ordered tree of mappings, sequences, scalars and
//! intrinsic expressions, addressed by key paths. The model provides the
//! merge primitive used by composition (recursive key-wise union for
//! mappings, full replacement for anything else at a colliding path) and
//! the `dump()` contract consumed by downstream deployment tooling.
//!
//! Documents also carry a local state mapping that overrides can read
//! during composition. State is never emitted by `dump()`.

mod node;


pub use node::{Intrinsic, Mapping, Node, Scalar};

use serde_json::Value;

/// Top-level key for resource declarations.
pub const RESOURCES: &str = "Resources";
/// Top-level key for parameter declarations.
pub const PARAMETERS: &str = "Parameters";
/// Top-level key for output declarations.
pub const OUTPUTS: &str = "Outputs";

/// An ordered template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Node,
    state: Mapping,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Document {
            root: Node::mapping(),
            state: Mapping::new(),
        }
    }

    /// The root mapping of the document.
    pub fn root(&self) -> &Mapping {
        self.root
            .as_mapping()
            .expect("document root is always a mapping")
    }

    /// Mutable access to the root mapping.
    pub fn root_mut(&mut self) -> &mut Mapping {
        self.root
            .as_mapping_mut()
            .expect("document root is always a mapping")
    }

    /// Get the node at a key path.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        self.root.get(path)
    }

    /// Mutable access to the node at a key path.
    pub fn get_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        self.root.get_mut(path)
    }

    /// Set the node at a key path, creating intermediate mappings as needed.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: impl Into<Node>) {
        self.root.set(path, value.into());
    }

    /// Merge another document into this one.
    ///
    /// Mappings union recursively; a later scalar, sequence or intrinsic
    /// value wins wholesale on a colliding path. Local state is not merged.
    pub fn merge_from(&mut self, source: &Document) {
        self.root.merge_from(&source.root);
    }

    /// Document-local state, readable by overrides during composition.
    pub fn state(&self) -> &Mapping {
        &self.state
    }

    /// Merge a set of arguments into document-local state.
    pub fn merge_state(&mut self, args: Mapping) {
        let mut target = Node::Mapping(std::mem::take(&mut self.state));
        target.merge_from(&Node::Mapping(args));
        self.state = match target {
            Node::Mapping(map) => map,
            _ => unreachable!("merging a mapping into a mapping yields a mapping"),
        };
    }

    /// Dump to a plain nested structure.
    ///
    /// Mappings become ordered objects and sequences become arrays. The
    /// state mapping is excluded.
    pub fn dump(&self) -> Value {
        self.root.to_value()
    }

    /// Dump to a compact JSON string.
    pub fn to_json(&self) -> String {
        self.dump().to_string()
    }

    /// Import a document from a plain nested structure.
    ///
    /// The top level must be an object; intrinsic wire forms found anywhere
    /// below it are recognized. Non-object input yields an empty document.
    pub fn from_value(value: &Value) -> Document {
        let root = match Node::from_value(value) {
            node @ Node::Mapping(_) => node,
            _ => Node::mapping(),
        };
        Document {
            root,
            state: Mapping::new(),
        }
    }
}
