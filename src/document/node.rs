//! Node variants for the document tree.

use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Ordered mapping of keys to nodes. Keys are unique and iteration follows
/// insertion order.
pub type Mapping = IndexMap<String, Node>;

/// A scalar leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

/// A tagged intrinsic operation.
///
/// Intrinsics are the deployment-time expressions of the template language.
/// They serialize to their wire forms: `{"Ref": name}`,
/// `{"Fn::GetAtt": [target, path]}` and `{"Fn::Join": [delimiter, items]}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Intrinsic {
    /// Reference to a parameter or resource by logical name.
    Ref(String),
    /// Attribute access on a resource: logical name plus attribute path.
    GetAtt(String, String),
    /// Delimiter-joined list of items.
    Join(String, Vec<Node>),
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Scalar(Scalar),
    Intrinsic(Intrinsic),
}

impl Node {
    /// An empty mapping node.
    pub fn mapping() -> Self {
        Node::Mapping(Mapping::new())
    }

    /// View this node as a mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable view of this node as a mapping.
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// View this node as a string scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Truthiness in the template sense: only `Null` and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Node::Scalar(Scalar::Null) | Node::Scalar(Scalar::Bool(false)))
    }

    /// Get the node at a key path below this node.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        let mut current = self;
        for key in path {
            current = current.as_mapping()?.get(key.as_ref())?;
        }
        Some(current)
    }

    /// Mutable access to the node at a key path below this node.
    pub fn get_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        let mut current = self;
        for key in path {
            current = current.as_mapping_mut()?.get_mut(key.as_ref())?;
        }
        Some(current)
    }

    /// Set the node at a key path below this node.
    ///
    /// Intermediate mappings are created as needed; an intermediate that is
    /// not a mapping is replaced by one.
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: Node) {
        let mut current = self;
        for key in path {
            if current.as_mapping().is_none() {
                *current = Node::mapping();
            }
            let map = current
                .as_mapping_mut()
                .expect("intermediate node replaced by mapping above");
            current = map
                .entry(key.as_ref().to_string())
                .or_insert_with(Node::mapping);
        }
        *current = value;
    }

    /// Merge `source` into this node.
    ///
    /// Mappings merge recursively key-wise; any other collision replaces
    /// this node with a clone of `source` wholesale.
    pub fn merge_from(&mut self, source: &Node) {
        match (self, source) {
            (Node::Mapping(target), Node::Mapping(src)) => {
                for (key, value) in src {
                    match target.get_mut(key) {
                        Some(existing) => existing.merge_from(value),
                        None => {
                            target.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (target, source) => *target = source.clone(),
        }
    }

    /// Dump this node to a plain `serde_json::Value`.
    ///
    /// Mappings become ordered objects, sequences become arrays and
    /// intrinsics take their wire forms.
    pub fn to_value(&self) -> Value {
        match self {
            Node::Mapping(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map {
                    object.insert(key.clone(), value.to_value());
                }
                Value::Object(object)
            }
            Node::Sequence(items) => Value::Array(items.iter().map(Node::to_value).collect()),
            Node::Scalar(Scalar::String(s)) => Value::String(s.clone()),
            Node::Scalar(Scalar::Number(n)) => Value::Number(n.clone()),
            Node::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            Node::Scalar(Scalar::Null) => Value::Null,
            Node::Intrinsic(Intrinsic::Ref(name)) => {
                let mut object = serde_json::Map::new();
                object.insert("Ref".to_string(), Value::String(name.clone()));
                Value::Object(object)
            }
            Node::Intrinsic(Intrinsic::GetAtt(target, path)) => {
                let mut object = serde_json::Map::new();
                object.insert(
                    "Fn::GetAtt".to_string(),
                    Value::Array(vec![
                        Value::String(target.clone()),
                        Value::String(path.clone()),
                    ]),
                );
                Value::Object(object)
            }
            Node::Intrinsic(Intrinsic::Join(delimiter, items)) => {
                let mut object = serde_json::Map::new();
                object.insert(
                    "Fn::Join".to_string(),
                    Value::Array(vec![
                        Value::String(delimiter.clone()),
                        Value::Array(items.iter().map(Node::to_value).collect()),
                    ]),
                );
                Value::Object(object)
            }
        }
    }

    /// Build a node from a plain `serde_json::Value`.
    ///
    /// Single-key objects matching an intrinsic wire form are recognized as
    /// intrinsics; everything else imports structurally.
    pub fn from_value(value: &Value) -> Node {
        match value {
            Value::Object(object) => {
                if let Some(intrinsic) = intrinsic_from_object(object) {
                    return Node::Intrinsic(intrinsic);
                }
                let mut map = Mapping::new();
                for (key, value) in object {
                    map.insert(key.clone(), Node::from_value(value));
                }
                Node::Mapping(map)
            }
            Value::Array(items) => Node::Sequence(items.iter().map(Node::from_value).collect()),
            Value::String(s) => Node::Scalar(Scalar::String(s.clone())),
            Value::Number(n) => Node::Scalar(Scalar::Number(n.clone())),
            Value::Bool(b) => Node::Scalar(Scalar::Bool(*b)),
            Value::Null => Node::Scalar(Scalar::Null),
        }
    }
}

/// Recognize the intrinsic wire forms on a single-key object.
fn intrinsic_from_object(object: &serde_json::Map<String, Value>) -> Option<Intrinsic> {
    if object.len() != 1 {
        return None;
    }
    let (key, value) = object.iter().next()?;
    match (key.as_str(), value) {
        ("Ref", Value::String(name)) => Some(Intrinsic::Ref(name.clone())),
        ("Fn::GetAtt", Value::Array(parts)) if parts.len() == 2 => {
            match (&parts[0], &parts[1]) {
                (Value::String(target), Value::String(path)) => {
                    Some(Intrinsic::GetAtt(target.clone(), path.clone()))
                }
                _ => None,
            }
        }
        ("Fn::Join", Value::Array(parts)) if parts.len() == 2 => match (&parts[0], &parts[1]) {
            (Value::String(delimiter), Value::Array(items)) => Some(Intrinsic::Join(
                delimiter.clone(),
                items.iter().map(Node::from_value).collect(),
            )),
            _ => None,
        },
        _ => None,
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Scalar(Scalar::String(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Scalar(Scalar::Number(Number::from(value)))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Scalar(Scalar::Bool(value))
    }
}

impl From<Intrinsic> for Node {
    fn from(value: Intrinsic) -> Self {
        Node::Intrinsic(value)
    }
}

impl From<Mapping> for Node {
    fn from(value: Mapping) -> Self {
        Node::Mapping(value)
    }
}

impl<T: Into<Node>> From<Vec<T>> for Node {
    fn from(value: Vec<T>) -> Self {
        Node::Sequence(value.into_iter().map(Into::into).collect())
    }
}
