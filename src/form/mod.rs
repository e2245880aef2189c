//! Hierarchical form codec.
//!
//! Bidirectional conversion between flat `application/x-www-form-urlencoded`
//! key/value pairs using bracket/dot path syntax and a nested tree of
//! scalars, objects, and lists.
//!
//! # Key grammar
//!
//! ```text
//! key = segment ("." segment | "[" segment "]")*
//! ```
//!
//! An empty bracket pair (`tags[]`) is an *append* segment: it resolves to
//! a synthetic numeric string key, counted per object being populated.
//!
//! # Examples
//!
//! ```
//! use versioned_media::form;
//!
//! let tree = form::decode_str("a=1&b[]=2&b[a]=3&b[]=4&c.a[b]=5", false).unwrap();
//! assert_eq!(
//!     tree.get("b").and_then(|b| b.get("1")).and_then(|n| n.as_scalar()),
//!     Some("4")
//! );
//!
//! let flat = form::encode(&tree, false).unwrap();
//! assert_eq!(flat, "a=1&b[0]=2&b[a]=3&b[1]=4&c[a][b]=5");
//! ```
//!
//! Scalars are always strings; numeric or boolean interpretation is the
//! caller's concern.

mod codec;
pub mod encoding;

pub use codec::{decode_pairs, decode_str, encode, parse_path, FormUrlDecoder, PathSegment};

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A node in a decoded form tree.
///
/// Objects preserve insertion order. Equality (`PartialEq`) is strict;
/// [`FormNode::structural_eq`] additionally treats a `List` as equal to an
/// `Object` keyed `"0".."len-1"`, which is the shape [`decode_pairs`]
/// necessarily produces for list-like input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormNode {
    Scalar(String),
    Object(IndexMap<String, FormNode>),
    List(Vec<FormNode>),
}

impl FormNode {
    /// A scalar leaf.
    pub fn scalar(value: impl Into<String>) -> Self {
        FormNode::Scalar(value.into())
    }

    /// An object node from an ordered list of entries.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, FormNode)>) -> Self {
        FormNode::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// An empty object node (the root shape of every decode).
    pub fn empty_object() -> Self {
        FormNode::Object(IndexMap::new())
    }

    /// A list node.
    pub fn list(items: impl IntoIterator<Item = FormNode>) -> Self {
        FormNode::List(items.into_iter().collect())
    }

    /// Child lookup by key (objects only).
    pub fn get(&self, key: &str) -> Option<&FormNode> {
        match self {
            FormNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// The scalar value, if this is a leaf.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FormNode::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The object entries, if this is an object.
    pub fn as_object(&self) -> Option<&IndexMap<String, FormNode>> {
        match self {
            FormNode::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Structural equality: strict equality plus list/object
    /// interchangeability for objects keyed `"0".."len-1"` in order.
    pub fn structural_eq(&self, other: &FormNode) -> bool {
        match (self, other) {
            (FormNode::Scalar(a), FormNode::Scalar(b)) => a == b,
            (FormNode::Object(a), FormNode::Object(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                        ka == kb && va.structural_eq(vb)
                    })
            }
            (FormNode::List(a), FormNode::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.structural_eq(y))
            }
            (FormNode::List(items), FormNode::Object(map))
            | (FormNode::Object(map), FormNode::List(items)) => {
                items.len() == map.len()
                    && map.iter().enumerate().all(|(i, (key, value))| {
                        key == &i.to_string() && value.structural_eq(&items[i])
                    })
            }
            _ => false,
        }
    }
}

impl Serialize for FormNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormNode::Scalar(value) => serializer.serialize_str(value),
            FormNode::Object(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    ser.serialize_entry(key, value)?;
                }
                ser.end()
            }
            FormNode::List(items) => {
                let mut ser = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    ser.serialize_element(item)?;
                }
                ser.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let tree = FormNode::object([
            ("a", FormNode::scalar("1")),
            ("b", FormNode::list([FormNode::scalar("2")])),
        ]);
        assert_eq!(tree.get("a").and_then(FormNode::as_scalar), Some("1"));
        assert!(tree.get("b").unwrap().as_scalar().is_none());
        assert!(tree.get("missing").is_none());
        assert!(FormNode::scalar("x").get("a").is_none());
    }

    #[test]
    fn test_serialize_to_json_value() {
        let tree = FormNode::object([
            ("a", FormNode::scalar("1")),
            (
                "b",
                FormNode::object([("0", FormNode::scalar("2")), ("a", FormNode::scalar("3"))]),
            ),
            ("c", FormNode::list([FormNode::scalar("4")])),
        ]);
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            serde_json::json!({"a": "1", "b": {"0": "2", "a": "3"}, "c": ["4"]})
        );
    }

    #[test]
    fn test_structural_eq_list_object() {
        let list = FormNode::list([FormNode::scalar("x"), FormNode::scalar("y")]);
        let indexed = FormNode::object([("0", FormNode::scalar("x")), ("1", FormNode::scalar("y"))]);
        let shuffled = FormNode::object([("1", FormNode::scalar("y")), ("0", FormNode::scalar("x"))]);

        assert!(list.structural_eq(&indexed));
        assert!(indexed.structural_eq(&list));
        assert!(!list.structural_eq(&shuffled));
        assert_ne!(list, indexed);
    }

    #[test]
    fn test_structural_eq_ordering_matters() {
        let a = FormNode::object([("x", FormNode::scalar("1")), ("y", FormNode::scalar("2"))]);
        let b = FormNode::object([("y", FormNode::scalar("2")), ("x", FormNode::scalar("1"))]);
        assert!(!a.structural_eq(&b));
    }
}
