//! Flat key/value pairs to tree conversion and back.
//!
//! Decoding walks each key's bracket/dot path from the root object,
//! creating intermediate objects for non-terminal segments and writing the
//! value at the terminal segment. Path splitting happens on the *raw* key,
//! before percent-decoding, so a percent-encoded bracket (`a%5Bb%5D`)
//! stays a literal part of a segment name instead of opening a path level.
//!
//! When a scalar and a nested object collide at the same key the later
//! write wins, in both directions. Last write wins regardless of which
//! shape came first, so decoding is order-deterministic.

use indexmap::IndexMap;

use crate::error::{Result, VersionedError};
use crate::form::{encoding, FormNode};
use crate::negotiate::MapDecoder;

/// One segment of a bracket/dot key path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A named key.
    Named(String),
    /// An empty segment (`[]`, or an empty dot segment): resolves to a
    /// synthetic numeric key counted per populated object.
    Append,
}

/// Split a raw key into its path segments.
///
/// Grammar: `segment ("." segment | "[" segment "]")*`. Segments are
/// whitespace-trimmed; an empty segment is an [`PathSegment::Append`]
/// marker. A stray `]` or an unterminated `[` is
/// [`VersionedError::MalformedInput`].
///
/// # Examples
///
/// ```
/// use versioned_media::form::{parse_path, PathSegment};
///
/// let path = parse_path("a[b].c").unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path[2], PathSegment::Named("c".into()));
/// assert_eq!(parse_path("a[]").unwrap()[1], PathSegment::Append);
/// ```
pub fn parse_path(key: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut bracketed = false;
    let mut chars = key.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '[' if !bracketed => {
                bracketed = true;
                segments.push(segment(std::mem::take(&mut current)));
            }
            ']' if bracketed => {
                bracketed = false;
                segments.push(segment(std::mem::take(&mut current)));
                // A dot straight after a closing bracket is just a
                // separator: `a[b].c` and `a[b][c]` are the same path.
                if chars.peek() == Some(&'.') {
                    chars.next();
                }
            }
            ']' => {
                return Err(VersionedError::MalformedInput(format!(
                    "stray ']' in key '{key}'"
                )))
            }
            '.' if !bracketed => {
                segments.push(segment(std::mem::take(&mut current)));
            }
            other => current.push(other),
        }
    }
    if bracketed {
        return Err(VersionedError::MalformedInput(format!(
            "unterminated '[' in key '{key}'"
        )));
    }
    if !current.trim().is_empty() {
        segments.push(segment(current));
    }
    Ok(segments)
}

fn segment(raw: String) -> PathSegment {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        PathSegment::Append
    } else {
        PathSegment::Named(trimmed.to_string())
    }
}

/// Decode an ordered sequence of raw key/value pairs into a tree.
///
/// `encoded` declares the payload pre-decoded wire form: when `true`,
/// keys and values are taken verbatim; when `false` (the normal case),
/// segment names and values are percent-decoded.
pub fn decode_pairs<K, V>(
    pairs: impl IntoIterator<Item = (K, V)>,
    encoded: bool,
) -> Result<FormNode>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut root = ObjectBuilder::default();
    for (raw_key, raw_value) in pairs {
        let raw_key = raw_key.as_ref();
        let mut path = parse_path(raw_key)?;
        if path.is_empty() {
            tracing::debug!(key = raw_key, "dropping pair with empty key path");
            continue;
        }
        let value = if encoded {
            raw_value.as_ref().to_string()
        } else {
            for seg in &mut path {
                if let PathSegment::Named(name) = seg {
                    *name = encoding::decode(name)?;
                }
            }
            encoding::decode(raw_value.as_ref())?
        };
        root.insert(&path, value);
    }
    Ok(root.build())
}

/// Decode an `&`-joined query string into a tree.
///
/// A pair without `=` gets an empty value; empty input yields an empty
/// object root.
pub fn decode_str(query: &str, encoded: bool) -> Result<FormNode> {
    let pairs = query.split('&').filter(|p| !p.is_empty()).map(|param| {
        match param.split_once('=') {
            Some((key, value)) => (key, value),
            None => (param, ""),
        }
    });
    decode_pairs(pairs, encoded)
}

/// Encode a tree back into an `&`-joined query string.
///
/// Objects contribute `parent[child]=...`, lists `parent[index]=...`,
/// scalars `parent=value`. The root must be an object. Keys and values are
/// percent-encoded unless `encoded` declares the tree already in wire
/// form; the bracket/dot path punctuation itself is never escaped, and a
/// literal `.` inside a key is escaped as `%2E` so it survives the
/// decode-side path split.
pub fn encode(root: &FormNode, encoded: bool) -> Result<String> {
    let FormNode::Object(map) = root else {
        return Err(VersionedError::MalformedInput(
            "form root must be an object".to_string(),
        ));
    };
    let mut parts = Vec::new();
    for (key, value) in map {
        collect(&key_component(key, encoded), value, encoded, &mut parts);
    }
    Ok(parts.join("&"))
}

fn collect(prefix: &str, node: &FormNode, encoded: bool, out: &mut Vec<String>) {
    match node {
        FormNode::Scalar(value) => out.push(format!("{prefix}={}", component(value, encoded))),
        FormNode::Object(map) => {
            for (key, value) in map {
                collect(
                    &format!("{prefix}[{}]", key_component(key, encoded)),
                    value,
                    encoded,
                    out,
                );
            }
        }
        FormNode::List(items) => {
            for (index, item) in items.iter().enumerate() {
                collect(&format!("{prefix}[{index}]"), item, encoded, out);
            }
        }
    }
}

fn component(raw: &str, encoded: bool) -> String {
    if encoded {
        raw.to_string()
    } else {
        encoding::encode(raw)
    }
}

fn key_component(raw: &str, encoded: bool) -> String {
    if encoded {
        raw.to_string()
    } else {
        encoding::encode_key(raw)
    }
}

/// Incremental tree builder. Append counters live here, per object, so the
/// finished [`FormNode`] stays a plain value type.
#[derive(Default)]
struct ObjectBuilder {
    entries: IndexMap<String, Slot>,
    next_append: usize,
}

enum Slot {
    Scalar(String),
    Object(ObjectBuilder),
}

impl ObjectBuilder {
    fn insert(&mut self, path: &[PathSegment], value: String) {
        let mut node = self;
        for (i, seg) in path.iter().enumerate() {
            let key = match seg {
                PathSegment::Named(name) => name.clone(),
                PathSegment::Append => {
                    let key = node.next_append.to_string();
                    node.next_append += 1;
                    key
                }
            };
            if i == path.len() - 1 {
                node.entries.insert(key, Slot::Scalar(value));
                return;
            }
            let slot = node
                .entries
                .entry(key)
                .or_insert_with(|| Slot::Object(ObjectBuilder::default()));
            if matches!(slot, Slot::Scalar(_)) {
                *slot = Slot::Object(ObjectBuilder::default());
            }
            node = match slot {
                Slot::Object(builder) => builder,
                Slot::Scalar(_) => unreachable!("scalar slot replaced above"),
            };
        }
    }

    fn build(self) -> FormNode {
        FormNode::Object(
            self.entries
                .into_iter()
                .map(|(key, slot)| {
                    let node = match slot {
                        Slot::Scalar(value) => FormNode::Scalar(value),
                        Slot::Object(builder) => builder.build(),
                    };
                    (key, node)
                })
                .collect(),
        )
    }
}

/// [`MapDecoder`] over the hierarchical form codec.
///
/// Plugs into the negotiator as the generic map decoder for types with the
/// custom-consume capability. An empty body decodes to an empty root
/// object, matching a zero Content-Length request.
#[derive(Clone, Debug, Default)]
pub struct FormUrlDecoder {
    pre_encoded: bool,
}

impl FormUrlDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat bodies as already percent-decoded.
    pub fn pre_encoded() -> Self {
        Self { pre_encoded: true }
    }
}

impl MapDecoder for FormUrlDecoder {
    fn decode(&self, body: &[u8]) -> Result<FormNode> {
        if body.is_empty() {
            return Ok(FormNode::empty_object());
        }
        let text = String::from_utf8(body.to_vec())?;
        decode_str(&text, self.pre_encoded)
    }
}
