//! Session and client documents.
//!
//! Both documents are trees mirroring the ownership tree. Nodes carry their
//! canonical position instead of an owner link; node-to-node references in
//! the session document use `{ "$ref": <position> }`.
//!
//! ```text
//! SessionDocument                      ClientDocument
//! └── root                             └── root (null when hidden)
//!     ├── $id, $type, isHide               ├── id, type
//!     ├── fields { name -> value }         ├── fields (client policy, no refs)
//!     └── list [ SessionNode ... ]         └── list (visible nodes only)
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::{Result, StateError};

/// JSON nesting allowed inside one node's field values.
pub const FIELD_NESTING_LIMIT: usize = 128;

/// Positional pointer to another node of the same session document.
///
/// Serializes as: `{ "$ref": 3 }`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefValue {
    #[serde(rename = "$ref")]
    pub position: usize,
}

impl RefValue {
    pub fn new(position: usize) -> Self {
        Self { position }
    }

    /// Parse a `{"$ref": n}` object; anything else is `None`.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 1 {
            return None;
        }
        let position = map.get("$ref")?.as_u64()?;
        usize::try_from(position).ok().map(Self::new)
    }

    pub fn to_json(self) -> JsonValue {
        let mut map = JsonMap::new();
        map.insert("$ref".to_string(), JsonValue::from(self.position));
        JsonValue::Object(map)
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Full-fidelity document persisted between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub root: SessionNode,
}

/// One node of the session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionNode {
    /// Canonical position.
    #[serde(rename = "$id")]
    pub id: usize,
    #[serde(rename = "$type")]
    pub type_name: String,
    #[serde(rename = "isHide", default, skip_serializing_if = "is_false")]
    pub is_hide: bool,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub fields: JsonMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<SessionNode>,
}

/// Reduced document sent to the renderer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientDocument {
    /// `None` when the root itself is hidden.
    #[serde(default)]
    pub root: Option<ClientNode>,
}

/// One visible node of the client document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientNode {
    pub id: usize,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub fields: JsonMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list: Vec<ClientNode>,
}

impl SessionDocument {
    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    /// Parse a session document no deeper than [`DEFAULT_MAX_DEPTH`].
    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_json_str_with_depth(s, DEFAULT_MAX_DEPTH)
    }

    /// Parse a session document whose tree is at most `max_depth` levels deep.
    pub fn from_json_str_with_depth(s: &str, max_depth: usize) -> Result<Self> {
        parse_bounded(s, max_depth)
    }

    /// SHA-256 of the compact JSON form, hex encoded.
    pub fn fingerprint(&self) -> Result<String> {
        fingerprint_of(self)
    }

    /// Nodes in canonical order.
    pub fn nodes(&self) -> Vec<&SessionNode> {
        let mut out = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.list.iter().rev());
        }
        out
    }

    pub fn find(&self, position: usize) -> Option<&SessionNode> {
        self.nodes().into_iter().find(|node| node.id == position)
    }
}

impl ClientDocument {
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn to_json_string(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_json_str_with_depth(s, DEFAULT_MAX_DEPTH)
    }

    pub fn from_json_str_with_depth(s: &str, max_depth: usize) -> Result<Self> {
        parse_bounded(s, max_depth)
    }

    pub fn fingerprint(&self) -> Result<String> {
        fingerprint_of(self)
    }

    /// Visible nodes in canonical order.
    pub fn nodes(&self) -> Vec<&ClientNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&ClientNode> = self.root.iter().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.list.iter().rev());
        }
        out
    }

    pub fn find(&self, position: usize) -> Option<&ClientNode> {
        self.nodes().into_iter().find(|node| node.id == position)
    }
}

// Object keys come out sorted (serde_json's default map), so equal
// documents always hash equal.
fn fingerprint_of<T: Serialize>(doc: &T) -> Result<String> {
    let bytes = serde_json::to_vec(doc)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// JSON nesting of a document whose tree is `max_depth` levels deep: the
/// outer object, then a node object plus its `list` array per level, then
/// the deepest node's field values.
fn nesting_limit(max_depth: usize) -> usize {
    max_depth
        .saturating_mul(2)
        .saturating_add(3)
        .saturating_add(FIELD_NESTING_LIMIT)
}

/// Parse with serde_json's fixed recursion limit lifted; the nesting is
/// checked up front against `max_depth` instead.
fn parse_bounded<T: DeserializeOwned>(s: &str, max_depth: usize) -> Result<T> {
    if exceeds_nesting(s, nesting_limit(max_depth)) {
        return Err(StateError::DepthExceeded { max_depth });
    }
    let mut de = serde_json::Deserializer::from_str(s);
    de.disable_recursion_limit();
    let value = T::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

/// True when brackets nest deeper than `limit` (string contents skipped).
fn exceeds_nesting(s: &str, limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in s.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_ref_value_serialization() {
        let json = serde_json::to_string(&RefValue::new(4)).unwrap();
        assert_eq!(json, r#"{"$ref":4}"#);
        assert_eq!(RefValue::new(4).to_json(), json!({"$ref": 4}));
    }

    #[test]
    fn test_ref_value_from_json() {
        assert_eq!(RefValue::from_json(&json!({"$ref": 2})), Some(RefValue::new(2)));
        assert_eq!(RefValue::from_json(&json!({"$ref": "2"})), None);
        assert_eq!(RefValue::from_json(&json!({"$ref": 2, "x": 1})), None);
        assert_eq!(RefValue::from_json(&json!(2)), None);
    }

    #[test]
    fn test_session_node_wire_shape() {
        let doc = SessionDocument {
            root: SessionNode {
                id: 0,
                type_name: "Page".into(),
                is_hide: false,
                fields: JsonMap::new(),
                list: vec![SessionNode {
                    id: 1,
                    type_name: "Label".into(),
                    is_hide: true,
                    fields: json!({"text": "x"}).as_object().cloned().unwrap(),
                    list: Vec::new(),
                }],
            },
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "root": {
                    "$id": 0,
                    "$type": "Page",
                    "list": [
                        {"$id": 1, "$type": "Label", "isHide": true, "fields": {"text": "x"}}
                    ]
                }
            })
        );

        let parsed = SessionDocument::from_json_str(&doc.to_json_string(true).unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.find(1).unwrap().type_name, "Label");
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let doc = |text: &str| SessionDocument {
            root: SessionNode {
                id: 0,
                type_name: "Label".into(),
                is_hide: false,
                fields: json!({"text": text, "a": 1}).as_object().cloned().unwrap(),
                list: Vec::new(),
            },
        };
        let first = doc("x").fingerprint().unwrap();
        assert_eq!(first, doc("x").fingerprint().unwrap());
        assert_ne!(first, doc("y").fingerprint().unwrap());
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_nesting_scan_skips_strings() {
        assert!(!exceeds_nesting(r#"{"a": "[[[[[[", "b": "\"{{{{"}"#, 1));
        assert!(exceeds_nesting(r#"{"a": [[1]]}"#, 2));
        assert!(!exceeds_nesting(r#"{"a": [[1]]}"#, 3));
    }

    #[test]
    fn test_deep_document_parses_within_limit() {
        // node objects nested through `list`, 100 levels below the root
        let depth = 100;
        let mut text = String::new();
        text.push_str(r#"{"root":"#);
        for i in 0..depth {
            text.push_str(&format!(r#"{{"$id":{},"$type":"Label","list":["#, i));
        }
        text.push_str(&format!(r#"{{"$id":{},"$type":"Label"}}"#, depth));
        for _ in 0..depth {
            text.push_str("]}");
        }
        text.push('}');

        let doc = SessionDocument::from_json_str_with_depth(&text, depth).unwrap();
        assert_eq!(doc.nodes().len(), depth + 1);

        let err = SessionDocument::from_json_str_with_depth(&text, 10).unwrap_err();
        assert!(matches!(err, StateError::DepthExceeded { max_depth: 10 }));
    }

    #[test]
    fn test_empty_client_document() {
        let doc = ClientDocument::default();
        assert!(doc.is_empty());
        assert_eq!(doc.to_json_string(false).unwrap(), r#"{"root":null}"#);
        assert!(doc.nodes().is_empty());
    }
}
