//! Session document restore.
//!
//! Two passes over the document:
//! 1. Instantiate every node through the registry in canonical order,
//!    rebuilding owner/list links and `isHide`, and map `$id -> ComponentId`.
//! 2. Decode fields against each node's descriptor table. `{"$ref": n}` is
//!    resolved through the position map, so forward references work.
//!
//! Missing fields keep the type's default, except lists which become empty.

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, trace};

use crate::config::EngineOptions;
use crate::descriptor::{FieldDescriptor, FieldKind};
use crate::document::{RefValue, SessionDocument, SessionNode};
use crate::error::{Result, StateError};
use crate::node::{ComponentGraph, ComponentId};
use crate::registry::ComponentRegistry;
use crate::value::{write_fields, AnyValue, FieldSet, FieldValue};

/// A graph rebuilt from a session document.
#[derive(Debug)]
pub struct RestoredGraph {
    pub graph: ComponentGraph,
    pub root: ComponentId,
    positions: HashMap<usize, ComponentId>,
}

impl RestoredGraph {
    /// Node restored from a given document position.
    pub fn node_at(&self, position: usize) -> Option<ComponentId> {
        self.positions.get(&position).copied()
    }
}

/// Rebuild the component graph described by `doc`.
pub fn deserialize(
    doc: &SessionDocument,
    registry: &ComponentRegistry,
    options: &EngineOptions,
) -> Result<RestoredGraph> {
    let mut graph = ComponentGraph::new();
    let mut positions: HashMap<usize, ComponentId> = HashMap::new();
    let mut created: Vec<(ComponentId, &SessionNode)> = Vec::new();

    // Pass 1: nodes and ownership
    let mut stack: Vec<(&SessionNode, Option<ComponentId>, usize)> = vec![(&doc.root, None, 0)];
    while let Some((node, owner, depth)) = stack.pop() {
        if depth > options.max_depth {
            return Err(StateError::DepthExceeded {
                max_depth: options.max_depth,
            });
        }
        let state = registry.create(&node.type_name)?;
        let id = graph.add_boxed(owner, state)?;
        if node.is_hide {
            graph.set_hide(id, true)?;
        }
        if positions.insert(node.id, id).is_some() {
            return Err(StateError::DuplicatePosition(node.id));
        }
        created.push((id, node));

        for child in node.list.iter().rev() {
            stack.push((child, Some(id), depth + 1));
        }
    }

    // Pass 2: fields
    let decoder = FieldDecoder {
        positions: &positions,
    };
    for (id, node) in &created {
        let state = graph
            .state_mut(*id)
            .ok_or(StateError::UnknownComponent(*id))?;
        let type_name = state.type_name();
        let fields = decoder.decode_fields(type_name, state.descriptors(), &node.fields, "")?;
        trace!(node = %id, type_name, fields = fields.len(), "restored fields");
        write_fields(state, fields)?;
    }

    let root = created
        .first()
        .map(|(id, _)| *id)
        .ok_or(StateError::UnknownComponent(ComponentId::from_raw(0)))?;
    debug!(root = %root, nodes = created.len(), "restored component graph");
    Ok(RestoredGraph {
        graph,
        root,
        positions,
    })
}

struct FieldDecoder<'a> {
    positions: &'a HashMap<usize, ComponentId>,
}

impl FieldDecoder<'_> {
    fn decode_fields(
        &self,
        type_name: &str,
        table: &[FieldDescriptor],
        json: &JsonMap<String, JsonValue>,
        prefix: &str,
    ) -> Result<FieldSet> {
        let mut fields = FieldSet::new();

        for descriptor in table {
            let path = format!("{}{}", prefix, descriptor.name);
            let value = json.get(descriptor.name);

            let decoded = match (&descriptor.kind, value) {
                (FieldKind::List, None | Some(JsonValue::Null)) => {
                    Some(FieldValue::Scalar(JsonValue::Array(Vec::new())))
                }
                (_, None) => None,
                (FieldKind::ReferenceList, Some(_)) => {
                    return Err(StateError::ReferenceList {
                        type_name: type_name.to_string(),
                        field: path,
                    });
                }
                (FieldKind::Scalar | FieldKind::List | FieldKind::Row, Some(json)) => {
                    Some(FieldValue::Scalar(json.clone()))
                }
                (FieldKind::Reference, Some(json)) => {
                    Some(FieldValue::Reference(self.resolve(type_name, &path, json)?))
                }
                (FieldKind::Any, Some(json)) => {
                    let any: AnyValue = serde_json::from_value(json.clone())
                        .map_err(|e| StateError::field_type(type_name, &path, e))?;
                    Some(FieldValue::Any(any))
                }
                (FieldKind::Dto(_), Some(JsonValue::Null)) => Some(FieldValue::Dto(None)),
                (FieldKind::Dto(dto_table), Some(JsonValue::Object(nested))) => {
                    let nested_prefix = format!("{}.", path);
                    let nested =
                        self.decode_fields(type_name, dto_table(), nested, &nested_prefix)?;
                    Some(FieldValue::Dto(Some(nested)))
                }
                (FieldKind::Dto(_), Some(other)) => {
                    return Err(StateError::field_type(
                        type_name,
                        &path,
                        format!("expected object or null, found {}", other),
                    ));
                }
            };

            if let Some(decoded) = decoded {
                fields.push((descriptor.name, decoded));
            }
        }

        for key in json.keys() {
            if !table.iter().any(|descriptor| descriptor.name == key) {
                trace!(type_name, field = %key, "ignoring unknown field in session document");
            }
        }

        Ok(fields)
    }

    fn resolve(&self, type_name: &str, path: &str, json: &JsonValue) -> Result<Option<ComponentId>> {
        if json.is_null() {
            return Ok(None);
        }
        let reference = RefValue::from_json(json).ok_or_else(|| {
            StateError::field_type(type_name, path, format!("expected {{\"$ref\": n}}, found {}", json))
        })?;
        self.positions
            .get(&reference.position)
            .copied()
            .map(Some)
            .ok_or_else(|| StateError::DanglingReference {
                field: path.to_string(),
                position: reference.position,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, ComponentId, Dto};
    use serde_json::json;

    #[derive(Dto, Default)]
    struct Detail {
        caption: String,
        selected: Option<ComponentId>,
    }

    #[derive(Component, Default)]
    struct Page {
        title: String,
        target: Option<ComponentId>,
        #[state(dto)]
        detail: Option<Detail>,
        tags: Option<Vec<String>>,
    }

    #[derive(Component, Default)]
    struct Label {
        text: String,
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new().with::<Page>().with::<Label>()
    }

    fn doc(value: JsonValue) -> SessionDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_restores_tree_and_forward_references() {
        let doc = doc(json!({
            "root": {
                "$id": 0,
                "$type": "Page",
                "fields": {
                    "title": "home",
                    "target": {"$ref": 2},
                    "detail": {"caption": "c", "selected": {"$ref": 0}}
                },
                "list": [
                    {"$id": 1, "$type": "Label", "fields": {"text": "one"}},
                    {"$id": 2, "$type": "Label", "isHide": true}
                ]
            }
        }));

        let restored = deserialize(&doc, &registry(), &EngineOptions::default()).unwrap();
        let graph = &restored.graph;
        let root = restored.root;
        let children = graph.list(root).to_vec();
        assert_eq!(children.len(), 2);
        assert!(graph.is_hide(children[1]));
        assert_eq!(graph.get::<Label>(children[0]).unwrap().text, "one");

        let page = graph.get::<Page>(root).unwrap();
        assert_eq!(page.title, "home");
        assert_eq!(page.target, Some(children[1]));
        let detail = page.detail.as_ref().unwrap();
        assert_eq!(detail.selected, Some(root));
        // absent list normalized to empty
        assert_eq!(page.tags, Some(Vec::new()));
        assert_eq!(restored.node_at(2), Some(children[1]));
    }

    #[test]
    fn test_dangling_reference() {
        let doc = doc(json!({
            "root": {"$id": 0, "$type": "Page", "fields": {"target": {"$ref": 7}}}
        }));
        let err = deserialize(&doc, &registry(), &EngineOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            StateError::DanglingReference { ref field, position: 7 } if field == "target"
        ));
    }

    #[test]
    fn test_duplicate_position() {
        let doc = doc(json!({
            "root": {"$id": 0, "$type": "Page", "list": [{"$id": 0, "$type": "Label"}]}
        }));
        let err = deserialize(&doc, &registry(), &EngineOptions::default()).unwrap_err();
        assert!(matches!(err, StateError::DuplicatePosition(0)));
    }

    #[test]
    fn test_unknown_type() {
        let doc = doc(json!({"root": {"$id": 0, "$type": "Chart"}}));
        let err = deserialize(&doc, &registry(), &EngineOptions::default()).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_TYPE");
    }

    #[test]
    fn test_malformed_reference() {
        let doc = doc(json!({
            "root": {"$id": 0, "$type": "Page", "fields": {"target": 3}}
        }));
        let err = deserialize(&doc, &registry(), &EngineOptions::default()).unwrap_err();
        assert_eq!(err.code(), "FIELD_TYPE");
    }

    #[test]
    fn test_depth_limit() {
        let doc = doc(json!({
            "root": {"$id": 0, "$type": "Page", "list": [
                {"$id": 1, "$type": "Page", "list": [{"$id": 2, "$type": "Label"}]}
            ]}
        }));
        let options = EngineOptions::default().with_max_depth(1);
        let err = deserialize(&doc, &registry(), &options).unwrap_err();
        assert!(matches!(err, StateError::DepthExceeded { max_depth: 1 }));
    }
}
