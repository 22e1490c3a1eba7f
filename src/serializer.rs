//! Dual-target serializer.
//!
//! One walk, two documents. Per field kind:
//! - Scalar / Row: policy-gated value (`null` kept in session, dropped on client)
//! - List: policy-gated; null or empty lists are absent
//! - Reference: session always keeps `{"$ref": n}` (or `null`), client never
//! - Reference list: rejected
//! - Any: session keeps the tagged value; a row may not go to the client
//! - Dto: policy-gated object of its own policy-gated fields; a Dto the
//!   session excludes still carries its references there

use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;

use crate::config::EngineOptions;
use crate::descriptor::{find_descriptor, FieldDescriptor, FieldKind};
use crate::document::{ClientDocument, ClientNode, RefValue, SessionDocument, SessionNode};
use crate::error::{Result, StateError};
use crate::node::{ComponentGraph, ComponentId};
use crate::policy::Target;
use crate::value::{AnyValue, FieldSet, FieldValue};
use crate::walker::GraphWalk;

/// Output of one serialization call.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    pub session: SessionDocument,
    pub client: ClientDocument,
}

/// Serialize the graph rooted at `root`.
pub fn serialize(
    graph: &ComponentGraph,
    root: ComponentId,
    options: &EngineOptions,
) -> Result<Serialized> {
    serialize_entries(graph, &[root], options)
}

/// Serialize the single graph reached from `entries`.
pub fn serialize_entries(
    graph: &ComponentGraph,
    entries: &[ComponentId],
    options: &EngineOptions,
) -> Result<Serialized> {
    let walk = GraphWalk::walk_entries(graph, entries, options.max_depth)?;
    let emitter = Emitter {
        graph,
        walk: &walk,
    };

    let session_root = emitter.session_tree()?;
    let session = SessionDocument {
        root: session_root.ok_or(StateError::UnknownComponent(walk.root()))?,
    };
    let client = ClientDocument {
        root: emitter.client_tree()?,
    };

    debug!(
        root = %walk.root(),
        session_nodes = walk.len(),
        client_nodes = client.nodes().len(),
        "serialized component graph"
    );
    Ok(Serialized { session, client })
}

struct Emitter<'a> {
    graph: &'a ComponentGraph,
    walk: &'a GraphWalk,
}

impl Emitter<'_> {
    fn session_tree(&self) -> Result<Option<SessionNode>> {
        let mut nodes = Vec::with_capacity(self.walk.len());
        for walked in self.walk.nodes() {
            let state = self
                .graph
                .state(walked.id)
                .ok_or(StateError::UnknownComponent(walked.id))?;
            let fields = self.emit_fields(
                walked.id,
                state.type_name(),
                state.descriptors(),
                &walked.fields,
                Target::Session,
                "",
                false,
            )?;
            let node = SessionNode {
                id: walked.position,
                type_name: state.type_name().to_string(),
                is_hide: self.graph.is_hide(walked.id),
                fields,
                list: Vec::new(),
            };
            nodes.push((walked.depth, node));
        }
        Ok(assemble(nodes, |owner: &mut SessionNode, child| {
            owner.list.push(child)
        }))
    }

    fn client_tree(&self) -> Result<Option<ClientNode>> {
        let mut nodes = Vec::new();
        // a hidden node hides its whole subtree, so depths stay contiguous
        for walked in self.walk.nodes().iter().filter(|n| n.client_visible) {
            let state = self
                .graph
                .state(walked.id)
                .ok_or(StateError::UnknownComponent(walked.id))?;
            let fields = self.emit_fields(
                walked.id,
                state.type_name(),
                state.descriptors(),
                &walked.fields,
                Target::Client,
                "",
                false,
            )?;
            let node = ClientNode {
                id: walked.position,
                type_name: state.type_name().to_string(),
                fields,
                list: Vec::new(),
            };
            nodes.push((walked.depth, node));
        }
        Ok(assemble(nodes, |owner: &mut ClientNode, child| {
            owner.list.push(child)
        }))
    }

    /// Emit `fields` for `target`. With `refs_only` set, only references
    /// (and Dtos holding them) are written; used for Dtos the session
    /// policy excludes so their aliases still survive a restore.
    #[allow(clippy::too_many_arguments)]
    fn emit_fields(
        &self,
        node: ComponentId,
        type_name: &str,
        table: &[FieldDescriptor],
        fields: &FieldSet,
        target: Target,
        prefix: &str,
        refs_only: bool,
    ) -> Result<JsonMap<String, JsonValue>> {
        let mut out = JsonMap::new();

        for (name, value) in fields {
            let path = format!("{}{}", prefix, name);
            let descriptor = find_descriptor(table, name).ok_or_else(|| {
                StateError::UnknownField {
                    type_name: type_name.to_string(),
                    field: path.clone(),
                }
            })?;

            // reference kinds are handled independent of policy
            match (&descriptor.kind, value) {
                (FieldKind::ReferenceList, _) | (_, FieldValue::ReferenceList(_)) => {
                    return Err(StateError::ReferenceList {
                        type_name: type_name.to_string(),
                        field: path,
                    });
                }
                (_, FieldValue::Reference(target_id)) => {
                    if target == Target::Session {
                        let json = target_id
                            .and_then(|t| self.walk.position_of(t))
                            .map(|position| RefValue::new(position).to_json())
                            .unwrap_or(JsonValue::Null);
                        out.insert(name.to_string(), json);
                    }
                    continue;
                }
                _ => {}
            }

            let included = !refs_only && descriptor.policy.includes(target);
            if !included {
                if let (Target::Session, FieldKind::Dto(dto_table), FieldValue::Dto(Some(nested))) =
                    (target, &descriptor.kind, value)
                {
                    let nested_prefix = format!("{}.", path);
                    let map = self.emit_fields(
                        node,
                        type_name,
                        dto_table(),
                        nested,
                        target,
                        &nested_prefix,
                        true,
                    )?;
                    if !map.is_empty() {
                        out.insert(name.to_string(), JsonValue::Object(map));
                    }
                }
                continue;
            }

            let emitted = match (&descriptor.kind, value) {
                (FieldKind::List, FieldValue::Scalar(json)) => match json {
                    JsonValue::Null => None,
                    JsonValue::Array(items) if items.is_empty() => None,
                    other => Some(other.clone()),
                },
                (_, FieldValue::Scalar(JsonValue::Null)) => match target {
                    Target::Session => Some(JsonValue::Null),
                    Target::Client => None,
                },
                (_, FieldValue::Scalar(json)) => Some(json.clone()),
                (_, FieldValue::Any(any)) => self.emit_any(node, any, target, &path)?,
                (FieldKind::Dto(dto_table), FieldValue::Dto(dto)) => match dto {
                    Some(nested) => {
                        let nested_prefix = format!("{}.", path);
                        let map = self.emit_fields(
                            node,
                            type_name,
                            dto_table(),
                            nested,
                            target,
                            &nested_prefix,
                            false,
                        )?;
                        Some(JsonValue::Object(map))
                    }
                    None => match target {
                        Target::Session => Some(JsonValue::Null),
                        Target::Client => None,
                    },
                },
                (kind, other) => {
                    return Err(StateError::field_type(
                        type_name,
                        &path,
                        format!(
                            "descriptor kind {} does not match {} value",
                            kind.as_str(),
                            other.kind_name()
                        ),
                    ));
                }
            };

            if let Some(json) = emitted {
                out.insert(name.to_string(), json);
            }
        }

        Ok(out)
    }

    fn emit_any(
        &self,
        node: ComponentId,
        any: &AnyValue,
        target: Target,
        path: &str,
    ) -> Result<Option<JsonValue>> {
        match target {
            Target::Session => Ok(Some(serde_json::to_value(any)?)),
            Target::Client => match any {
                AnyValue::Empty => Ok(None),
                AnyValue::Value(json) => Ok(Some(json.clone())),
                AnyValue::Row(_) => Err(StateError::RowToClient {
                    node,
                    field: path.to_string(),
                }),
            },
        }
    }
}

/// Build a tree from nodes in pre-order paired with their depth.
///
/// Each node stays on the stack until a node at the same or a shallower
/// depth arrives; it is then attached to the node below it.
fn assemble<N>(nodes: Vec<(usize, N)>, attach: impl Fn(&mut N, N)) -> Option<N> {
    let mut stack: Vec<(usize, N)> = Vec::new();
    for (depth, node) in nodes {
        fold_down(&mut stack, depth, &attach);
        stack.push((depth, node));
    }
    fold_down(&mut stack, 0, &attach);
    stack.pop().map(|(_, root)| root)
}

fn fold_down<N>(stack: &mut Vec<(usize, N)>, depth: usize, attach: &impl Fn(&mut N, N)) {
    while stack.len() > 1 && stack.last().is_some_and(|(d, _)| *d >= depth) {
        if let Some((_, child)) = stack.pop() {
            if let Some((_, owner)) = stack.last_mut() {
                attach(owner, child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, ComponentId, Dto};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Component, Default)]
    struct Label {
        text: String,
        #[state(session)]
        secret: String,
        #[state(client)]
        css: Option<String>,
        #[state(none)]
        scratch: u32,
    }

    #[derive(Dto, Default)]
    struct Detail {
        caption: String,
        selected: Option<ComponentId>,
    }

    #[derive(Component, Default)]
    struct Page {
        target: Option<ComponentId>,
        #[state(dto)]
        detail: Option<Detail>,
        tags: Option<Vec<String>>,
    }

    #[derive(Component, Default)]
    struct Holder {
        #[state(client, dto)]
        shown: Option<Detail>,
        #[state(none, dto)]
        scratch: Option<Detail>,
    }

    #[test]
    fn test_policy_partition() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Label {
            text: "both".into(),
            secret: "session-only".into(),
            css: Some("client-only".into()),
            scratch: 99,
        });

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        assert_eq!(
            JsonValue::Object(out.session.root.fields.clone()),
            json!({"text": "both", "secret": "session-only"})
        );
        let client_root = out.client.root.unwrap();
        assert_eq!(
            JsonValue::Object(client_root.fields),
            json!({"text": "both", "css": "client-only"})
        );
    }

    #[test]
    fn test_references_only_in_session() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Page::default());
        let child = graph.add(root, Label::default()).unwrap();
        {
            let page = graph.get_mut::<Page>(root).unwrap();
            page.target = Some(child);
            page.detail = Some(Detail {
                caption: "c".into(),
                selected: Some(root),
            });
        }

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        let session = JsonValue::Object(out.session.root.fields.clone());
        assert_eq!(
            session,
            json!({
                "target": {"$ref": 1},
                "detail": {"caption": "c", "selected": {"$ref": 0}}
            })
        );

        let client = JsonValue::Object(out.client.root.unwrap().fields);
        assert_eq!(client, json!({"detail": {"caption": "c"}}));
    }

    #[test]
    fn test_empty_lists_are_absent() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Page {
            tags: Some(Vec::new()),
            ..Default::default()
        });

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        assert!(!out.session.root.fields.contains_key("tags"));
        // absent Dto is null in session, dropped on client
        assert_eq!(out.session.root.fields.get("detail"), Some(&JsonValue::Null));
        assert!(out.client.root.unwrap().fields.is_empty());
    }

    #[test]
    fn test_hidden_root_gives_empty_client() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Label::default());
        graph.add(root, Label::default()).unwrap();
        graph.set_hide(root, true).unwrap();

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        assert!(out.client.is_empty());
        assert!(out.session.root.is_hide);
        assert_eq!(out.session.root.list.len(), 1);
    }

    #[test]
    fn test_session_excluded_dto_keeps_references() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Holder::default());
        let child = graph.add(root, Label::default()).unwrap();
        {
            let holder = graph.get_mut::<Holder>(root).unwrap();
            holder.shown = Some(Detail {
                caption: "visible".into(),
                selected: Some(child),
            });
            holder.scratch = Some(Detail {
                caption: "dropped".into(),
                selected: None,
            });
        }

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        assert_eq!(
            JsonValue::Object(out.session.root.fields.clone()),
            json!({
                "shown": {"selected": {"$ref": 1}},
                "scratch": {"selected": null}
            })
        );
        assert_eq!(
            JsonValue::Object(out.client.root.unwrap().fields),
            json!({"shown": {"caption": "visible"}})
        );
    }

    #[test]
    fn test_deep_chain_builds_nested_documents() {
        let options = EngineOptions::default().with_max_depth(600);
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Label::default());
        let mut owner = root;
        for depth in 1..=500 {
            owner = graph.add(owner, Label::default()).unwrap();
            if depth == 400 {
                graph.set_hide(owner, true).unwrap();
            }
        }

        let out = serialize(&graph, root, &options).unwrap();
        assert_eq!(out.session.nodes().len(), 501);
        assert_eq!(out.client.nodes().len(), 400);

        let mut cursor = &out.session.root;
        let mut depth = 0;
        while let Some(next) = cursor.list.first() {
            assert_eq!(next.id, cursor.id + 1);
            cursor = next;
            depth += 1;
        }
        assert_eq!(depth, 500);
    }

    #[test]
    fn test_siblings_keep_list_order() {
        let mut graph = ComponentGraph::new();
        let root = graph.add_root(Label::default());
        let a = graph.add(root, Label::default()).unwrap();
        graph.add(a, Label::default()).unwrap();
        graph.add(root, Label::default()).unwrap();

        let out = serialize(&graph, root, &EngineOptions::default()).unwrap();
        let ids: Vec<usize> = out.session.root.list.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(out.session.root.list[0].list[0].id, 2);
    }
}
