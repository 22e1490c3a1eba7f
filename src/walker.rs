//! Graph walk and reference validation.
//!
//! The walk produces the canonical enumeration shared by the serializer and
//! the invariant checks:
//! 1. Entry validation (entries must be roots of a single graph)
//! 2. Pre-order DFS over owner -> list, assigning positions (root = 0)
//! 3. Field capture per node, collecting every reference (nodes and Dtos)
//! 4. Reference resolution: in-graph -> position, removed -> absent,
//!    anything else -> violation

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{Result, StateError};
use crate::node::{ComponentGraph, ComponentId};
use crate::value::{read_fields, FieldSet, FieldValue};

/// One node visited by the walk.
#[derive(Debug)]
pub struct WalkedNode {
    pub id: ComponentId,
    /// Canonical position (pre-order index, root = 0).
    pub position: usize,
    pub depth: usize,
    /// False when the node or any owner above it is hidden.
    pub client_visible: bool,
    /// Field values captured once for both documents.
    pub fields: FieldSet,
}

/// How a reference target resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedReference {
    /// Canonical position of the target within the walked graph.
    Position(usize),
    /// Target was removed from the graph; the reference reads as absent.
    Absent,
}

/// A reference field found during the walk.
#[derive(Debug, Clone)]
pub struct ReferenceRecord {
    pub source: ComponentId,
    /// Field path, e.g. `"selection"` or `"detail.selected"`.
    pub field: String,
    pub target: ComponentId,
    pub resolved: ResolvedReference,
}

/// Canonical enumeration of one component graph.
#[derive(Debug)]
pub struct GraphWalk {
    root: ComponentId,
    nodes: Vec<WalkedNode>,
    positions: HashMap<ComponentId, usize>,
    references: Vec<ReferenceRecord>,
}

impl GraphWalk {
    /// Walk the graph rooted at `root`.
    pub fn walk(graph: &ComponentGraph, root: ComponentId, max_depth: usize) -> Result<Self> {
        Self::walk_entries(graph, &[root], max_depth)
    }

    /// Walk the single graph reached from a set of entry nodes.
    pub fn walk_entries(
        graph: &ComponentGraph,
        entries: &[ComponentId],
        max_depth: usize,
    ) -> Result<Self> {
        let root = entry_root(graph, entries)?;

        let mut walk = GraphWalk {
            root,
            nodes: Vec::new(),
            positions: HashMap::new(),
            references: Vec::new(),
        };
        let mut pending: Vec<(ComponentId, String, ComponentId)> = Vec::new();

        // (node, depth, owner visible on client)
        let mut stack: Vec<(ComponentId, usize, bool)> = vec![(root, 0, true)];
        while let Some((id, depth, owner_visible)) = stack.pop() {
            if depth > max_depth {
                return Err(StateError::DepthExceeded { max_depth });
            }
            let state = graph.state(id).ok_or(StateError::UnknownComponent(id))?;

            let client_visible = owner_visible && !graph.is_hide(id);
            if owner_visible && !client_visible {
                trace!(node = %id, "hidden subtree excluded from client document");
            }

            let fields = read_fields(state)?;
            collect_references(id, "", &fields, &mut pending);

            let position = walk.nodes.len();
            walk.positions.insert(id, position);
            walk.nodes.push(WalkedNode {
                id,
                position,
                depth,
                client_visible,
                fields,
            });

            for child in graph.list(id).iter().rev() {
                stack.push((*child, depth + 1, client_visible));
            }
        }

        for (source, field, target) in pending {
            let resolved = walk.resolve(graph, source, &field, target)?;
            walk.references.push(ReferenceRecord {
                source,
                field,
                target,
                resolved,
            });
        }

        debug!(
            root = %walk.root,
            nodes = walk.nodes.len(),
            references = walk.references.len(),
            "walked component graph"
        );
        Ok(walk)
    }

    fn resolve(
        &self,
        graph: &ComponentGraph,
        source: ComponentId,
        field: &str,
        target: ComponentId,
    ) -> Result<ResolvedReference> {
        if let Some(position) = self.positions.get(&target) {
            return Ok(ResolvedReference::Position(*position));
        }
        if graph.contains(target) && graph.is_removed(target) {
            trace!(node = %source, field, target = %target, "reference to removed node reads as absent");
            return Ok(ResolvedReference::Absent);
        }
        Err(StateError::NotSameGraph {
            source_node: source,
            field: field.to_string(),
            target,
        })
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Visited nodes in canonical order.
    pub fn nodes(&self) -> &[WalkedNode] {
        &self.nodes
    }

    pub fn node(&self, id: ComponentId) -> Option<&WalkedNode> {
        self.positions.get(&id).map(|position| &self.nodes[*position])
    }

    pub fn position_of(&self, id: ComponentId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn references(&self) -> &[ReferenceRecord] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The single root reached from the entry nodes.
fn entry_root(graph: &ComponentGraph, entries: &[ComponentId]) -> Result<ComponentId> {
    let mut roots: Vec<ComponentId> = Vec::new();
    for entry in entries {
        if !graph.contains(*entry) {
            return Err(StateError::UnknownComponent(*entry));
        }
        if graph.owner(*entry).is_some() {
            return Err(StateError::NotRoot { node: *entry });
        }
        if !roots.contains(entry) {
            roots.push(*entry);
        }
    }

    match roots.as_slice() {
        [root] => Ok(*root),
        _ => Err(StateError::MultipleGraphs { roots }),
    }
}

fn collect_references(
    source: ComponentId,
    prefix: &str,
    fields: &FieldSet,
    pending: &mut Vec<(ComponentId, String, ComponentId)>,
) {
    for (name, value) in fields {
        match value {
            FieldValue::Reference(Some(target)) => {
                pending.push((source, format!("{}{}", prefix, name), *target));
            }
            FieldValue::Dto(Some(nested)) => {
                let nested_prefix = format!("{}{}.", prefix, name);
                collect_references(source, &nested_prefix, nested, pending);
            }
            _ => {}
        }
    }
}
