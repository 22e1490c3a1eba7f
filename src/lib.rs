//! component-state - session/client serialization of component graphs
//!
//! A server-driven UI keeps its state as a tree of component nodes. Each
//! request the tree is written out twice from a single walk:
//!
//! - a **session document** holding everything needed to rebuild the graph on
//!   the next request (including node-to-node references as positions)
//! - a **client document** holding only what the renderer may see (hidden
//!   subtrees, session-only fields and references are left out)
//!
//! ## Quick Start
//!
//! ```rust
//! use component_state::{Component, ComponentGraph, ComponentId, ComponentRegistry, StateEngine};
//!
//! #[derive(Component, Default)]
//! struct Page {
//!     title: String,
//!     focus: Option<ComponentId>,
//! }
//!
//! #[derive(Component, Default)]
//! struct Button {
//!     text: String,
//!     #[state(session)]
//!     clicks: u32,
//! }
//!
//! let engine = StateEngine::new(ComponentRegistry::new().with::<Page>().with::<Button>());
//!
//! let mut graph = ComponentGraph::new();
//! let page = graph.add_root(Page::default());
//! let ok = graph.add(page, Button { text: "OK".into(), clicks: 2 }).unwrap();
//! graph.get_mut::<Page>(page).unwrap().focus = Some(ok);
//!
//! let out = engine.serialize(&graph, page).unwrap();
//! let restored = engine.deserialize(&out.session).unwrap();
//! let focus = restored.graph.get::<Page>(restored.root).unwrap().focus;
//! assert_eq!(focus, restored.graph.list(restored.root).first().copied());
//! ```

// Derive output refers to `::component_state::...`
extern crate self as component_state;

// Core error handling
pub mod error;

// Node arena
pub mod node;

// Field policy, descriptor tables and values
pub mod descriptor;
pub mod policy;
pub mod value;

// Canonical enumeration and reference checks
pub mod walker;

// Documents and the two directions
pub mod deserializer;
pub mod document;
pub mod registry;
pub mod serializer;

// Configuration and facade
pub mod config;
pub mod engine;

pub use config::EngineOptions;
pub use descriptor::{Component, DescriptorFn, Dto, FieldDescriptor, FieldKind, StateObject};
pub use deserializer::{deserialize, RestoredGraph};
pub use document::{ClientDocument, ClientNode, RefValue, SessionDocument, SessionNode};
pub use engine::StateEngine;
pub use error::{Result, StateError};
pub use node::{ComponentGraph, ComponentId, Descendants};
pub use policy::{SerializeEnum, Target};
pub use registry::{ComponentFactory, ComponentRegistry};
pub use serializer::{serialize, serialize_entries, Serialized};
pub use value::{AnyValue, FieldSet, FieldValue, Row, RowValue};
pub use walker::GraphWalk;

// Derives share names with the traits they implement
pub use component_state_macros::{Component, Dto};
