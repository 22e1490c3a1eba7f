//! Error types for component state transfer.
//!
//! Every failure is fatal to the current serialize/deserialize call. The
//! first five variants are the graph invariant violations; their messages are
//! the signals callers match on and must not change.

use thiserror::Error;

use crate::node::ComponentId;

/// Invariant violation messages.
pub mod constants {
    pub const ERR_NOT_ROOT: &str = "Referenced ComponentJson not root!";
    pub const ERR_NOT_SAME_GRAPH: &str = "Referenced ComponentJson not in same object graph!";
    pub const ERR_MULTIPLE_GRAPHS: &str = "JsonClient can only have one ComponentJson graph!";
    pub const ERR_ROW_TO_CLIENT: &str = "Can not send data row to client!";
    pub const ERR_REFERENCE_LIST: &str = "Reference to ComponentJson in List not supported!";
}

/// Errors raised while building, walking, serializing or restoring a component graph.
#[derive(Debug, Error)]
pub enum StateError {
    /// An entry node of the call has an owner. Raised for entry nodes only;
    /// reference targets need not be roots.
    #[error("Referenced ComponentJson not root!")]
    NotRoot {
        /// The entry node that is not a root.
        node: ComponentId,
    },

    /// A reference field points at a live node of another tree.
    #[error("Referenced ComponentJson not in same object graph!")]
    NotSameGraph {
        /// Node holding the reference.
        source_node: ComponentId,
        /// Field path of the reference, e.g. `"detail.selected"`.
        field: String,
        /// Target node outside the walked graph.
        target: ComponentId,
    },

    /// The entry point reaches more than one independently rooted tree.
    #[error("JsonClient can only have one ComponentJson graph!")]
    MultipleGraphs {
        /// Distinct roots reached from the entry point.
        roots: Vec<ComponentId>,
    },

    /// An untyped field holds a data row and would be sent to the client.
    #[error("Can not send data row to client!")]
    RowToClient {
        /// Node holding the field.
        node: ComponentId,
        /// Field path.
        field: String,
    },

    /// A field declares a list of component references.
    #[error("Reference to ComponentJson in List not supported!")]
    ReferenceList {
        /// Component or Dto type declaring the field.
        type_name: String,
        /// Field path.
        field: String,
    },

    /// A session document reference does not resolve to a node.
    #[error("Dangling reference: {field} -> position {position} (no such node in session document)")]
    DanglingReference {
        /// Field path of the reference.
        field: String,
        /// Position that does not exist.
        position: usize,
    },

    /// Two nodes of a session document claim the same position.
    #[error("Duplicate position {0} in session document")]
    DuplicatePosition(usize),

    /// A session document names a type the registry does not know.
    #[error("Unknown component type '{0}' (not registered)")]
    UnknownType(String),

    /// A component id does not belong to this graph.
    #[error("Unknown component {0}")]
    UnknownComponent(ComponentId),

    /// A state object was asked for a field it does not declare.
    #[error("Unknown field '{field}' on '{type_name}'")]
    UnknownField {
        /// Component or Dto type.
        type_name: String,
        /// Requested field name.
        field: String,
    },

    /// A field value could not be converted to or from its declared type.
    #[error("Field '{type_name}.{field}': {message}")]
    FieldType {
        /// Component or Dto type.
        type_name: String,
        /// Field name.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// A move would make a node its own transitive owner.
    #[error("Ownership cycle: {node} can not be owned by {owner}")]
    OwnershipCycle {
        /// Node being moved.
        node: ComponentId,
        /// Requested owner.
        owner: ComponentId,
    },

    /// The tree is deeper than the configured limit.
    #[error("Component tree exceeds maximum depth {max_depth}")]
    DepthExceeded {
        /// Configured limit.
        max_depth: usize,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StateError {
    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotRoot { .. } => "NOT_ROOT",
            Self::NotSameGraph { .. } => "NOT_SAME_GRAPH",
            Self::MultipleGraphs { .. } => "MULTIPLE_GRAPHS",
            Self::RowToClient { .. } => "ROW_TO_CLIENT",
            Self::ReferenceList { .. } => "REFERENCE_LIST",
            Self::DanglingReference { .. } => "DANGLING_REFERENCE",
            Self::DuplicatePosition(_) => "DUPLICATE_POSITION",
            Self::UnknownType(_) => "UNKNOWN_TYPE",
            Self::UnknownComponent(_) => "UNKNOWN_COMPONENT",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::FieldType { .. } => "FIELD_TYPE",
            Self::OwnershipCycle { .. } => "OWNERSHIP_CYCLE",
            Self::DepthExceeded { .. } => "DEPTH_EXCEEDED",
            Self::Json(_) => "JSON",
            Self::Config(_) => "CONFIG",
            Self::Io(_) => "IO",
        }
    }

    /// Check if this is a graph invariant violation (as opposed to a malformed
    /// document, unknown type or I/O failure).
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::NotRoot { .. }
                | Self::NotSameGraph { .. }
                | Self::MultipleGraphs { .. }
                | Self::RowToClient { .. }
                | Self::ReferenceList { .. }
                | Self::DanglingReference { .. }
        )
    }

    pub(crate) fn field_type(
        type_name: &str,
        field: &str,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::FieldType {
            type_name: type_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Type alias for Results using StateError
pub type Result<T> = std::result::Result<T, StateError>;
