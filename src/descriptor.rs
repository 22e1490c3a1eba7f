//! Field descriptor tables and the state traits.
//!
//! A component (or Dto) exposes its fields as a static table of
//! `{name, policy, kind}` plus by-name accessors exchanging [`FieldValue`]s.
//! The table is normally generated by `#[derive(Component)]` / `#[derive(Dto)]`.

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::policy::SerializeEnum;
use crate::value::FieldValue;

/// Returns the static field table of a Dto type.
pub type DescriptorFn = fn() -> &'static [FieldDescriptor];

/// How a field's value is carried, resolved once per descriptor.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Plain value encoded through serde (numbers, strings, enums, options).
    Scalar,
    /// List of plain values; null and empty are normalized to absent.
    List,
    /// Explicitly typed data row.
    Row,
    /// `Option<ComponentId>` pointing at another node.
    Reference,
    /// Collection of node references (always rejected on serialize).
    ReferenceList,
    /// Untyped value (`AnyValue`), may hold a row.
    Any,
    /// Nested Dto with its own field table.
    Dto(DescriptorFn),
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Scalar => "scalar",
            FieldKind::List => "list",
            FieldKind::Row => "row",
            FieldKind::Reference => "reference",
            FieldKind::ReferenceList => "reference_list",
            FieldKind::Any => "any",
            FieldKind::Dto(_) => "dto",
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldKind::Reference | FieldKind::ReferenceList)
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a field table.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub policy: SerializeEnum,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, policy: SerializeEnum, kind: FieldKind) -> Self {
        Self { name, policy, kind }
    }
}

/// By-name field access driven by a descriptor table.
pub trait StateObject {
    /// Type name written to both documents and used by the registry.
    fn type_name(&self) -> &'static str;

    /// The field table of this value's type.
    fn descriptors(&self) -> &'static [FieldDescriptor];

    /// Static access to the field table.
    fn field_table() -> &'static [FieldDescriptor]
    where
        Self: Sized;

    fn read_field(&self, name: &str) -> Result<FieldValue>;

    fn write_field(&mut self, name: &str, value: FieldValue) -> Result<()>;
}

/// State of a node in a [`ComponentGraph`](crate::ComponentGraph).
pub trait Component: StateObject + Any + Send {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Plain composite value held by a component; no identity of its own.
pub trait Dto: StateObject + Default {}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.type_name())
    }
}

/// Find a descriptor by field name.
pub fn find_descriptor<'a>(
    table: &'a [FieldDescriptor],
    name: &str,
) -> Option<&'a FieldDescriptor> {
    table.iter().find(|descriptor| descriptor.name == name)
}
