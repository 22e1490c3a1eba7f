//! Field values exchanged between component state and the serializer.
//!
//! [`FieldValue`] is the closed set of shapes a field can take. The helper
//! functions below are what `#[derive(Component)]` / `#[derive(Dto)]`
//! generated accessors call; they are public for hand-written impls too.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::descriptor::{Dto, StateObject};
use crate::error::{Result, StateError};
use crate::node::ComponentId;

/// Field name/value pairs of one state object, in descriptor order.
pub type FieldSet = Vec<(&'static str, FieldValue)>;

/// A field value, tagged by how it is carried.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain value (scalars, lists of scalars, typed rows).
    Scalar(JsonValue),
    /// Single node reference; `None` when absent.
    Reference(Option<ComponentId>),
    /// Collection of node references.
    ReferenceList(Vec<Option<ComponentId>>),
    /// Untyped value.
    Any(AnyValue),
    /// Nested Dto fields; `None` when the Dto is absent.
    Dto(Option<FieldSet>),
}

impl FieldValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Scalar(_) => "scalar",
            FieldValue::Reference(_) => "reference",
            FieldValue::ReferenceList(_) => "reference_list",
            FieldValue::Any(_) => "any",
            FieldValue::Dto(_) => "dto",
        }
    }
}

/// Opaque external data record embedded in component state.
///
/// Rows may be held by explicitly typed `#[state(row)]` fields, or wrapped in
/// an [`AnyValue`] for the session document only.
pub trait Row: Serialize + DeserializeOwned {
    /// Stable name recorded next to the row data.
    const ROW_TYPE: &'static str;
}

/// Row data tagged with its row type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowValue {
    #[serde(rename = "type")]
    pub type_name: String,
    pub data: JsonValue,
}

/// Value of an untyped ("object") field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyValue {
    #[default]
    Empty,
    Value(JsonValue),
    Row(RowValue),
}

impl AnyValue {
    /// Wrap any serializable value.
    pub fn value<T: Serialize>(value: &T) -> Result<Self> {
        Ok(AnyValue::Value(serde_json::to_value(value)?))
    }

    /// Wrap a data row. Such a value can be kept in the session but never sent to the client.
    pub fn row<T: Row>(row: &T) -> Result<Self> {
        Ok(AnyValue::Row(RowValue {
            type_name: T::ROW_TYPE.to_string(),
            data: serde_json::to_value(row)?,
        }))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, AnyValue::Empty)
    }

    pub fn is_row(&self) -> bool {
        matches!(self, AnyValue::Row(_))
    }

    pub fn as_value(&self) -> Option<&JsonValue> {
        match self {
            AnyValue::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Decode the held row if it is of type `T`.
    pub fn as_row<T: Row>(&self) -> Option<Result<T>> {
        match self {
            AnyValue::Row(row) if row.type_name == T::ROW_TYPE => {
                Some(serde_json::from_value(row.data.clone()).map_err(StateError::from))
            }
            _ => None,
        }
    }
}

/// Conversion between a reference collection field and reference slots.
pub trait ReferenceSlots: Sized {
    fn to_slots(&self) -> Vec<Option<ComponentId>>;
    fn from_slots(slots: Vec<Option<ComponentId>>) -> Self;
}

impl ReferenceSlots for Vec<ComponentId> {
    fn to_slots(&self) -> Vec<Option<ComponentId>> {
        self.iter().copied().map(Some).collect()
    }

    fn from_slots(slots: Vec<Option<ComponentId>>) -> Self {
        slots.into_iter().flatten().collect()
    }
}

impl ReferenceSlots for Vec<Option<ComponentId>> {
    fn to_slots(&self) -> Vec<Option<ComponentId>> {
        self.clone()
    }

    fn from_slots(slots: Vec<Option<ComponentId>>) -> Self {
        slots
    }
}

impl ReferenceSlots for Option<Vec<ComponentId>> {
    fn to_slots(&self) -> Vec<Option<ComponentId>> {
        self.iter().flatten().copied().map(Some).collect()
    }

    fn from_slots(slots: Vec<Option<ComponentId>>) -> Self {
        Some(slots.into_iter().flatten().collect())
    }
}

/// Read every field of `object` in descriptor order.
pub fn read_fields<T: StateObject + ?Sized>(object: &T) -> Result<FieldSet> {
    object
        .descriptors()
        .iter()
        .map(|descriptor| Ok((descriptor.name, object.read_field(descriptor.name)?)))
        .collect()
}

/// Write a field set back into `object`.
pub fn write_fields<T: StateObject + ?Sized>(object: &mut T, fields: FieldSet) -> Result<()> {
    for (name, value) in fields {
        object.write_field(name, value)?;
    }
    Ok(())
}

pub fn read_scalar<T: Serialize>(value: &T, type_name: &str, field: &str) -> Result<FieldValue> {
    serde_json::to_value(value)
        .map(FieldValue::Scalar)
        .map_err(|e| StateError::field_type(type_name, field, e))
}

pub fn write_scalar<T: DeserializeOwned>(
    value: FieldValue,
    type_name: &str,
    field: &str,
) -> Result<T> {
    match value {
        FieldValue::Scalar(json) => {
            serde_json::from_value(json).map_err(|e| StateError::field_type(type_name, field, e))
        }
        other => Err(mismatch(type_name, field, "scalar", &other)),
    }
}

pub fn write_reference(
    value: FieldValue,
    type_name: &str,
    field: &str,
) -> Result<Option<ComponentId>> {
    match value {
        FieldValue::Reference(target) => Ok(target),
        other => Err(mismatch(type_name, field, "reference", &other)),
    }
}

pub fn write_reference_list(
    value: FieldValue,
    type_name: &str,
    field: &str,
) -> Result<Vec<Option<ComponentId>>> {
    match value {
        FieldValue::ReferenceList(targets) => Ok(targets),
        other => Err(mismatch(type_name, field, "reference_list", &other)),
    }
}

pub fn write_any(value: FieldValue, type_name: &str, field: &str) -> Result<AnyValue> {
    match value {
        FieldValue::Any(any) => Ok(any),
        other => Err(mismatch(type_name, field, "any", &other)),
    }
}

pub fn read_dto<T: StateObject>(value: Option<&T>) -> Result<FieldValue> {
    match value {
        Some(dto) => Ok(FieldValue::Dto(Some(read_fields(dto)?))),
        None => Ok(FieldValue::Dto(None)),
    }
}

pub fn write_dto<T: Dto>(value: FieldValue, type_name: &str, field: &str) -> Result<Option<T>> {
    match value {
        FieldValue::Dto(Some(fields)) => {
            let mut dto = T::default();
            write_fields(&mut dto, fields)?;
            Ok(Some(dto))
        }
        FieldValue::Dto(None) => Ok(None),
        other => Err(mismatch(type_name, field, "dto", &other)),
    }
}

fn mismatch(type_name: &str, field: &str, expected: &str, found: &FieldValue) -> StateError {
    StateError::field_type(
        type_name,
        field,
        format!("expected {} value, found {}", expected, found.kind_name()),
    )
}
