//! Procedural macros for component-state
//!
//! This crate provides two derives:
//! - `#[derive(Component)]` - Field table and accessors for a component node's state
//! - `#[derive(Dto)]` - The same for a plain composite value held by a component

use proc_macro::TokenStream;

mod field;
mod state_object;

/// Derive macro for component node state.
///
/// Generates `StateObject` (field table, `read_field`, `write_field`) and
/// `Component` (downcasting). The struct must also implement `Default` so
/// the registry can instantiate it when a session document is restored.
///
/// # Attributes
///
/// - `#[state(name = "...")]` on the struct - type name written to both documents
/// - `#[state(session)]`, `#[state(client)]`, `#[state(both)]`, `#[state(none)]` on a field - output policy (default `both`)
/// - `#[state(dto)]` - the field holds a `Dto` (`T` or `Option<T>`)
/// - `#[state(row)]` - the field holds an explicitly typed data row
///
/// Reference fields are recognised by type: `Option<ComponentId>` is a single
/// reference, `Vec<ComponentId>` and friends are reference lists (rejected at
/// serialization time). `AnyValue` is the untyped field.
///
/// # Example
///
/// ```ignore
/// #[derive(Component, Default)]
/// pub struct Button {
///     pub text: String,
///     #[state(session)]
///     pub click_count: u32,
///     pub target: Option<ComponentId>,
/// }
/// ```
#[proc_macro_derive(Component, attributes(state))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    state_object::derive_state_object_impl(input, state_object::DeriveTarget::Component)
}

/// Derive macro for Dto value types.
///
/// Same field rules as `#[derive(Component)]`; the struct must implement `Default`.
#[proc_macro_derive(Dto, attributes(state))]
pub fn derive_dto(input: TokenStream) -> TokenStream {
    state_object::derive_state_object_impl(input, state_object::DeriveTarget::Dto)
}
