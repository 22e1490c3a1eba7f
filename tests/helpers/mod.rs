//! Shared component types for the integration tests.

#![allow(dead_code)]

use component_state::{
    AnyValue, Component, ComponentId, ComponentRegistry, Dto, Row, StateEngine,
};
use serde::{Deserialize, Serialize};

/// Data row stand-in for an ORM entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub credit: i64,
}

impl Row for Customer {
    const ROW_TYPE: &'static str = "Customer";
}

#[derive(Dto, Default, Debug)]
pub struct Selection {
    pub caption: String,
    pub selected: Option<ComponentId>,
    #[state(session)]
    pub note: Option<String>,
}

#[derive(Component, Default)]
pub struct Page {
    pub title: String,
    pub focus: Option<ComponentId>,
    pub default_button: Option<ComponentId>,
    #[state(dto)]
    pub selection: Option<Selection>,
    pub tags: Option<Vec<String>>,
}

#[derive(Component, Default)]
pub struct Panel {
    pub title: String,
}

#[derive(Component, Default)]
pub struct Label {
    pub text: String,
    #[state(session)]
    pub tooltip: Option<String>,
    #[state(client)]
    pub css_class: Option<String>,
    #[state(none)]
    pub render_count: u32,
    pub items: Vec<i64>,
}

#[derive(Component, Default)]
pub struct DataView {
    pub caption: String,
    #[state(session)]
    pub bound: AnyValue,
    pub extra: AnyValue,
    #[state(session, row)]
    pub record: Option<Customer>,
}

/// Popup whose selection is rendered but not kept in the session.
#[derive(Component, Default)]
pub struct Overlay {
    #[state(client, dto)]
    pub popup: Option<Selection>,
    #[state(none, dto)]
    pub draft: Option<Selection>,
}

#[derive(Component, Default)]
pub struct Grid {
    pub rows: Vec<ComponentId>,
}

pub fn registry() -> ComponentRegistry {
    ComponentRegistry::new()
        .with::<Page>()
        .with::<Panel>()
        .with::<Label>()
        .with::<DataView>()
        .with::<Grid>()
        .with::<Overlay>()
}

pub fn engine() -> StateEngine {
    init_tracing();
    StateEngine::new(registry())
}

pub fn label(text: &str) -> Label {
    Label {
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn page(title: &str) -> Page {
    Page {
        title: title.to_string(),
        ..Default::default()
    }
}

/// Route library logs to the test harness; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
