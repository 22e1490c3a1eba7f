//! Graph invariant violations and restore failures
//!
//! Every violation aborts the call with no partial output. The messages of
//! the five invariant violations are fixed.
//!
//! Run with: cargo test --test invariant_errors

mod helpers;

use component_state::error::constants::*;
use component_state::{AnyValue, ComponentGraph, EngineOptions, StateError};
use helpers::*;

#[test]
fn test_entry_must_be_root() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let child = graph.add(root, label("c")).unwrap();

    let err = engine.serialize(&graph, child).unwrap_err();
    assert_eq!(err.to_string(), ERR_NOT_ROOT);
    assert!(matches!(err, StateError::NotRoot { node } if node == child));

    // a reference to the same non-root child is fine
    graph.get_mut::<Page>(root).unwrap().focus = Some(child);
    assert!(engine.serialize(&graph, root).is_ok());
}

#[test]
fn test_two_roots_in_one_call() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let first = graph.add_root(page("one"));
    let second = graph.add_root(page("two"));

    let err = engine.serialize_entries(&graph, &[first, second]).unwrap_err();
    assert_eq!(err.to_string(), ERR_MULTIPLE_GRAPHS);
    assert!(err.is_invariant_violation());

    // the same root twice is still one graph
    assert!(engine.serialize_entries(&graph, &[first, first]).is_ok());

    let err = engine.serialize_entries(&graph, &[]).unwrap_err();
    assert_eq!(err.code(), "MULTIPLE_GRAPHS");
}

#[test]
fn test_reference_into_other_tree() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let other = graph.add_root(page("elsewhere"));
    let stranger = graph.add(other, label("x")).unwrap();
    graph.get_mut::<Page>(root).unwrap().default_button = Some(stranger);

    let err = engine.serialize(&graph, root).unwrap_err();
    assert_eq!(err.to_string(), ERR_NOT_SAME_GRAPH);
    match err {
        StateError::NotSameGraph { field, target, .. } => {
            assert_eq!(field, "default_button");
            assert_eq!(target, stranger);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_reference_inside_dto_into_other_tree() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let other = graph.add_root(label("other root"));
    graph.get_mut::<Page>(root).unwrap().selection = Some(Selection {
        selected: Some(other),
        ..Default::default()
    });

    let err = engine.serialize(&graph, root).unwrap_err();
    assert!(matches!(
        err,
        StateError::NotSameGraph { ref field, .. } if field == "selection.selected"
    ));
}

#[test]
fn test_row_in_untyped_field_not_sent_to_client() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let customer = Customer {
        name: "Acme".into(),
        credit: 1,
    };
    let root = graph.add_root(DataView {
        extra: AnyValue::row(&customer).unwrap(),
        ..Default::default()
    });

    let err = engine.serialize(&graph, root).unwrap_err();
    assert_eq!(err.to_string(), ERR_ROW_TO_CLIENT);
    assert!(matches!(err, StateError::RowToClient { ref field, .. } if field == "extra"));

    // session-only untyped field may hold the row
    let view = graph.get_mut::<DataView>(root).unwrap();
    view.extra = AnyValue::Empty;
    view.bound = AnyValue::row(&customer).unwrap();
    let out = engine.serialize(&graph, root).unwrap();
    assert!(out.session.root.fields.contains_key("bound"));
    assert!(!out.client.root.unwrap().fields.contains_key("bound"));
}

#[test]
fn test_row_in_hidden_subtree_is_not_a_violation() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let view = graph
        .add(
            root,
            DataView {
                extra: AnyValue::row(&Customer {
                    name: "Hidden".into(),
                    credit: 0,
                })
                .unwrap(),
                ..Default::default()
            },
        )
        .unwrap();
    graph.set_hide(view, true).unwrap();

    let out = engine.serialize(&graph, root).unwrap();
    assert!(out.client.root.unwrap().list.is_empty());
}

#[test]
fn test_reference_list_rejected() {
    let engine = engine();
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let grid = graph.add(root, Grid::default()).unwrap();

    // rejected even when empty
    let err = engine.serialize(&graph, root).unwrap_err();
    assert_eq!(err.to_string(), ERR_REFERENCE_LIST);

    let cell = graph.add(root, label("cell")).unwrap();
    graph.get_mut::<Grid>(grid).unwrap().rows = vec![cell];
    let err = engine.serialize(&graph, root).unwrap_err();
    assert!(matches!(err, StateError::ReferenceList { ref type_name, .. } if type_name == "Grid"));
}

#[test]
fn test_dangling_reference_on_restore() {
    let engine = engine();
    let session = r#"{"root":{"$id":0,"$type":"Page","fields":{"focus":{"$ref":5}}}}"#;

    let err = engine.deserialize_str(session).unwrap_err();
    assert!(err.is_invariant_violation());
    assert!(matches!(err, StateError::DanglingReference { position: 5, .. }));
}

#[test]
fn test_unregistered_type_on_restore() {
    let engine = component_state::StateEngine::new(component_state::ComponentRegistry::new());
    let err = engine
        .deserialize_str(r#"{"root":{"$id":0,"$type":"Page"}}"#)
        .unwrap_err();
    assert!(matches!(err, StateError::UnknownType(ref name) if name == "Page"));
    assert!(!err.is_invariant_violation());
}

#[test]
fn test_depth_limit_on_serialize() {
    let engine = engine().with_options(EngineOptions::default().with_max_depth(2));
    let mut graph = ComponentGraph::new();
    let root = graph.add_root(page("p"));
    let mut owner = root;
    for i in 0..3 {
        owner = graph.add(owner, label(&i.to_string())).unwrap();
    }

    let err = engine.serialize(&graph, root).unwrap_err();
    assert!(matches!(err, StateError::DepthExceeded { max_depth: 2 }));
}
