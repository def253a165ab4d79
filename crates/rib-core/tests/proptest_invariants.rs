//! Property-based invariant tests for the design model.
//!
//! Verifies, over random sequences of designer operations:
//! 1. Every structural rule holds after each operation
//! 2. A rejected operation leaves the serialized design unchanged
//! 3. No uid appears twice, copies included
//! 4. Serialize, deserialize, serialize is stable
//! 5. Every declared property of every type has a kind and a default

use std::collections::HashSet;
use std::rc::Rc;

use proptest::prelude::*;
use rib_core::document;
use rib_core::{Designer, DispatchQueue, Uid, WidgetRegistry};

const TYPES: &[&str] = &[
    "Page",
    "Header",
    "Footer",
    "Button",
    "Label",
    "Heading",
    "Slider",
    "List",
    "ListItem",
    "ListDivider",
    "Collapsible",
];

const ZONES: &[Option<&str>] = &[None, Some("content"), Some("top"), Some("items"), Some("left")];

#[derive(Debug, Clone)]
enum Op {
    Insert {
        parent: usize,
        widget: usize,
        zone: usize,
        index: Option<usize>,
    },
    Remove(usize),
    Move {
        node: usize,
        index: usize,
    },
    Reparent {
        node: usize,
        parent: usize,
    },
    SetText {
        node: usize,
        text: String,
    },
    CopyPaste {
        node: usize,
        target: usize,
    },
    Undo,
    Redo,
}

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (any::<usize>(), 0..TYPES.len(), 0..ZONES.len(), proptest::option::of(0usize..4))
            .prop_map(|(parent, widget, zone, index)| Op::Insert { parent, widget, zone, index }),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), 0usize..4).prop_map(|(node, index)| Op::Move { node, index }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(node, parent)| Op::Reparent { node, parent }),
        1 => (any::<usize>(), "[a-z<>&\" ]{0,8}").prop_map(|(node, text)| Op::SetText { node, text }),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(node, target)| Op::CopyPaste { node, target }),
        1 => Just(Op::Undo),
        1 => Just(Op::Redo),
    ]
}

fn pick(designer: &Designer, n: usize) -> Uid {
    let nodes = designer.with_tree(|t| t.walk(t.root()));
    nodes[n % nodes.len()]
}

/// Run `op`. Returns whether the design was meant to change.
fn apply(designer: &Designer, op: &Op) -> bool {
    match op {
        Op::Insert {
            parent,
            widget,
            zone,
            index,
        } => designer
            .insert(pick(designer, *parent), TYPES[*widget], ZONES[*zone], *index)
            .is_ok(),
        Op::Remove(n) => designer.remove_child(pick(designer, *n)).is_ok(),
        Op::Move { node, index } => designer
            .move_node(pick(designer, *node), None, Some(*index))
            .is_ok(),
        Op::Reparent { node, parent } => designer
            .reparent_node(pick(designer, *node), pick(designer, *parent), None, None)
            .is_ok(),
        Op::SetText { node, text } => designer
            .set_property(pick(designer, *node), "text", text.as_str().into())
            .is_ok(),
        Op::CopyPaste { node, target } => {
            designer.copy(pick(designer, *node)) && designer.paste(pick(designer, *target)).is_ok()
        }
        // A failed replay clears history, so the design may still have moved.
        Op::Undo => {
            designer.undo();
            true
        }
        Op::Redo => {
            designer.redo();
            true
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn operations_preserve_invariants(ops in prop::collection::vec(arb_op(), 1..40)) {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue.clone()).unwrap();

        for op in &ops {
            let before = designer.to_json().unwrap();
            let changed = apply(&designer, op);
            queue.drain();

            let tree = designer.root();
            let tree = tree.tree();
            prop_assert!(tree.validate().is_ok(), "{:?} broke the tree: {:?}", op, tree.validate());
            if !changed {
                prop_assert_eq!(&designer.to_json().unwrap(), &before, "{:?} failed but changed the design", op);
            }

            let uids = tree.walk(tree.root());
            let unique: HashSet<_> = uids.iter().collect();
            prop_assert_eq!(unique.len(), uids.len());

            if let Some(selected) = designer.selected() {
                prop_assert!(tree.find(selected).is_some());
            }
            if let Some(page) = designer.active_page() {
                prop_assert!(tree.is_page(page));
            }
        }
    }

    #[test]
    fn serialization_is_stable(ops in prop::collection::vec(arb_op(), 1..30)) {
        let queue = DispatchQueue::new();
        let designer = Designer::with_defaults(queue.clone()).unwrap();
        for op in &ops {
            apply(&designer, op);
        }
        queue.drain();

        let doc = designer.to_document();
        let reloaded = document::deserialize(designer.registry().clone(), &doc).unwrap();
        prop_assert_eq!(document::serialize(&reloaded), doc);
        prop_assert_eq!(reloaded.len(), designer.with_tree(|t| t.len()));
    }
}

#[test]
fn registry_queries_are_total() {
    let registry = Rc::new(WidgetRegistry::builtin());
    for widget in registry.widget_types() {
        for (name, _) in registry.properties(widget).unwrap() {
            assert!(registry.property_exists(widget, &name));
            let kind = registry.property_kind(widget, &name).unwrap();
            let default = registry.property_default(widget, &name).unwrap();
            registry
                .property_schema(widget, &name)
                .unwrap()
                .check(&name, &default)
                .unwrap_or_else(|e| panic!("{widget}.{name} ({}): {e}", kind.as_str()));
        }
    }
}
