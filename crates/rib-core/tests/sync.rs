//! Views following a designer through edits, undo and design resets.

use std::cell::RefCell;
use std::rc::Rc;

use rib_core::model::{ACTIVE_PAGE_CHANGED, DESIGN_RESET, MODEL_UPDATED, SELECTION_CHANGED};
use rib_core::tree::PAGE_TYPE;
use rib_core::views::{CodeView, OutlineView, PageListView, PropertyView};
use rib_core::{
    DesignCanvas, DesignEvent, Designer, DispatchQueue, Event, HeadlessFrame, PropertyValue,
    UndoManager, ViewBinding, handler,
};

fn session() -> (Designer, DispatchQueue) {
    let queue = DispatchQueue::new();
    let designer = Designer::with_defaults(queue.clone()).unwrap();
    queue.drain();
    (designer, queue)
}

fn build_sample(designer: &Designer) {
    let page = designer.pages()[0];
    let header = designer.insert(page, "Header", None, None).unwrap();
    designer.insert(header, "Button", Some("left"), None).unwrap();
    let list = designer.insert(page, "List", None, None).unwrap();
    designer.insert(list, "ListItem", None, None).unwrap();
    designer.insert(list, "ListDivider", None, Some(0)).unwrap();
    let label = designer.insert(page, "Label", None, None).unwrap();
    designer.set_property(label, "text", "Hello".into()).unwrap();
    designer.insert(designer.root_id(), PAGE_TYPE, None, None).unwrap();
}

#[test]
fn test_undo_redo_restores_identical_documents() {
    let (mut designer, queue) = session();
    let mut snapshots = vec![designer.to_json().unwrap()];
    let page = designer.pages()[0];

    let list = designer.insert(page, "List", None, None).unwrap();
    snapshots.push(designer.to_json().unwrap());
    let item = designer.insert(list, "ListItem", None, None).unwrap();
    snapshots.push(designer.to_json().unwrap());
    designer.set_property(item, "text", "One".into()).unwrap();
    snapshots.push(designer.to_json().unwrap());
    let label = designer.insert(page, "Label", None, Some(0)).unwrap();
    snapshots.push(designer.to_json().unwrap());
    designer.move_node(label, None, Some(1)).unwrap();
    snapshots.push(designer.to_json().unwrap());
    designer.remove_child(list).unwrap();
    snapshots.push(designer.to_json().unwrap());
    queue.drain();

    for expected in snapshots.iter().rev().skip(1) {
        assert!(designer.undo());
        assert_eq!(&designer.to_json().unwrap(), expected);
    }
    assert!(!designer.can_undo());
    for expected in snapshots.iter().skip(1) {
        assert!(UndoManager::redo(&mut designer));
        assert_eq!(&designer.to_json().unwrap(), expected);
    }
    assert!(!designer.can_redo());
    queue.drain();
}

#[test]
fn test_transaction_undoes_as_one_step() {
    let (designer, queue) = session();
    let before = designer.to_json().unwrap();
    let page = designer.pages()[0];

    designer.begin_transaction();
    let list = designer.insert(page, "List", None, None).unwrap();
    designer.insert(list, "ListItem", None, None).unwrap();
    designer.insert(list, "ListItem", None, None).unwrap();
    designer.end_transaction();
    queue.drain();

    assert!(designer.undo());
    assert_eq!(designer.to_json().unwrap(), before);
    assert!(!designer.can_undo());
    assert!(designer.redo());
    assert_eq!(designer.with_tree(|t| t.node(list).unwrap().children().count()), 2);
}

#[test]
fn test_load_fires_single_reset() {
    let (designer, queue) = session();
    build_sample(&designer);
    let json = designer.to_json().unwrap();
    queue.drain();

    let events = Rc::new(RefCell::new(Vec::new()));
    for channel in [DESIGN_RESET, SELECTION_CHANGED, ACTIVE_PAGE_CHANGED] {
        let events = events.clone();
        designer.events().bind(
            channel,
            handler(move |e: &Event<DesignEvent>, _| events.borrow_mut().push(e.payload.clone())),
            None,
        );
    }
    let old_root = designer.root();
    designer.load_json(&json).unwrap();
    queue.drain();

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        DesignEvent::DesignReset {
            previous: Some(old_root.id()),
            root: designer.root_id(),
        }
    );
    assert_eq!(designer.to_json().unwrap(), json);
    assert_eq!(designer.active_page(), designer.pages().first().copied());
    assert_eq!(designer.selected(), None);
    assert!(!designer.can_undo());
}

#[test]
fn test_views_rebind_on_reset() {
    let (designer, queue) = session();
    let outline = ViewBinding::attach(&designer, OutlineView::new());
    let sheet = ViewBinding::attach(&designer, PropertyView::new());
    let pages = ViewBinding::attach(&designer, PageListView::new());
    let code = ViewBinding::attach(&designer, CodeView::new());
    let canvas = ViewBinding::attach(&designer, DesignCanvas::new(HeadlessFrame::default()));
    build_sample(&designer);
    queue.drain();

    let old_root = designer.root();
    assert_eq!(old_root.events().binding_count(MODEL_UPDATED), 5);
    designer.new_design().unwrap();
    queue.drain();

    let root = designer.root();
    assert_eq!(old_root.events().binding_count(MODEL_UPDATED), 0);
    assert_eq!(root.events().binding_count(MODEL_UPDATED), 5);
    for bound in [
        outline.bound_root(),
        sheet.bound_root(),
        pages.bound_root(),
        code.bound_root(),
        canvas.bound_root(),
    ] {
        assert_eq!(bound, Some(root.id()));
    }

    assert_eq!(outline.view().rows().len(), 2);
    assert!(sheet.view().rows().is_empty());
    assert_eq!(pages.view().rows().len(), 1);
    assert!(!code.view().html().contains("Hello"));
    assert_eq!(canvas.view().page(), designer.active_page());

    // Edits on the new root still reach every view.
    let page = designer.pages()[0];
    let label = designer.insert(page, "Label", None, None).unwrap();
    designer.set_property(label, "text", "Fresh".into()).unwrap();
    queue.drain();
    assert!(outline.view().row(label).unwrap().selected);
    assert_eq!(
        sheet.view().row("text").unwrap().value,
        PropertyValue::from("Fresh")
    );
    assert!(code.view().html().contains("Fresh"));
    assert!(canvas.view().frame().html.contains("Fresh"));
}

#[test]
fn test_outline_incremental_matches_rebuild() {
    let (designer, queue) = session();
    let outline = ViewBinding::attach(&designer, OutlineView::new());
    build_sample(&designer);
    let page = designer.pages()[0];
    designer.copy(page);
    designer.paste(designer.root_id()).unwrap();
    queue.drain();

    let incremental = outline.view().rows().to_vec();
    let fresh = ViewBinding::attach(&designer, OutlineView::new());
    assert_eq!(fresh.view().rows(), incremental.as_slice());
    assert_eq!(outline.view().to_text(), fresh.view().to_text());
}

#[test]
fn test_views_match_fresh_after_batched_edits() {
    let (designer, queue) = session();
    let outline = ViewBinding::attach(&designer, OutlineView::new());
    let pages = ViewBinding::attach(&designer, PageListView::new());
    let code = ViewBinding::attach(&designer, CodeView::new());
    let page = designer.pages()[0];

    let check = |step: &str| {
        queue.drain();
        let fresh_outline = ViewBinding::attach(&designer, OutlineView::new());
        let fresh_pages = ViewBinding::attach(&designer, PageListView::new());
        let fresh_code = ViewBinding::attach(&designer, CodeView::new());
        assert_eq!(outline.view().rows(), fresh_outline.view().rows(), "outline after {step}");
        assert_eq!(pages.view().rows(), fresh_pages.view().rows(), "pages after {step}");
        assert_eq!(code.view().html(), fresh_code.view().html(), "code after {step}");
    };

    // Append, then insert in front of it before anything is delivered.
    designer.insert(page, "Label", None, None).unwrap();
    designer.insert(page, "Label", None, Some(0)).unwrap();
    check("insert at front");

    // A child added into a node whose own addition is still queued.
    let list = designer.insert(page, "List", None, Some(1)).unwrap();
    designer.insert(list, "ListItem", None, None).unwrap();
    designer.insert(list, "ListDivider", None, Some(0)).unwrap();
    check("nested inserts");

    // New page, filled and renamed, then moved in front of the first one.
    let second = designer.insert(designer.root_id(), PAGE_TYPE, None, None).unwrap();
    let header = designer.insert(second, "Header", None, None).unwrap();
    designer.insert(header, "Button", Some("right"), None).unwrap();
    designer.set_property(second, "title", "Second".into()).unwrap();
    designer.move_node(second, None, Some(0)).unwrap();
    check("page edits");

    // Added, then removed again before the drain.
    let gone = designer.insert(page, "Slider", None, None).unwrap();
    designer.insert(page, "Heading", None, Some(0)).unwrap();
    designer.remove_child(gone).unwrap();
    check("add then remove");

    // Undo and redo several steps in one go.
    for _ in 0..4 {
        designer.undo();
    }
    designer.redo();
    check("undo and redo");
}
