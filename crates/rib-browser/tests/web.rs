//! WASM browser tests for rib-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use rib_browser::{
    CanvasFrame, CanvasInput, DesignCanvas, Designer, DispatchQueue, DragSource, IframeFrame,
    ViewBinding, input, uid_of,
};
use web_sys::HtmlIFrameElement;

fn make_frame(id: &str) -> IframeFrame {
    let document = web_sys::window().unwrap().document().unwrap();
    let iframe = document
        .create_element("iframe")
        .unwrap()
        .dyn_into::<HtmlIFrameElement>()
        .unwrap();
    iframe.set_id(id);
    document.body().unwrap().append_child(&iframe).unwrap();
    IframeFrame::from_id(id).unwrap()
}

// === Frame tests ===

#[wasm_bindgen_test]
fn test_frame_load_and_select() {
    let mut frame = make_frame("frame-load");
    frame.load(r#"<div data-uid="7"><span id="inner">x</span></div><p data-uid="8"></p>"#);
    let uid = rib_browser::Uid::parse("7").unwrap();

    frame.set_selected(Some(uid), "ui-selected");
    assert!(frame.element(uid).unwrap().class_list().contains("ui-selected"));

    let other = rib_browser::Uid::parse("8").unwrap();
    frame.set_selected(Some(other), "ui-selected");
    assert!(!frame.element(uid).unwrap().class_list().contains("ui-selected"));
    assert!(frame.element(other).unwrap().class_list().contains("ui-selected"));
}

#[wasm_bindgen_test]
fn test_uid_of_walks_up() {
    let frame = make_frame("frame-uid");
    let mut loader = IframeFrame::new(frame.iframe().clone());
    loader.load(r#"<div data-uid="42"><span id="inner">x</span></div><p id="loose"></p>"#);

    let document = frame.document().unwrap();
    let inner = document.get_element_by_id("inner").unwrap();
    assert_eq!(uid_of(Some(inner.into())), rib_browser::Uid::parse("42"));
    let loose = document.get_element_by_id("loose").unwrap();
    assert_eq!(uid_of(Some(loose.into())), None);
    assert_eq!(uid_of(None), None);
}

// === Canvas over the iframe ===

#[wasm_bindgen_test]
fn test_canvas_renders_into_iframe() {
    let queue = DispatchQueue::new();
    let designer = Designer::with_defaults(queue.clone()).unwrap();
    let canvas = ViewBinding::attach(&designer, DesignCanvas::new(make_frame("frame-canvas")));

    let page = designer.pages()[0];
    let button = designer.insert(page, "Button", None, None).unwrap();
    queue.drain();

    let view = canvas.view();
    let element = view.frame().element(button).unwrap();
    assert_eq!(element.text_content().unwrap(), "Button");
    assert!(element.class_list().contains("ui-selected"));
}

#[wasm_bindgen_test]
fn test_click_input_selects() {
    let queue = DispatchQueue::new();
    let designer = Designer::with_defaults(queue.clone()).unwrap();
    let canvas = ViewBinding::attach(&designer, DesignCanvas::new(make_frame("frame-click")));
    let page = designer.pages()[0];
    let label = designer.insert(page, "Label", None, None).unwrap();
    designer.set_selected(None);
    queue.drain();

    let target = canvas.view().frame().element(label).unwrap();
    let input = CanvasInput::Click(uid_of(Some(target.into())));
    canvas.view_mut().handle(&designer, input).unwrap();
    queue.drain();
    assert_eq!(designer.selected(), Some(label));
}

// === Drag data ===

#[wasm_bindgen_test]
fn test_drag_source_round_trip() {
    let data = web_sys::DataTransfer::new().unwrap();
    input::set_drag_source(&data, &DragSource::Palette("Slider".into())).unwrap();
    assert_eq!(
        input::drag_source(&data),
        Some(DragSource::Palette("Slider".into()))
    );
}
