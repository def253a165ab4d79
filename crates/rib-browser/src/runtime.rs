//! Browser runtime glue: when the dispatch queue drains and where logs go.

use rib_core::DispatchQueue;

/// Route `tracing` output to the browser console.
///
/// Safe to call more than once; only the first call installs a subscriber.
pub fn init_logging() {
    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let _ = set_global_default(Registry::default().with(wasm_layer));
}

/// Drain `queue` on a microtask whenever it stops being empty.
///
/// Handlers then run after the operation that fired the events has
/// returned, but before the browser renders.
pub fn schedule_on_microtask(queue: &DispatchQueue) {
    queue.set_scheduler(|queue| {
        let queue = queue.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let ran = queue.drain();
            tracing::trace!(ran, "dispatch queue drained");
        });
    });
}
