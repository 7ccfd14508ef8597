//! WASM bindings for the chat accessibility layer
//!
//! All state lives in Rust behind a single `ChatLabel` handle. JavaScript is
//! only expected to load the module and bind keys to the exported methods.
//!
//! ## Architecture
//!
//! - `WebDom` implements the core `HostDom` trait over the live document and
//!   owns the `MutationObserver`
//! - `LiveRegion` implements `NotificationSink` (toast, assertive region, beep)
//! - The engine is driven by observer callbacks and one `setTimeout` armed for
//!   its next deadline
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { ChatLabel } from './pkg/chatlabel_wasm.js';
//!
//! await init();
//!
//! const a11y = new ChatLabel(JSON.stringify({ settle_delay_ms: 400 }));
//! document.addEventListener('keydown', (e) => {
//!     if (e.altKey && e.code === 'KeyS') a11y.toggle();
//!     if (e.altKey && e.code === 'KeyL') a11y.cycleLanguage();
//! });
//! ```

pub mod live_region;
pub mod logging;
pub mod preferences;
pub mod web_dom;

use chatlabel_core::{AnnotationEngine, EngineConfig, Locale};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub use live_region::LiveRegion;
pub use preferences::Preferences;
pub use web_dom::WebDom;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    web_sys::console::log_1(&"ChatLabel WASM initialized".into());
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn now() -> u64 {
    js_sys::Date::now() as u64
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    JsValue::from_str(&e.to_string())
}

struct Inner {
    engine: AnnotationEngine,
    dom: WebDom,
    sink: LiveRegion,
    timer: Option<i32>,
    /// Callback every timer is armed with; owned by `ChatLabel`
    wake: Option<js_sys::Function>,
}

type Shared = Rc<RefCell<Inner>>;
type Listener = Closure<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>;
type Wake = Closure<dyn FnMut()>;

/// Re-arm the single wakeup timer for the engine's next deadline
fn schedule(shared: &Shared) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let mut inner = shared.borrow_mut();
    if let Some(handle) = inner.timer.take() {
        window.clear_timeout_with_handle(handle);
    }
    let Some(due) = inner.engine.next_deadline() else {
        return;
    };
    let Some(wake) = inner.wake.clone() else {
        return;
    };

    let delay = due.saturating_sub(now()).min(i32::MAX as u64) as i32;
    match window.set_timeout_with_callback_and_timeout_and_arguments_0(&wake, delay) {
        Ok(handle) => inner.timer = Some(handle),
        Err(e) => tracing::error!("Failed to arm timer: {:?}", e),
    }
}

fn tick(shared: &Shared) {
    {
        let Ok(mut guard) = shared.try_borrow_mut() else {
            tracing::warn!("Engine busy; skipping wakeup");
            return;
        };
        let Inner {
            engine,
            dom,
            sink,
            timer,
            ..
        } = &mut *guard;
        *timer = None;
        let report = engine.run_due(dom, sink, now());
        if report.pass.is_some() {
            let swept = dom.sweep();
            if swept > 0 {
                tracing::debug!("Released {} detached handles", swept);
            }
        }
    }
    schedule(shared);
}

fn on_records(shared: &Shared, records: &js_sys::Array) {
    {
        let Ok(mut guard) = shared.try_borrow_mut() else {
            tracing::warn!("Engine busy; dropping mutation batch");
            return;
        };
        let Inner { engine, dom, .. } = &mut *guard;
        let batch = dom.batch_from_records(records);
        engine.on_mutations(dom, &batch, now());
    }
    schedule(shared);
}

/// Accessibility layer handle exposed to JavaScript
#[wasm_bindgen]
pub struct ChatLabel {
    shared: Shared,
    _listener: Listener,
    _wake: Wake,
}

#[wasm_bindgen]
impl ChatLabel {
    /// Build the engine from an optional JSON options object
    ///
    /// Stored preferences override the options: a language the user picked
    /// earlier wins over `locale`, which wins over the browser language, and
    /// the engine re-activates if it was left active.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: Option<String>) -> Result<ChatLabel, JsValue> {
        let config = match options_json.as_deref() {
            Some(json) => EngineConfig::from_json_str(json).map_err(to_js)?,
            None => EngineConfig::default(),
        };
        let prefs = preferences::load().unwrap_or_else(|e| {
            web_sys::console::warn_1(&format!("Preferences unavailable: {:?}", e).into());
            Preferences::default()
        });
        logging::init(config.debug || prefs.debug);

        let window = web_sys::window().ok_or("No window")?;
        let document = window.document().ok_or("No document")?;
        let browser_tag = window.navigator().language().unwrap_or_default();
        let locale = Locale::resolve(prefs.locale, config.locale, &browser_tag);

        let mut engine = AnnotationEngine::new(config);
        engine.set_locale(locale);
        let shared: Shared = Rc::new(RefCell::new(Inner {
            engine,
            dom: WebDom::new(document.clone()),
            sink: LiveRegion::new(&document)?,
            timer: None,
            wake: None,
        }));

        let weak = Rc::downgrade(&shared);
        let on_batch = move |records: js_sys::Array, _observer: web_sys::MutationObserver| {
            if let Some(shared) = weak.upgrade() {
                on_records(&shared, &records);
            }
        };
        let listener: Listener = Closure::wrap(
            Box::new(on_batch) as Box<dyn FnMut(js_sys::Array, web_sys::MutationObserver)>
        );
        let weak = Rc::downgrade(&shared);
        let on_wake = move || {
            if let Some(shared) = weak.upgrade() {
                tick(&shared);
            }
        };
        let wake: Wake = Closure::wrap(Box::new(on_wake) as Box<dyn FnMut()>);
        {
            let mut inner = shared.borrow_mut();
            inner
                .dom
                .set_listener(listener.as_ref().unchecked_ref::<js_sys::Function>().clone());
            inner.wake = Some(wake.as_ref().unchecked_ref::<js_sys::Function>().clone());
        }

        let label = ChatLabel {
            shared,
            _listener: listener,
            _wake: wake,
        };
        tracing::info!("ChatLabel ready ({})", locale.tag());
        if prefs.active {
            label.activate();
        }
        Ok(label)
    }

    /// Start labeling; returns whether the engine is now active
    pub fn activate(&self) -> bool {
        let active = {
            let mut guard = self.shared.borrow_mut();
            let Inner { engine, dom, sink, .. } = &mut *guard;
            engine.activate(dom, sink, now());
            engine.is_active()
        };
        if active {
            preferences::save_active(true);
        }
        schedule(&self.shared);
        active
    }

    pub fn deactivate(&self) {
        {
            let mut guard = self.shared.borrow_mut();
            let Inner { engine, dom, sink, .. } = &mut *guard;
            engine.deactivate(dom, sink);
        }
        preferences::save_active(false);
        schedule(&self.shared);
    }

    pub fn toggle(&self) -> bool {
        if self.is_active() {
            self.deactivate();
            false
        } else {
            self.activate()
        }
    }

    /// Switch to the next interface language; returns its tag
    #[wasm_bindgen(js_name = cycleLanguage)]
    pub fn cycle_language(&self) -> String {
        let locale = {
            let mut guard = self.shared.borrow_mut();
            let Inner { engine, dom, sink, .. } = &mut *guard;
            engine.cycle_locale(dom, sink)
        };
        preferences::save_locale(locale);
        locale.tag().to_string()
    }

    #[wasm_bindgen(js_name = isActive)]
    pub fn is_active(&self) -> bool {
        self.shared.borrow().engine.is_active()
    }

    #[wasm_bindgen(getter)]
    pub fn locale(&self) -> String {
        self.shared.borrow().engine.locale().tag().to_string()
    }

    /// Relabel the whole page now; returns the pass summary, or null when inactive
    pub fn refresh(&self) -> Result<JsValue, JsValue> {
        let report = {
            let mut guard = self.shared.borrow_mut();
            let Inner { engine, dom, .. } = &mut *guard;
            engine.refresh(dom)
        };
        match report {
            Some(report) => serde_wasm_bindgen::to_value(&report).map_err(to_js),
            None => Ok(JsValue::NULL),
        }
    }
}

impl Drop for ChatLabel {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.try_borrow_mut() {
            use chatlabel_core::HostDom;
            inner.dom.disconnect();
            if let (Some(handle), Some(window)) = (inner.timer.take(), web_sys::window()) {
                window.clear_timeout_with_handle(handle);
            }
        }
    }
}
