//! Spoken output: status toast, assertive live region, audio cue

use chatlabel_core::{A11yError, NotificationSink};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{AudioContext, Document, HtmlElement, OscillatorType};

const TOAST_ID: &str = "chatlabel-toast";
const ANNOUNCER_ID: &str = "chatlabel-announcer";

/// How long a toast stays in the region before it is cleared
const TOAST_MS: i32 = 3_500;

const HIDDEN_STYLE: &str =
    "position:absolute;left:-10000px;top:auto;width:1px;height:1px;overflow:hidden;";

const CUE_HZ: f32 = 880.0;
const CUE_GAIN: f32 = 0.08;
const CUE_SECONDS: f64 = 0.12;

pub struct LiveRegion {
    toast: HtmlElement,
    announcer: HtmlElement,
    audio: Option<AudioContext>,
}

impl LiveRegion {
    /// Create both regions, reusing them if a previous instance left them behind
    pub fn new(document: &Document) -> Result<Self, JsValue> {
        let toast = region(document, TOAST_ID, "polite", "status")?;
        let announcer = region(document, ANNOUNCER_ID, "assertive", "alert")?;
        Ok(Self {
            toast,
            announcer,
            audio: None,
        })
    }

    fn audio(&mut self) -> Result<&AudioContext, JsValue> {
        if self.audio.is_none() {
            self.audio = Some(AudioContext::new()?);
        }
        self.audio.as_ref().ok_or_else(|| JsValue::from_str("No AudioContext"))
    }

    fn beep(&mut self) -> Result<(), JsValue> {
        let ctx = self.audio()?;
        let oscillator = ctx.create_oscillator()?;
        oscillator.set_type(OscillatorType::Sine);
        oscillator.frequency().set_value(CUE_HZ);

        let gain = ctx.create_gain()?;
        gain.gain().set_value(CUE_GAIN);

        oscillator.connect_with_audio_node(&gain)?;
        gain.connect_with_audio_node(&ctx.destination())?;

        let start = ctx.current_time();
        oscillator.start()?;
        oscillator.stop_with_when(start + CUE_SECONDS)?;
        Ok(())
    }
}

fn region(document: &Document, id: &str, politeness: &str, role: &str) -> Result<HtmlElement, JsValue> {
    if let Some(existing) = document.get_element_by_id(id) {
        return existing.dyn_into::<HtmlElement>().map_err(|_| JsValue::from_str("Region is not an HTML element"));
    }
    let el = document
        .create_element("div")?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str("Failed to create region"))?;
    el.set_id(id);
    el.set_attribute("aria-live", politeness)?;
    el.set_attribute("aria-atomic", "true")?;
    el.set_attribute("role", role)?;
    el.set_attribute("style", HIDDEN_STYLE)?;
    document
        .body()
        .ok_or("No document body")?
        .append_child(&el)?;
    Ok(el)
}

fn clear_later(el: &HtmlElement, text: &str) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let el = el.clone();
    let shown = text.to_string();
    let clear = Closure::once_into_js(move || {
        // only if nothing newer replaced it
        if el.text_content().as_deref() == Some(shown.as_str()) {
            el.set_text_content(Some(""));
        }
    });
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        clear.unchecked_ref(),
        TOAST_MS,
    ) {
        tracing::warn!("Failed to schedule toast clear: {:?}", e);
    }
}

impl NotificationSink for LiveRegion {
    fn announce(&mut self, text: &str) {
        // an unchanged region is not re-read, so empty it first
        self.announcer.set_text_content(Some(""));
        self.announcer.set_text_content(Some(text));
        tracing::debug!("Announced: {}", text);
    }

    fn play_cue(&mut self) -> Result<(), A11yError> {
        self.beep()
            .map_err(|e| A11yError::Cue(e.as_string().unwrap_or_else(|| format!("{:?}", e))))
    }

    fn notify(&mut self, text: &str) {
        self.toast.set_text_content(Some(text));
        clear_later(&self.toast, text);
        tracing::debug!("Toast: {}", text);
    }
}
