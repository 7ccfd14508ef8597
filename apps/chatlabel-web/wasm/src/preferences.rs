//! Preferences persisted in localStorage across page loads

use chatlabel_core::Locale;
use wasm_bindgen::JsValue;
use web_sys::Storage;

pub const LANG_KEY: &str = "wpp_a11y_lang";
pub const ACTIVE_KEY: &str = "wpp_a11y_is_active";
pub const DEBUG_KEY: &str = "wpp_a11y_debug";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    /// `None` until the user picks a language
    pub locale: Option<Locale>,
    pub active: bool,
    pub debug: bool,
}

impl Preferences {
    /// Interpret raw stored values; anything unreadable falls back to the default
    pub fn from_values(lang: Option<&str>, active: Option<&str>, debug: Option<&str>) -> Self {
        Self {
            locale: lang
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(Locale::from_tag),
            active: active == Some("true"),
            debug: debug == Some("true"),
        }
    }
}

fn storage() -> Result<Storage, JsValue> {
    let window = web_sys::window().ok_or("No window")?;
    let storage = window.local_storage()?.ok_or("No localStorage")?;
    Ok(storage)
}

pub fn load() -> Result<Preferences, JsValue> {
    let storage = storage()?;
    let lang = storage.get_item(LANG_KEY)?;
    let active = storage.get_item(ACTIVE_KEY)?;
    let debug = storage.get_item(DEBUG_KEY)?;
    Ok(Preferences::from_values(
        lang.as_deref(),
        active.as_deref(),
        debug.as_deref(),
    ))
}

fn save(key: &str, value: &str) {
    match storage().and_then(|s| s.set_item(key, value)) {
        Ok(()) => tracing::debug!("Storage saved: {} = {}", key, value),
        Err(e) => tracing::error!("Storage save failed for {}: {:?}", key, e),
    }
}

pub fn save_locale(locale: Locale) {
    save(LANG_KEY, locale.tag());
}

pub fn save_active(active: bool) {
    save(ACTIVE_KEY, if active { "true" } else { "false" });
}



#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_save_and_load() {
        save_locale(Locale::EsEs);
        save_active(true);
        let prefs = load().unwrap();
        assert_eq!(prefs.locale, Some(Locale::EsEs));
        assert!(prefs.active);
        save_active(false);
    }
}
