//! WebAssembly bindings for ShareMeNot
//!
//! The background page calls `init` once with the tracker catalog and the
//! user's preferences, then forwards navigation, request and tab-close
//! events. The popup and content script reach the engine through the
//! background page with the remaining functions.
//!
//! Before `init` succeeds every request is allowed and every view is `null`.

use std::sync::OnceLock;

use log::warn;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use smn_core::{Engine, ObservedRequest, Preferences, RequestVerdict};

static ENGINE: OnceLock<Engine> = OnceLock::new();

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

#[wasm_bindgen]
pub fn init(catalog_json: &str, preferences_json: Option<String>) -> Result<(), JsValue> {
    if ENGINE.get().is_some() {
        return Err(JsValue::from_str("Already initialized. Reload the extension to reinitialize."));
    }

    let preferences = parse_preferences(preferences_json.as_deref())?;
    let engine = Engine::from_catalog_json(catalog_json, preferences)
        .map_err(|e| JsValue::from_str(&format!("Failed to load trackers: {}", e)))?;

    ENGINE
        .set(engine)
        .map_err(|_| JsValue::from_str("Failed to set engine state"))?;

    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    ENGINE.get().is_some()
}

#[wasm_bindgen]
pub fn get_engine_info() -> JsValue {
    let result = js_sys::Object::new();
    if let Some(engine) = ENGINE.get() {
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(true));
        let _ = js_sys::Reflect::set(&result, &"trackers".into(), &JsValue::from(engine.registry().len() as u32));
        let _ = js_sys::Reflect::set(&result, &"patterns".into(), &JsValue::from(engine.index().len() as u32));
    } else {
        let _ = js_sys::Reflect::set(&result, &"initialized".into(), &JsValue::from(false));
    }
    result.into()
}

/// Replace the global settings after the options page saved new ones.
#[wasm_bindgen]
pub fn update_preferences(preferences_json: &str) -> Result<(), JsValue> {
    let engine = ENGINE
        .get()
        .ok_or_else(|| JsValue::from_str("Not initialized"))?;
    let preferences = parse_preferences(Some(preferences_json))?;
    engine.replace_policy(preferences);
    Ok(())
}

// =============================================================================
// Platform events
// =============================================================================

#[wasm_bindgen]
pub fn on_top_level_navigation(tab_id: i32, url: &str) {
    if let Some(engine) = ENGINE.get() {
        engine.on_top_level_navigation(tab_id, url);
    }
}

/// Returns `{ verdict, tracker? }` where verdict is 0 = allow, 1 = cancel,
/// 2 = strip cookies.
#[wasm_bindgen]
pub fn on_request_observed(url: &str, tab_id: Option<i32>, tab_url: Option<String>) -> JsValue {
    let result = js_sys::Object::new();

    let engine = match ENGINE.get() {
        Some(engine) => engine,
        None => {
            let _ = js_sys::Reflect::set(&result, &"verdict".into(), &JsValue::from(RequestVerdict::Allow as u8));
            return result.into();
        }
    };

    let request = ObservedRequest {
        url,
        tab_id,
        tab_url: tab_url.as_deref(),
    };
    let verdict = engine.on_request_observed(&request);

    let _ = js_sys::Reflect::set(&result, &"verdict".into(), &JsValue::from(verdict as u8));
    if verdict.is_blocked() {
        if let Some(tracker) = engine.resolve(url) {
            let _ = js_sys::Reflect::set(&result, &"tracker".into(), &JsValue::from_str(&tracker.name));
        }
    }

    result.into()
}

#[wasm_bindgen]
pub fn on_tab_closed(tab_id: i32) {
    if let Some(engine) = ENGINE.get() {
        engine.on_tab_closed(tab_id);
    }
}

// =============================================================================
// Popup
// =============================================================================

/// `{ trackers: [{ name, blockedCount, isBlocked }] }`, or `null` for a tab
/// without state.
#[wasm_bindgen]
pub fn get_popup_data(tab_id: i32) -> JsValue {
    match ENGINE.get().and_then(|engine| engine.popup_data(tab_id)) {
        Some(data) => to_js(&data),
        None => JsValue::NULL,
    }
}

#[wasm_bindgen]
pub fn set_tracker_blocked(tab_id: i32, tracker: &str, blocked: bool) {
    if let Some(engine) = ENGINE.get() {
        engine.set_tracker_blocked(tab_id, tracker, blocked);
    }
}

#[wasm_bindgen]
pub fn unblock_all(tab_id: i32) {
    if let Some(engine) = ENGINE.get() {
        engine.unblock_all(tab_id);
    }
}

// =============================================================================
// Content script
// =============================================================================

/// `{ trackers: [...], replace: { name: bool } }`, or `null` for a tab
/// without state.
#[wasm_bindgen]
pub fn get_button_replacement_plan(tab_id: i32) -> JsValue {
    match ENGINE.get().and_then(|engine| engine.button_replacement_plan(tab_id)) {
        Some(plan) => to_js(&plan),
        None => JsValue::NULL,
    }
}

#[wasm_bindgen]
pub fn on_button_clicked(tab_id: i32, tracker: &str) {
    if let Some(engine) = ENGINE.get() {
        engine.on_button_clicked(tab_id, tracker);
    }
}

/// URL the clicked placeholder of `tracker` should load on `page_url`.
#[wasm_bindgen]
pub fn replacement_target_url(tracker: &str, page_url: &str) -> Option<String> {
    let engine = ENGINE.get()?;
    engine
        .registry()
        .get(tracker)?
        .replacement_button
        .target_url(page_url)
}

#[wasm_bindgen]
pub fn resolve_tracker(url: &str) -> Option<String> {
    ENGINE
        .get()?
        .resolve(url)
        .map(|tracker| tracker.name.clone())
}

fn parse_preferences(text: Option<&str>) -> Result<Preferences, JsValue> {
    match text {
        Some(text) => Preferences::from_json(text)
            .map_err(|e| JsValue::from_str(&format!("Failed to load preferences: {}", e))),
        None => Ok(Preferences::default()),
    }
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    let text = match serde_json::to_string(value) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize view: {e}");
            return JsValue::NULL;
        }
    };
    js_sys::JSON::parse(&text).unwrap_or(JsValue::NULL)
}
