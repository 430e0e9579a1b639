//! JavaScript bindings.
//!
//! Only available with the `tsify` feature. Settings and render options
//! cross the boundary as plain objects typed by the generated TypeScript
//! definitions.
//!
//! ```javascript
//! import init, { compileOptions, encodeSettingsToUrl } from 'qrgen';
//!
//! await init();
//!
//! const options = compileOptions(settings, 2048, true);
//! qrCode.update(options);
//!
//! history.replaceState(null, '', encodeSettingsToUrl(settings, location.href));
//! ```

use serde::Serialize;
use url::Url;
use wasm_bindgen::prelude::*;

use crate::color::describe_contrast;
use crate::compiler::{CompileOverrides, RenderOptions, compile};
use crate::logo::round_corners;
use crate::settings::QRSettings;
use crate::url_state::{decode_settings_from_search, encode_settings_to_url};

/// Compiles settings into render options, with optional export overrides.
#[wasm_bindgen(js_name = "compileOptions")]
pub fn compile_options(settings: QRSettings, size: Option<u32>, transparent: Option<bool>) -> RenderOptions {
    compile(&settings, CompileOverrides { size, transparent })
}

/// Returns `location` with the settings stored in its query string.
#[wasm_bindgen(js_name = "encodeSettingsToUrl")]
pub fn encode_settings_to_url_js(settings: QRSettings, location: &str) -> Result<String, JsError> {
    let location = Url::parse(location).map_err(|e| JsError::new(&format!("Invalid location: {e}")))?;
    encode_settings_to_url(&settings, &location)
        .map(String::from)
        .ok_or_else(|| JsError::new("Settings could not be encoded"))
}

/// Reads settings from a query string. Returns `undefined` when absent or invalid.
#[wasm_bindgen(js_name = "decodeSettingsFromSearch")]
pub fn decode_settings_from_search_js(search: &str) -> Option<QRSettings> {
    decode_settings_from_search(search)
}

/// Rounds the corners of a logo, returning a PNG data URL.
#[wasm_bindgen(js_name = "roundCorners")]
pub fn round_corners_js(source: &str, radius_percent: f32) -> Result<String, JsError> {
    round_corners(source, radius_percent).map_err(|e| JsError::new(&e.to_string()))
}

/// Contrast between two hex colors as `{ ratio, label }`.
#[wasm_bindgen(js_name = "describeContrast")]
pub fn describe_contrast_js(foreground: &str, background: &str) -> Result<JsValue, JsError> {
    #[derive(Serialize)]
    struct Contrast {
        ratio: f32,
        label: &'static str,
    }

    let report = describe_contrast(foreground, background);
    let value = Contrast {
        ratio: report.ratio,
        label: report.level.label(),
    };
    serde_wasm_bindgen::to_value(&value).map_err(|e| JsError::new(&e.to_string()))
}
