//! Shareable-link encoding of [`QRSettings`].
//!
//! Settings travel in a single `config` query parameter holding base64-encoded
//! JSON. The encoding is byte-compatible with the browser studio, which
//! percent-encodes the JSON and maps each escape back to a byte before calling
//! `btoa`: both produce the base64 of the UTF-8 bytes.
//!
//! The round trip is deliberately lossy. Embedded image data is stripped to
//! keep links short, and uploaded logos collapse to no logo because an upload
//! cannot be recreated from a URL.
//!
//! ```
//! use qrgen::url_state::{decode_settings_from_url, encode_settings_to_url};
//! use qrgen::QRSettings;
//! use url::Url;
//!
//! let location = Url::parse("https://studio.example/?theme=dark").unwrap();
//! let settings = QRSettings::default().with_text("https://example.com");
//!
//! let shared = encode_settings_to_url(&settings, &location).unwrap();
//! assert!(shared.query().unwrap().contains("config="));
//!
//! let restored = decode_settings_from_url(&shared).unwrap();
//! assert_eq!(restored.text, "https://example.com");
//! ```

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::warn;
use url::Url;

use crate::settings::{LogoMode, QRSettings};

/// Query parameter carrying the encoded settings.
pub const PARAM_KEY: &str = "config";

/// Accepts tokens with or without `=` padding, as `atob` does.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Returns the redacted copy of `settings` that is safe to put in a link.
pub fn share_ready(settings: &QRSettings) -> QRSettings {
    let mut shared = settings.clone();
    // Embedded image payloads never travel in a link, whatever the mode.
    shared.logo.processed_data_url = None;
    shared.logo.raw_data_url = None;
    if shared.logo.mode == LogoMode::Upload {
        shared.logo.mode = LogoMode::None;
    }
    shared
}

/// Encodes the redacted settings into a `config` token.
pub fn encode_settings(settings: &QRSettings) -> Result<String, serde_json::Error> {
    let json = share_ready(settings).to_json()?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Returns a copy of `location` with the `config` parameter set to the
/// encoded settings. Other query parameters are preserved.
///
/// Returns `None` (after logging) if the settings cannot be serialized.
pub fn encode_settings_to_url(settings: &QRSettings, location: &Url) -> Option<Url> {
    let token = match encode_settings(settings) {
        Ok(token) => token,
        Err(e) => {
            warn!("failed to encode settings for URL: {e}");
            return None;
        }
    };

    let retained: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(key, _)| key != PARAM_KEY)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut url = location.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PARAM_KEY, &token);
    Some(url)
}

/// Decodes a `config` token into settings.
///
/// Returns `None` (after logging) on malformed base64, invalid UTF-8 or
/// invalid JSON. Missing fields are healed from the defaults.
pub fn decode_settings(token: &str) -> Option<QRSettings> {
    let bytes = match LENIENT.decode(token.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("unable to decode URL state: {e}");
            return None;
        }
    };

    let json = match String::from_utf8(bytes) {
        Ok(json) => json,
        Err(e) => {
            warn!("URL state is not valid UTF-8: {e}");
            return None;
        }
    };

    match QRSettings::from_json(&json) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!("unable to parse settings from URL: {e}");
            None
        }
    }
}

/// Reads the `config` parameter from a query string (leading `?` optional).
pub fn decode_settings_from_search(search: &str) -> Option<QRSettings> {
    let query = search.strip_prefix('?').unwrap_or(search);
    let token = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == PARAM_KEY)
        .map(|(_, value)| value.into_owned())?;

    if token.is_empty() {
        return None;
    }
    decode_settings(&token)
}

/// Reads the `config` parameter from a full URL.
pub fn decode_settings_from_url(url: &Url) -> Option<QRSettings> {
    decode_settings_from_search(url.query().unwrap_or(""))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DotStyle, ErrorCorrection, GradientType, LogoConfig};

    fn location() -> Url {
        Url::parse("https://studio.example/app").unwrap()
    }

    fn roundtrip(settings: &QRSettings) -> QRSettings {
        let url = encode_settings_to_url(settings, &location()).unwrap();
        decode_settings_from_url(&url).unwrap()
    }

    #[test]
    fn roundtrip_preserves_plain_settings() {
        let mut settings = QRSettings::default()
            .with_text("Grüße, 世界 🚀")
            .with_ecc(ErrorCorrection::Q);
        settings.dot_style = DotStyle::Classy;
        settings.gradient.kind = GradientType::Radial;
        settings.gradient.rotation = 12.5;
        settings.transparent_background = true;
        settings.preset_key = None;

        assert_eq!(roundtrip(&settings), settings);
    }

    #[test]
    fn upload_logo_collapses_to_none() {
        let settings = QRSettings::default().with_logo(LogoConfig {
            mode: LogoMode::Upload,
            raw_data_url: Some("data:image/png;base64,AAAA".into()),
            processed_data_url: Some("data:image/png;base64,BBBB".into()),
            scale: 0.3,
            ..LogoConfig::default()
        });

        let restored = roundtrip(&settings);
        assert_eq!(restored.logo.mode, LogoMode::None);
        assert_eq!(restored.logo.raw_data_url, None);
        assert_eq!(restored.logo.processed_data_url, None);
        assert_eq!(restored.logo.scale, 0.3);
    }

    #[test]
    fn external_logo_keeps_url_but_drops_processed() {
        let settings = QRSettings::default().with_logo(LogoConfig {
            mode: LogoMode::External,
            external_url: Some("https://example.com/logo.png".into()),
            processed_data_url: Some("data:image/png;base64,BBBB".into()),
            ..LogoConfig::default()
        });

        let restored = roundtrip(&settings);
        assert_eq!(restored.logo.mode, LogoMode::External);
        assert_eq!(
            restored.logo.external_url.as_deref(),
            Some("https://example.com/logo.png")
        );
        assert_eq!(restored.logo.processed_data_url, None);
        assert_eq!(restored, share_ready(&settings));
    }

    #[test]
    fn stale_upload_data_is_dropped_for_external_logo() {
        let upload = format!("data:image/png;base64,{}", "A".repeat(20_000));
        let settings = QRSettings::default().with_logo(LogoConfig {
            mode: LogoMode::External,
            raw_data_url: Some(upload),
            external_url: Some("https://example.com/logo.png".into()),
            ..LogoConfig::default()
        });

        let url = encode_settings_to_url(&settings, &location()).unwrap();
        assert!(url.as_str().len() < 2_000);

        let restored = decode_settings_from_url(&url).unwrap();
        assert_eq!(restored.logo.mode, LogoMode::External);
        assert_eq!(restored.logo.raw_data_url, None);
        assert_eq!(
            restored.logo.external_url.as_deref(),
            Some("https://example.com/logo.png")
        );
    }

    #[test]
    fn encoded_token_is_base64_json() {
        let settings = QRSettings::default().with_text("https://example.com");
        let url = encode_settings_to_url(&settings, &location()).unwrap();

        let token = url
            .query_pairs()
            .find(|(key, _)| key == PARAM_KEY)
            .map(|(_, value)| value.into_owned())
            .unwrap();
        let json = String::from_utf8(STANDARD.decode(token).unwrap()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["text"], "https://example.com");
        assert_eq!(value["size"], 320);
        assert_eq!(value["ecc"], "M");
    }

    #[test]
    fn matches_browser_encoding_of_non_latin1_text() {
        // btoa(unescape(encodeURIComponent('{"text":"é"}')))
        assert_eq!(STANDARD.encode(r#"{"text":"é"}"#), "eyJ0ZXh0Ijoiw6kifQ==");
        let settings = decode_settings("eyJ0ZXh0Ijoiw6kifQ==").unwrap();
        assert_eq!(settings.text, "é");
    }

    #[test]
    fn encode_replaces_existing_config_and_keeps_other_params() {
        let location = Url::parse("https://studio.example/?config=stale&theme=dark").unwrap();
        let url = encode_settings_to_url(&QRSettings::default(), &location).unwrap();

        let configs: Vec<_> = url.query_pairs().filter(|(k, _)| k == PARAM_KEY).collect();
        assert_eq!(configs.len(), 1);
        assert_ne!(configs[0].1, "stale");
        assert!(url.query_pairs().any(|(k, v)| k == "theme" && v == "dark"));
        assert_eq!(location.query(), Some("config=stale&theme=dark"));
    }

    #[test]
    fn decode_accepts_leading_question_mark_and_missing_padding() {
        let token = STANDARD.encode(r#"{"text":"ab"}"#);
        let unpadded = token.trim_end_matches('=');
        let search = format!("?{PARAM_KEY}={}", url::form_urlencoded::byte_serialize(unpadded.as_bytes()).collect::<String>());

        assert_eq!(decode_settings_from_search(&search).unwrap().text, "ab");
    }

    #[test]
    fn invalid_base64_returns_none() {
        assert!(decode_settings_from_search("config=%%%not-base64!!").is_none());
    }

    #[test]
    fn invalid_json_returns_none() {
        let token = STANDARD.encode("{not json");
        let search = format!("config={}", url::form_urlencoded::byte_serialize(token.as_bytes()).collect::<String>());
        assert!(decode_settings_from_search(&search).is_none());
    }

    #[test]
    fn missing_parameter_returns_none() {
        assert!(decode_settings_from_search("").is_none());
        assert!(decode_settings_from_search("?theme=dark").is_none());
        assert!(decode_settings_from_search("?config=").is_none());
    }

    #[test]
    fn partial_payload_is_healed_with_defaults() {
        let token = STANDARD.encode(r#"{"text":"hi","logo":{"mode":"external"}}"#);
        let settings = decode_settings(&token).unwrap();

        assert_eq!(settings.text, "hi");
        assert_eq!(settings.size, 320);
        assert_eq!(settings.logo.mode, LogoMode::External);
        assert_eq!(settings.logo.corner_radius, 18.0);
    }
}
