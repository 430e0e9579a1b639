//! `data:` URL parsing and construction.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::LogoError;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// The media type, lowercased, without parameters. Defaults to `text/plain`.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parses `data:[<mime>][;param]*[;base64],<payload>`.
    ///
    /// Base64 payloads may omit padding and contain whitespace. Other payloads
    /// are percent-decoded.
    pub fn parse(url: &str) -> Result<Self, LogoError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| LogoError::MalformedDataUrl("missing `data:` prefix".into()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| LogoError::MalformedDataUrl("missing `,` separator".into()))?;

        let mut params = meta.split(';');
        let mime = params
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("text/plain")
            .to_ascii_lowercase();
        let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        let bytes = if is_base64 {
            let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
            LENIENT
                .decode(compact)
                .map_err(|e| LogoError::MalformedDataUrl(e.to_string()))?
        } else {
            percent_encoding::percent_decode_str(payload).collect()
        };

        Ok(Self { mime, bytes })
    }

    /// Returns true if the payload is SVG markup.
    pub fn is_svg(&self) -> bool {
        self.mime == "image/svg+xml"
    }
}

/// Returns true if `source` is a `data:` URL.
pub fn is_data_url(source: &str) -> bool {
    source.trim_start().starts_with("data:")
}

/// Builds a base64 `data:` URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
