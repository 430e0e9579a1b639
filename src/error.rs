//! Error types for the fallible edges of the crate.
//!
//! The compiler and the URL codec never fail loudly: they return plain values
//! or `Option`. Errors only surface where I/O or image decoding is involved,
//! and callers are expected to degrade (keep the previous state, fall back to
//! the unprocessed logo) rather than abort.

use thiserror::Error;

/// Failure while loading or post-processing a logo image.
#[derive(Debug, Error)]
pub enum LogoError {
    /// The source is a remote URL, which the core cannot fetch.
    #[error("remote logo sources cannot be loaded locally: {0}")]
    RemoteSource(String),

    /// The `data:` URL could not be parsed.
    #[error("malformed data URL: {0}")]
    MalformedDataUrl(String),

    /// The bytes are not a supported image.
    #[error("unsupported image data: {0}")]
    Unsupported(String),

    /// The file exceeds the upload size cap.
    #[error("logo is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The image has a zero dimension.
    #[error("logo image is empty")]
    Empty,

    #[error("failed to decode logo image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to read logo: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while rendering a QR code through an engine.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The payload does not fit in a QR code at the chosen ECC level.
    #[error("payload cannot be encoded: {0}")]
    Encode(#[from] qrcode::types::QrError),

    /// The requested size leaves no room for modules after the margin.
    #[error("{size}px is too small for a {modules}-module code with a {margin}px margin")]
    TooSmall { size: u32, margin: u32, modules: u32 },

    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Failure while exporting a rendered code.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The clipboard rejected the write.
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    /// The settings could not be turned into a share link.
    #[error("settings could not be encoded into a link")]
    ShareLink,

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while loading runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
