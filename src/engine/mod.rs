//! Render engines consuming [`RenderOptions`].
//!
//! The browser studio hands compiled options to an external styling engine.
//! [`RenderEngine`] captures that contract: an engine is built once from an
//! initial set of options, then only ever changed through
//! [`update`](RenderEngine::update), and can produce encoded image bytes on
//! demand.
//!
//! [`RasterEngine`] is the native implementation. It lays the code out once
//! as a list of [`Shape`]s (see [`layout`]) and then either rasterizes them
//! with tiny-skia or writes them out as an SVG document.
//!
//! ```
//! use qrgen::engine::{RasterEngine, RenderEngine};
//! use qrgen::export::ExportFormat;
//! use qrgen::{compile, CompileOverrides, QRSettings};
//!
//! let options = compile(&QRSettings::default(), CompileOverrides::default());
//! let mut engine = RasterEngine::from_options(&options);
//!
//! let png = engine.raw_data(ExportFormat::Png).unwrap();
//! assert_eq!(&png[1..4], b"PNG");
//!
//! let mut larger = options.clone();
//! larger.width = 640;
//! larger.height = 640;
//! engine.update(&larger);
//! assert_eq!(engine.render().unwrap().width(), 640);
//! ```

pub mod layout;
mod raster;
mod svg;

pub use layout::{Geometry, LogoBox, Matrix, PathSink, Shape, layout};
pub use raster::{RasterEngine, composite_over};

use qrcode::EcLevel;

use crate::compiler::RenderOptions;
use crate::error::RenderError;
use crate::export::ExportFormat;
use crate::settings::ErrorCorrection;

/// A QR styling engine.
pub trait RenderEngine {
    /// Builds the engine with its initial options.
    fn from_options(options: &RenderOptions) -> Self
    where
        Self: Sized;

    /// Replaces every rendering parameter.
    fn update(&mut self, options: &RenderOptions);

    /// The options currently in effect.
    fn options(&self) -> &RenderOptions;

    /// Renders the current options and encodes them in `format`.
    fn raw_data(&self, format: ExportFormat) -> Result<Vec<u8>, RenderError>;
}

impl From<ErrorCorrection> for EcLevel {
    fn from(ecc: ErrorCorrection) -> Self {
        match ecc {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        }
    }
}
