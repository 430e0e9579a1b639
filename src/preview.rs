//! Live preview: settings in, engine updates out.
//!
//! The engine is built from the first settings value and afterwards only
//! updated. Settings that compile to the options already in effect are
//! skipped.
//!
//! ```
//! use qrgen::engine::{RasterEngine, RenderEngine};
//! use qrgen::preview::PreviewDriver;
//! use qrgen::QRSettings;
//!
//! let mut preview = PreviewDriver::<RasterEngine>::default();
//! assert!(preview.engine().is_none());
//!
//! preview.apply(&QRSettings::default().with_text("first"));
//! preview.apply(&QRSettings::default().with_text("second"));
//!
//! assert_eq!(preview.engine().unwrap().options().data, "second");
//! assert_eq!(preview.updates(), 1);
//! ```

use tracing::debug;

use crate::compiler::{CompileOverrides, OptionsCompiler};
use crate::engine::RenderEngine;
use crate::settings::QRSettings;

#[cfg(feature = "runtime")]
use crate::debounce::Debounced;

/// Owns the preview engine.
#[derive(Debug)]
pub struct PreviewDriver<E> {
    compiler: OptionsCompiler,
    engine: Option<E>,
    updates: u64,
}

impl<E> Default for PreviewDriver<E> {
    fn default() -> Self {
        Self::new(OptionsCompiler::default())
    }
}

impl<E> PreviewDriver<E> {
    /// Creates a driver with no engine; the first settings value builds one.
    pub fn new(compiler: OptionsCompiler) -> Self {
        Self {
            compiler,
            engine: None,
            updates: 0,
        }
    }

    /// The engine, once the first settings value has been applied.
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Number of `update` calls made on the engine since construction.
    pub fn updates(&self) -> u64 {
        self.updates
    }
}

impl<E: RenderEngine> PreviewDriver<E> {
    /// Compiles `settings` and pushes them into the engine.
    pub fn apply(&mut self, settings: &QRSettings) -> &E {
        let options = self.compiler.compile(settings, CompileOverrides::default());
        match &mut self.engine {
            Some(engine) => {
                if engine.options() != &options {
                    engine.update(&options);
                    self.updates += 1;
                    debug!(updates = self.updates, "preview updated");
                }
            }
            None => debug!("preview engine created"),
        }
        self.engine.get_or_insert_with(|| E::from_options(&options))
    }

    /// Applies each settled value until the channel closes.
    ///
    /// `on_update` runs after every applied value.
    #[cfg(feature = "runtime")]
    pub async fn drive(&mut self, mut settings: Debounced<QRSettings>, mut on_update: impl FnMut(&E)) {
        while let Some(next) = settings.next().await {
            let engine = self.apply(&next);
            on_update(engine);
        }
    }
}
