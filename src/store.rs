//! Explicit state container for a studio session.
//!
//! [`SettingsStore`] owns the current [`QRSettings`] and is the single place
//! where edits are applied. Every edit goes through [`SettingsStore::update`],
//! which works on a copy and then normalizes it:
//!
//! - a hand edit clears [`QRSettings::preset_key`]
//! - a logo large enough to threaten scannability forces ECC `H`
//! - mode `none` drops any embedded logo data
//! - a change to a logo input (mode, source, corner radius) starts a new
//!   logo generation
//!
//! # Logo Jobs
//!
//! Corner rounding runs asynchronously. A [`LogoJob`] captures the generation
//! and inputs it was started for; [`SettingsStore::complete_logo_job`] only
//! applies its result if both still match, so a slow job for an old radius
//! can never overwrite the result for the current one.
//!
//! ```
//! use qrgen::SettingsStore;
//! use qrgen::settings::LogoMode;
//!
//! let mut store = SettingsStore::default();
//! store.update(|s| {
//!     s.logo.mode = LogoMode::External;
//!     s.logo.external_url = Some("https://example.com/logo.png".into());
//! });
//!
//! let job = store.begin_logo_job().unwrap();
//! store.update(|s| s.logo.corner_radius = 40.0);
//!
//! // The radius changed while the job was in flight.
//! assert!(!store.complete_logo_job(&job, Some("data:image/png;base64,AAAA".into())));
//! assert!(store.settings().logo.processed_data_url.is_none());
//! ```

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::compiler::{CompileOverrides, OptionsCompiler, RenderOptions, is_logo_coverage_risky};
use crate::preset::{self, Preset};
use crate::settings::{ErrorCorrection, LogoMode, QRSettings};
use crate::url_state;

/// How long a [`Notice`] stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Message shown when ECC is raised for a large logo.
pub const HIGH_ECC_NOTICE: &str = "ECC bumped to \u{201c}H\u{201d} to protect the embedded logo.";

// ============================================================================
// Notices
// ============================================================================

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeTone {
    Info,
    Success,
    Warning,
    Error,
}

/// An auto-dismissing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub tone: NoticeTone,
    pub issued_at: Instant,
}

impl Notice {
    /// Returns true once [`NOTICE_TTL`] has elapsed.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.issued_at) >= NOTICE_TTL
    }
}

// ============================================================================
// Logo Jobs
// ============================================================================

/// Inputs captured when a logo processing job starts.
#[derive(Debug, Clone, PartialEq)]
pub struct LogoJob {
    pub generation: u64,
    pub source: String,
    pub radius: f32,
}

/// The logo fields that invalidate a processed image.
#[derive(Debug, PartialEq)]
struct LogoInputs<'a> {
    mode: LogoMode,
    source: Option<&'a str>,
    radius: f32,
}

impl<'a> LogoInputs<'a> {
    fn of(settings: &'a QRSettings) -> Self {
        Self {
            mode: settings.logo.mode,
            source: settings.logo.source(),
            radius: settings.logo.corner_radius,
        }
    }
}

// ============================================================================
// SettingsStore
// ============================================================================

/// Owns the settings of one session.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: QRSettings,
    compiler: OptionsCompiler,
    generation: u64,
    notice: Option<Notice>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(QRSettings::default())
    }
}

impl SettingsStore {
    /// Creates a store holding `initial`.
    pub fn new(initial: QRSettings) -> Self {
        let mut settings = initial.clamped();
        ensure_high_ecc(&mut settings);
        Self {
            settings,
            compiler: OptionsCompiler::default(),
            generation: 0,
            notice: None,
        }
    }

    /// Uses the given compiler for [`render_options`](Self::render_options).
    pub fn with_compiler(mut self, compiler: OptionsCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// The current settings.
    pub fn settings(&self) -> &QRSettings {
        &self.settings
    }

    /// The current logo generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the settings with the state encoded in a query string.
    ///
    /// Returns false, leaving the settings unchanged, if the query carries no
    /// valid state.
    pub fn hydrate_from_search(&mut self, search: &str) -> bool {
        let Some(mut decoded) = url_state::decode_settings_from_search(search) else {
            return false;
        };
        ensure_high_ecc(&mut decoded);
        self.replace(decoded);
        debug!(generation = self.generation, "hydrated settings from URL");
        true
    }

    /// Applies a hand edit.
    ///
    /// The updater works on a copy; the copy is normalized and then replaces
    /// the current value.
    pub fn update(&mut self, updater: impl FnOnce(&mut QRSettings)) {
        let mut next = self.settings.clone();
        updater(&mut next);

        if next.preset_key == self.settings.preset_key && differs_beyond_preset(&self.settings, &next)
        {
            next.preset_key = None;
        }

        if ensure_high_ecc(&mut next) {
            self.post(HIGH_ECC_NOTICE, NoticeTone::Warning, Instant::now());
        }

        self.replace(next);
    }

    /// Applies a preset's style fields.
    pub fn apply_preset(&mut self, preset: &Preset) {
        let mut next = preset::apply_preset(&self.settings, preset);
        ensure_high_ecc(&mut next);
        self.replace(next);
    }

    fn replace(&mut self, next: QRSettings) {
        // Out-of-range values are pulled into range, never rejected.
        let mut next = next.clamped();
        if next.logo.mode == LogoMode::None {
            next.logo.raw_data_url = None;
            next.logo.processed_data_url = None;
        }

        let previous = LogoInputs::of(&self.settings);
        let current = LogoInputs::of(&next);
        if previous != current {
            if previous.mode != current.mode || previous.source != current.source {
                next.logo.processed_data_url = None;
            }
            self.generation = self.generation.wrapping_add(1);
        }

        self.settings = next;
    }

    /// Compiles the current settings.
    pub fn render_options(&self, overrides: CompileOverrides) -> RenderOptions {
        self.compiler.compile(&self.settings, overrides)
    }

    /// Builds the shareable link for the current settings.
    pub fn share_url(&self, location: &Url) -> Option<Url> {
        url_state::encode_settings_to_url(&self.settings, location)
    }

    // ------------------------------------------------------------------------
    // Logo jobs
    // ------------------------------------------------------------------------

    /// Captures the inputs for a corner-rounding job.
    ///
    /// Returns `None` when the current mode has no source.
    pub fn begin_logo_job(&self) -> Option<LogoJob> {
        let source = self.settings.logo.source()?;
        Some(LogoJob {
            generation: self.generation,
            source: source.to_string(),
            radius: self.settings.logo.corner_radius,
        })
    }

    /// Applies a job result if the job is still current.
    ///
    /// Returns true if the processed image was stored.
    pub fn complete_logo_job(&mut self, job: &LogoJob, processed: Option<String>) -> bool {
        let Some(processed) = processed else {
            return false;
        };

        let logo = &self.settings.logo;
        let current = job.generation == self.generation
            && logo.source() == Some(job.source.as_str())
            && logo.corner_radius == job.radius;
        if !current {
            debug!(
                job = job.generation,
                current = self.generation,
                "dropping stale logo result"
            );
            return false;
        }

        if logo.processed_data_url.as_deref() == Some(processed.as_str()) {
            return false;
        }

        self.settings.logo.processed_data_url = Some(processed);
        true
    }

    /// Rounds the current logo and stores the result if still current.
    #[cfg(feature = "runtime")]
    pub async fn refresh_logo(&mut self) -> bool {
        let Some(job) = self.begin_logo_job() else {
            return false;
        };
        let processed = crate::logo::process_logo(job.source.clone(), job.radius).await;
        self.complete_logo_job(&job, processed)
    }

    // ------------------------------------------------------------------------
    // Notices
    // ------------------------------------------------------------------------

    /// Posts a status message, replacing any current one.
    pub fn notify(&mut self, message: impl Into<String>, tone: NoticeTone, now: Instant) {
        self.post(message, tone, now);
    }

    fn post(&mut self, message: impl Into<String>, tone: NoticeTone, now: Instant) {
        let message = message.into();
        if tone == NoticeTone::Warning || tone == NoticeTone::Error {
            warn!("{message}");
        }
        self.notice = Some(Notice {
            message,
            tone,
            issued_at: now,
        });
    }

    /// The status message visible at `now`, if any.
    pub fn notice(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| !n.is_expired(now))
    }

    /// Dismisses the current status message.
    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}

/// Forces ECC `H` for a risky logo. Returns true if the level was raised.
fn ensure_high_ecc(settings: &mut QRSettings) -> bool {
    if !is_logo_coverage_risky(settings) {
        return false;
    }
    settings.ecc = ErrorCorrection::H;
    settings.preset_key = None;
    true
}

fn differs_beyond_preset(a: &QRSettings, b: &QRSettings) -> bool {
    QRSettings {
        preset_key: None,
        ..a.clone()
    } != QRSettings {
        preset_key: None,
        ..b.clone()
    }
}
