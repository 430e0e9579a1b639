//! Command-line front end.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use url::Url;

use qrgen::color::describe_contrast;
use qrgen::compiler::{CompileOverrides, is_logo_coverage_risky};
use qrgen::config::StudioConfig;
use qrgen::debounce::debounce;
use qrgen::export::{ExportConfig, ExportFormat, SizePreset, export_qr_with};
use qrgen::logo::{DataUrl, is_data_url, read_logo_file, round_corners};
use qrgen::preset::{PRESETS, find_preset, matching_preset};
use qrgen::preview::PreviewDriver;
use qrgen::url_state::{decode_settings, decode_settings_from_search, decode_settings_from_url};
use qrgen::{
    ErrorCorrection, LogoMode, QRSettings, RasterEngine, RenderEngine, SettingsStore, logging,
};

#[derive(Parser, Debug)]
#[command(name = "qrgen", version, about = "Styled QR code generator")]
struct Cli {
    /// Configuration file. Defaults to qrgen.toml in the working directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the render options compiled from the settings
    Compile {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Override the output size
        #[arg(long)]
        size: Option<u32>,

        /// Override background transparency
        #[arg(long)]
        transparent: Option<bool>,
    },

    /// Print a shareable link for the settings
    Share {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Page the link points at
        #[arg(long, value_name = "URL", default_value = "http://localhost:5173/")]
        base: Url,
    },

    /// Print the settings carried by a link, query string, or bare token
    Decode {
        link: String,
    },

    /// Render the QR code to a file
    Export {
        #[command(flatten)]
        settings: SettingsArgs,

        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Edge length in pixels
        #[arg(long, conflicts_with = "preset_size")]
        size: Option<u32>,

        /// Named edge length
        #[arg(long = "size-preset", value_enum)]
        preset_size: Option<SizePreset>,

        /// Keep the background transparent (PNG only)
        #[arg(long)]
        transparent: Option<bool>,

        /// Base file name
        #[arg(long)]
        name: Option<String>,

        /// Output directory
        #[arg(long, short, value_name = "DIR", default_value = ".")]
        out: PathBuf,

        /// Write the encoded image to stdout instead of a file
        #[arg(long, conflicts_with = "out")]
        stdout: bool,
    },

    /// Round the corners of a logo image
    RoundLogo {
        /// Image path or data URL
        source: String,

        /// Corner radius as a percentage of the shorter side
        #[arg(long, default_value_t = 18.0)]
        radius: f32,

        /// Write a PNG here instead of printing a data URL
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Report contrast, logo coverage, and matching preset
    Inspect {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// List built-in style presets
    Presets,

    /// Re-render a file whenever settings arrive on stdin, one JSON object per line
    Watch {
        /// File rewritten after each settled change
        #[arg(long, short, value_name = "PATH", default_value = "qr-preview.png")]
        out: PathBuf,

        #[arg(long, value_enum, default_value = "png")]
        format: ExportFormat,
    },
}

/// Where the settings come from, plus hand edits on top.
#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON settings file
    #[arg(long, value_name = "PATH", conflicts_with = "from_url")]
    settings: Option<PathBuf>,

    /// Share link to read settings from
    #[arg(long, value_name = "URL")]
    from_url: Option<Url>,

    /// Style preset applied before other edits
    #[arg(long, value_name = "KEY")]
    preset: Option<String>,

    /// Payload to encode
    #[arg(long)]
    text: Option<String>,

    #[arg(long, value_enum)]
    ecc: Option<ErrorCorrection>,

    /// Logo image file
    #[arg(long, value_name = "PATH", conflicts_with = "logo_url")]
    logo: Option<PathBuf>,

    /// Remote logo URL
    #[arg(long, value_name = "URL")]
    logo_url: Option<String>,

    /// Logo size as a fraction of the code
    #[arg(long)]
    logo_scale: Option<f32>,

    /// Logo corner radius as a percentage
    #[arg(long)]
    logo_radius: Option<f32>,
}

impl SettingsArgs {
    async fn load(&self, config: &StudioConfig) -> anyhow::Result<SettingsStore> {
        let initial = if let Some(path) = &self.settings {
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings from {}", path.display()))?;
            QRSettings::from_json(&json)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        } else if let Some(url) = &self.from_url {
            decode_settings_from_url(url).context("link carries no valid settings")?
        } else {
            QRSettings::default()
        };

        let mut store = SettingsStore::new(initial).with_compiler(config.options_compiler());

        if let Some(key) = &self.preset {
            let preset = find_preset(key).with_context(|| format!("unknown preset '{key}'"))?;
            store.apply_preset(preset);
        }

        let logo = match (&self.logo, &self.logo_url) {
            (Some(path), _) => Some((
                LogoMode::Upload,
                read_logo_file(path, config.logo.max_upload_bytes)
                    .with_context(|| format!("failed to load logo {}", path.display()))?,
            )),
            (None, Some(url)) => Some((LogoMode::External, url.clone())),
            (None, None) => None,
        };

        store.update(|s| {
            if let Some(text) = &self.text {
                s.text = text.clone();
            }
            if let Some(ecc) = self.ecc {
                s.ecc = ecc;
            }
            if let Some(scale) = self.logo_scale {
                s.logo.scale = scale;
            }
            if let Some(radius) = self.logo_radius {
                s.logo.corner_radius = radius;
            }
            match logo {
                Some((LogoMode::Upload, source)) => {
                    s.logo.mode = LogoMode::Upload;
                    s.logo.raw_data_url = Some(source);
                }
                Some((mode, source)) => {
                    s.logo.mode = mode;
                    s.logo.external_url = Some(source);
                }
                None => {}
            }
        });

        if store.refresh_logo().await {
            debug!("logo corners rounded");
        }
        Ok(store)
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = StudioConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    logging::init(&config.logging)?;

    match cli.command {
        Command::Compile {
            settings,
            size,
            transparent,
        } => {
            let store = settings.load(&config).await?;
            print_json(&store.render_options(CompileOverrides { size, transparent }))?;
        }

        Command::Share { settings, base } => {
            let store = settings.load(&config).await?;
            let url = store
                .share_url(&base)
                .context("settings could not be encoded into a link")?;
            println!("{url}");
        }

        Command::Decode { link } => {
            let decoded = match Url::parse(&link) {
                Ok(url) => decode_settings_from_url(&url),
                Err(_) if link.contains('=') => decode_settings_from_search(&link),
                Err(_) => decode_settings(&link),
            };
            let Some(settings) = decoded else {
                bail!("no valid settings found in '{link}'");
            };
            print_json(&settings)?;
        }

        Command::Export {
            settings,
            format,
            size,
            preset_size,
            transparent,
            name,
            out,
            stdout,
        } => {
            let store = settings.load(&config).await?;

            let mut export = config.export.clone();
            if let Some(format) = format {
                export = ExportConfig {
                    format,
                    transparent: format.supports_transparency() && export.transparent,
                    ..export
                };
            }
            if let Some(size) = size.or(preset_size.map(SizePreset::pixels)) {
                export.size = size;
            }
            if let Some(transparent) = transparent {
                export.transparent = transparent;
            }
            if let Some(name) = name {
                export.file_name = name;
            }

            let artifact = export_qr_with(&config.options_compiler(), store.settings(), &export)?;
            if stdout {
                std::io::stdout()
                    .write_all(&artifact.bytes)
                    .context("failed to write to stdout")?;
            } else {
                let path = artifact.save_in(&out)?;
                println!("{}", path.display());
            }
        }

        Command::RoundLogo {
            source,
            radius,
            out,
        } => {
            let source = if is_data_url(&source) {
                source
            } else {
                read_logo_file(Path::new(&source), config.logo.max_upload_bytes)?
            };
            let rounded = round_corners(&source, radius)?;
            match out {
                Some(path) => {
                    let png = DataUrl::parse(&rounded)?;
                    fs::write(&path, png.bytes)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "wrote rounded logo");
                }
                None => println!("{rounded}"),
            }
        }

        Command::Inspect { settings } => {
            let store = settings.load(&config).await?;
            let current = store.settings();

            let contrast = describe_contrast(&current.foreground_color, &current.background_color);
            println!("contrast: {:.2}:1 ({})", contrast.ratio, contrast.level.label());
            println!("error correction: {:?}", current.ecc);
            if is_logo_coverage_risky(current) {
                println!("logo: large logo without high error correction may not scan");
            }
            match matching_preset(current) {
                Some(preset) => println!("preset: {}", preset.name),
                None => println!("preset: custom"),
            }
            if let Some(notice) = store.notice(Instant::now()) {
                println!("note: {}", notice.message);
            }
        }

        Command::Presets => {
            for preset in PRESETS {
                println!("{:<16} {:<16} {}", preset.key, preset.name, preset.description);
            }
        }

        Command::Watch { out, format } => {
            let (tx, rx) = debounce(config.preview.debounce());

            // Stdin is read on the blocking pool; each line goes through the
            // store so it is normalized like a hand edit.
            let reader = tokio::task::spawn_blocking(move || {
                let mut store = SettingsStore::default();
                for line in std::io::stdin().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("stopped reading stdin: {e}");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match QRSettings::from_json(&line) {
                        Ok(next) => {
                            store.update(|s| *s = next);
                            if !tx.send(store.settings().clone()) {
                                break;
                            }
                        }
                        Err(e) => warn!("skipping invalid settings line: {e}"),
                    }
                }
            });

            let mut preview = PreviewDriver::<RasterEngine>::new(config.options_compiler());
            preview
                .drive(rx, |engine| match engine.raw_data(format) {
                    Ok(bytes) => match fs::write(&out, bytes) {
                        Ok(()) => info!(path = %out.display(), "preview written"),
                        Err(e) => warn!("failed to write {}: {e}", out.display()),
                    },
                    Err(e) => warn!("preview render failed: {e}"),
                })
                .await;
            reader.await.context("stdin reader failed")?;
        }
    }

    Ok(())
}
