use anyhow::{bail, Context};
use config::{Config, Environment, File};
use engine::{star_value_fits_scale, MusicConfig, MAX_SCALE, MAX_STARS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub music: MusicConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LoggingFormatConfig,
    pub levels: LoggingLevelsConfig,
    pub redaction: RedactionConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingFormatConfig {
    pub show_time: bool,
    pub show_target: bool,
    pub show_line: bool,
    pub json: bool,
}

impl Default for LoggingFormatConfig {
    fn default() -> Self {
        Self {
            show_time: true,
            show_target: false,
            show_line: false,
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingLevelsConfig {
    pub debug: bool,
    pub info: bool,
    pub warning: bool,
    pub error: bool,
}

impl Default for LoggingLevelsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            info: false,
            warning: true,
            error: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub patterns: Vec<RedactionPattern>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedactionPattern {
    pub name: String,
    pub regex: String,
    pub placeholder: String,
}

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Load the configuration once; later calls return the first result.
pub fn init_config(explicit: Option<&Path>) -> anyhow::Result<&'static AppConfig> {
    if let Some(cfg) = CONFIG.get() {
        return Ok(cfg);
    }
    let cfg = load_config(explicit)?;
    Ok(CONFIG.get_or_init(|| cfg))
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut builder = Config::builder()
        // Shared defaults, then a local untracked override
        .add_source(File::with_name("musicctl").required(false))
        .add_source(File::with_name(".musicctl").required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(File::from(path).required(true));
    }

    // MUSICCTL_MUSIC__STAR_VALUE=20 -> music.star_value
    builder = builder.add_source(
        Environment::with_prefix("MUSICCTL")
            .prefix_separator("_")
            .separator("__"),
    );

    let cfg: AppConfig = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .context("failed to load configuration")?;

    if !star_value_fits_scale(cfg.music.star_value) {
        bail!(
            "music.star_value must be in 1..={} so {} stars stay within 0..={}, got {}",
            MAX_SCALE / u32::from(MAX_STARS),
            MAX_STARS,
            MAX_SCALE,
            cfg.music.star_value
        );
    }
    if cfg.music.app_name.trim().is_empty() {
        bail!("music.app_name must not be empty");
    }
    Ok(cfg)
}
