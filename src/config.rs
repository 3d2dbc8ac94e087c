use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::{Error, Result};
use crate::notify::{FlashBoard, DEFAULT_FLASH_FADE_MS, DEFAULT_FLASH_TTL_SECS};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TemplateSource {
    /// Fetch fragments from the server's static assets.
    #[default]
    Remote,
    /// Use the fragments compiled into the binary.
    Builtin,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Html,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlashConfig {
    pub ttl_secs: u64,
    pub fade_ms: u64,
}

impl FlashConfig {
    pub fn board(&self) -> Result<FlashBoard> {
        FlashBoard::new(self.ttl_secs, self.fade_ms)
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_FLASH_TTL_SECS,
            fade_ms: DEFAULT_FLASH_FADE_MS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: String,
    pub templates: TemplateSource,
    pub download_dir: PathBuf,
    pub fetch_plots: bool,
    pub format: OutputFormat,
    pub flash: FlashConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            templates: TemplateSource::default(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            fetch_plots: false,
            format: OutputFormat::default(),
            flash: FlashConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<ClientConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

/// File values first (when `--config` is given), then command-line flags.
pub fn build_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if args.builtin_templates {
        config.templates = TemplateSource::Builtin;
    }
    if let Some(dir) = &args.download_dir {
        config.download_dir = dir.clone();
    }
    if let Some(format) = args.format {
        config.format = format;
    }
    if args.fetch_plots {
        config.fetch_plots = true;
    }

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &ClientConfig) -> Result<()> {
    let url = Url::parse(&config.base_url)
        .map_err(|_| Error::InvalidBaseUrl(config.base_url.clone()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(Error::InvalidBaseUrl(config.base_url.clone()));
    }
    config.flash.board()?;
    Ok(())
}
