//! Configuration System
//!
//! Layered configuration for providers, artifact storage, media encoding and logging.
//! Sources merge lowest to highest: built-in defaults, the global config file, the
//! workspace `config/` files, then `SHORTGEN__*` environment variables.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShortgenConfig {
    /// Generation provider endpoint and credentials
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Where generated artifacts are written
    #[serde(default)]
    pub storage: StorageConfig,

    /// Clip and video encoding settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// OpenAI-compatible provider settings shared by text, image and speech stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; falls back to `OPENAI_API_KEY` when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token cap for text generation
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ProviderSettings {
    /// Configured key, else `OPENAI_API_KEY`, else none.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Artifact storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root for `images/`, `audio/` and `videos/`
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl StorageConfig {
    /// Final videos land here; clips are staged alongside them
    pub fn videos_dir(&self) -> PathBuf {
        self.output_dir.join("videos")
    }
}

/// Media encoding settings: one fixed vertical frame for every clip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Caption font; empty lets the toolchain pick its default font
    #[serde(default = "default_font_file")]
    pub font_file: String,

    #[serde(default = "default_font_size")]
    pub font_size: u32,

    /// Distance of the caption baseline from the bottom edge, in pixels
    #[serde(default = "default_caption_margin")]
    pub caption_margin: u32,

    #[serde(default = "default_border_width")]
    pub border_width: u32,

    /// Audio sample rate every clip is resampled to, so clips concat by stream copy
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    /// Audio channel count for every clip (1 or 2)
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,

    /// Scene length when no audio estimate is available
    #[serde(default = "default_scene_secs")]
    pub default_scene_secs: u32,

    /// Floor applied to audio-backed scene lengths
    #[serde(default = "default_min_scene_secs")]
    pub min_scene_secs: u32,
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    1920
}

fn default_fps() -> u32 {
    30
}

fn default_font_file() -> String {
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc".to_string()
}

fn default_font_size() -> u32 {
    48
}

fn default_caption_margin() -> u32 {
    200
}

fn default_border_width() -> u32 {
    3
}

fn default_audio_sample_rate() -> u32 {
    44100
}

fn default_audio_channels() -> u32 {
    2
}

fn default_scene_secs() -> u32 {
    5
}

fn default_min_scene_secs() -> u32 {
    3
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            font_file: default_font_file(),
            font_size: default_font_size(),
            caption_margin: default_caption_margin(),
            border_width: default_border_width(),
            audio_sample_rate: default_audio_sample_rate(),
            audio_channels: default_audio_channels(),
            default_scene_secs: default_scene_secs(),
            min_scene_secs: default_min_scene_secs(),
        }
    }
}

impl ShortgenConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.provider.base_url.trim().is_empty() {
            errors.push("provider.base_url cannot be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.provider.temperature) {
            errors.push(format!(
                "provider.temperature must be within 0.0-2.0, got {}",
                self.provider.temperature
            ));
        }
        if self.storage.output_dir.as_os_str().is_empty() {
            errors.push("storage.output_dir cannot be empty".to_string());
        }
        if self.media.ffmpeg_path.trim().is_empty() {
            errors.push("media.ffmpeg_path cannot be empty".to_string());
        }
        if self.media.width == 0 || self.media.height == 0 {
            errors.push("media frame size must be non-zero".to_string());
        }
        if self.media.fps == 0 {
            errors.push("media.fps must be non-zero".to_string());
        }
        if self.media.audio_sample_rate == 0 {
            errors.push("media.audio_sample_rate must be non-zero".to_string());
        }
        if !(1..=2).contains(&self.media.audio_channels) {
            errors.push(format!(
                "media.audio_channels must be 1 or 2, got {}",
                self.media.audio_channels
            ));
        }
        if self.media.min_scene_secs > self.media.default_scene_secs {
            errors.push(format!(
                "media.min_scene_secs ({}) exceeds media.default_scene_secs ({})",
                self.media.min_scene_secs, self.media.default_scene_secs
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into one `ApiError`.
    pub fn ensure_valid(&self) -> Result<(), ApiError> {
        self.validate().map_err(|errors| {
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ))
        })
    }
}

/// Loads `ShortgenConfig` from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace root.
    pub fn load(workspace_root: &Path) -> Result<ShortgenConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = merge::merge_policy::add_environment(builder);

        let config: ShortgenConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Load configuration from one explicit file (plus defaults and environment).
    pub fn load_from_file(path: &Path) -> Result<ShortgenConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge::merge_policy::builder_with_defaults()?
            .add_source(config::File::from(path).required(true));
        let builder = merge::merge_policy::add_environment(builder);

        let config: ShortgenConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}
