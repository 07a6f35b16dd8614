//! Merge rules: defaults, override order, conflict handling.
//!
//! Later sources win key by key; tables merge, scalars replace.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("provider.base_url", "https://api.openai.com/v1")?
        .set_default("provider.temperature", 0.7)?
        .set_default("provider.max_tokens", 2000)?
        .set_default("storage.output_dir", "generated")?
        .set_default("media.ffmpeg_path", "ffmpeg")?)
}

/// Environment overrides, applied last: `SHORTGEN__MEDIA__FPS=24` sets `media.fps`.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("SHORTGEN")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
