//! Clip synthesis and concatenation.
//!
//! Each scene becomes one clip of a fixed frame size and rate: the still image
//! held for the scene duration, the narration muxed in, and the caption burned
//! in at the bottom. Clips are then joined in scene order with a stream copy.

use crate::config::MediaConfig;
use crate::error::CompositionError;
use crate::video::scene::Scene;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Media toolchain contract
#[async_trait]
pub trait MediaEncoder: Send + Sync {
    /// Render one scene into a clip at `output`.
    async fn render_clip(&self, scene: &Scene, output: &Path) -> Result<(), CompositionError>;

    /// Join `clips` in order into `output`.
    async fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), CompositionError>;
}

/// `MediaEncoder` backed by the ffmpeg binary
pub struct FfmpegEncoder {
    media: MediaConfig,
}

impl FfmpegEncoder {
    pub fn new(media: MediaConfig) -> Self {
        Self { media }
    }

    /// Arguments for rendering one clip.
    pub fn clip_args(&self, scene: &Scene, output: &Path) -> Vec<String> {
        let m = &self.media;
        let duration = scene.duration.to_string();
        let mut args: Vec<String> = vec!["-y".into()];

        match scene.image_path.as_deref() {
            Some(image) => args.extend([
                "-loop".into(),
                "1".into(),
                "-t".into(),
                duration.clone(),
                "-i".into(),
                image.into(),
            ]),
            None => args.extend([
                "-f".into(),
                "lavfi".into(),
                "-t".into(),
                duration.clone(),
                "-i".into(),
                format!("color=c=black:s={}x{}:r={}", m.width, m.height, m.fps),
            ]),
        }

        match scene.audio_path.as_deref() {
            Some(audio) => args.extend(["-i".to_string(), audio.to_string()]),
            None => args.extend([
                "-f".into(),
                "lavfi".into(),
                "-t".into(),
                duration.clone(),
                "-i".into(),
                format!(
                    "anullsrc=channel_layout={}:sample_rate={}",
                    channel_layout(m.audio_channels),
                    m.audio_sample_rate
                ),
            ]),
        }

        args.extend([
            "-map".into(),
            "0:v".into(),
            "-map".into(),
            "1:a".into(),
            "-vf".into(),
            self.video_filter(&scene.subtitle),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-r".into(),
            m.fps.to_string(),
            "-c:a".into(),
            "aac".into(),
            "-ar".into(),
            m.audio_sample_rate.to_string(),
            "-ac".into(),
            m.audio_channels.to_string(),
            "-t".into(),
            duration,
            output.display().to_string(),
        ]);
        args
    }

    /// Scale and pad to the frame, then draw the caption bottom-centred.
    fn video_filter(&self, caption: &str) -> String {
        let m = &self.media;
        let mut filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1",
            w = m.width,
            h = m.height
        );

        let caption = caption.trim();
        if !caption.is_empty() {
            filter.push_str(",drawtext=");
            if !m.font_file.is_empty() {
                filter.push_str(&format!("fontfile={}:", escape_filter_value(&m.font_file)));
            }
            filter.push_str(&format!(
                "expansion=none:text={}:fontsize={}:fontcolor=white:x=(w-text_w)/2:y=h-{}:borderw={}:bordercolor=black",
                escape_filter_value(caption),
                m.font_size,
                m.caption_margin,
                m.border_width
            ));
        }
        filter
    }

    /// Arguments for concatenating through a list file.
    pub fn concat_args(list_file: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.display().to_string(),
            "-c".into(),
            "copy".into(),
            output.display().to_string(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<(), CompositionError> {
        debug!(ffmpeg = %self.media.ffmpeg_path, args = ?args, "Running media toolchain");
        let result = Command::new(&self.media.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                CompositionError::Toolchain(format!(
                    "failed to launch {}: {}",
                    self.media.ffmpeg_path, e
                ))
            })?;

        if result.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&result.stderr);
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        Err(CompositionError::Toolchain(format!(
            "{} exited with {}: {}",
            self.media.ffmpeg_path,
            result.status,
            tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
        )))
    }
}

fn channel_layout(channels: u32) -> &'static str {
    if channels == 1 {
        "mono"
    } else {
        "stereo"
    }
}

/// Escape a value for a filter option inside a filtergraph: first the option
/// level (`\ ' :`), then the graph level (`\ ' [ ] , ;`).
pub fn escape_filter_value(value: &str) -> String {
    let mut option_level = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            option_level.push('\\');
        }
        option_level.push(c);
    }

    let mut graph_level = String::with_capacity(option_level.len());
    for c in option_level.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            graph_level.push('\\');
        }
        graph_level.push(c);
    }
    graph_level
}

/// Concat demuxer list: one `file '<path>'` line per clip.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            format!(
                "file '{}'\n",
                clip.display().to_string().replace('\'', "'\\''")
            )
        })
        .collect()
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    async fn render_clip(&self, scene: &Scene, output: &Path) -> Result<(), CompositionError> {
        self.run(&self.clip_args(scene, output)).await
    }

    async fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), CompositionError> {
        let list_file = output.with_extension("txt");
        tokio::fs::write(&list_file, concat_list(clips)).await?;

        let result = self.run(&Self::concat_args(&list_file, output)).await;
        if let Err(e) = tokio::fs::remove_file(&list_file).await {
            warn!(path = %list_file.display(), error = %e, "Failed to remove concat list");
        }
        result.map_err(|e| match e {
            CompositionError::Toolchain(message) => CompositionError::ConcatFailed(message),
            other => other,
        })
    }
}

/// Turns an ordered scene list into one video under `videos_dir`
pub struct VideoComposer {
    encoder: Arc<dyn MediaEncoder>,
    videos_dir: PathBuf,
}

impl VideoComposer {
    pub fn new(encoder: Arc<dyn MediaEncoder>, videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            videos_dir: videos_dir.into(),
        }
    }

    /// Render every scene, then concatenate. Any clip failure aborts the whole
    /// composition; temporary clips are removed on every path.
    pub async fn compose(
        &self,
        execution_id: &str,
        scenes: &[Scene],
    ) -> Result<PathBuf, CompositionError> {
        if scenes.is_empty() {
            return Err(CompositionError::NoScenes);
        }
        tokio::fs::create_dir_all(&self.videos_dir).await?;

        let stamp = chrono::Utc::now().timestamp_millis();
        let mut clips = Vec::with_capacity(scenes.len());
        let result = self
            .render_and_join(execution_id, stamp, scenes, &mut clips)
            .await;

        for clip in &clips {
            if let Err(e) = tokio::fs::remove_file(clip).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %clip.display(), error = %e, "Failed to remove temporary clip");
                }
            }
        }

        if let Ok(output) = &result {
            info!(
                execution_id = %execution_id,
                scene_count = scenes.len(),
                output = %output.display(),
                "Video composed"
            );
        }
        result
    }

    async fn render_and_join(
        &self,
        execution_id: &str,
        stamp: i64,
        scenes: &[Scene],
        clips: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, CompositionError> {
        for (index, scene) in scenes.iter().enumerate() {
            let number = index + 1;
            let clip = self
                .videos_dir
                .join(format!("{}_clip{}_{}.mp4", execution_id, number, stamp));
            clips.push(clip.clone());

            self.encoder
                .render_clip(scene, &clip)
                .await
                .map_err(|e| CompositionError::ClipFailed {
                    scene: number,
                    message: e.to_string(),
                })?;
            debug!(execution_id = %execution_id, scene = number, "Clip rendered");
        }

        let output = self
            .videos_dir
            .join(format!("{}_{}.mp4", execution_id, stamp));
        self.encoder
            .concat(clips, &output)
            .await
            .map_err(|e| match e {
                CompositionError::ConcatFailed(_) => e,
                other => CompositionError::ConcatFailed(other.to_string()),
            })?;
        Ok(output)
    }
}
