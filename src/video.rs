//! Video assembly: scenes from a finished execution, clips, and the final concatenation.
//!
//! Composition is stricter than generation: one failed clip fails the whole video.

pub mod composer;
pub mod scene;

pub use composer::{FfmpegEncoder, MediaEncoder, VideoComposer};
pub use scene::{collect_scenes, estimate_speech_secs, scene_duration, Scene};
