//! shortgen: tree-shaped AI generation pipelines for short vertical videos
//!
//! A pipeline template describes a tree of text, image and speech stages. Each
//! node's prompt is resolved from its parent's output, completed nodes fan out
//! to their children concurrently, and a designated root can expand into
//! per-scene branches at runtime. Settled runs can be assembled into a video
//! with ffmpeg.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod provider;
pub mod types;
pub mod video;
