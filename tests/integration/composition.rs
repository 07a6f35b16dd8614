//! Video composition: clip ordering, abort on failure and temporary file cleanup

use super::test_utils::RecordingEncoder;
use shortgen::config::MediaConfig;
use shortgen::error::CompositionError;
use shortgen::video::{FfmpegEncoder, MediaEncoder, Scene, VideoComposer};
use std::sync::Arc;
use tempfile::TempDir;

fn scenes(captions: &[&str]) -> Vec<Scene> {
    captions
        .iter()
        .enumerate()
        .map(|(i, caption)| Scene {
            image_path: Some(format!("/media/img{}.png", i + 1)),
            audio_path: Some(format!("/media/voice{}.mp3", i + 1)),
            subtitle: caption.to_string(),
            duration: 4,
        })
        .collect()
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn clips_render_in_scene_order_and_are_removed() {
    let temp = TempDir::new().unwrap();
    let videos = temp.path().join("out").join("videos");
    let encoder = Arc::new(RecordingEncoder::default());
    let composer = VideoComposer::new(Arc::clone(&encoder) as Arc<dyn MediaEncoder>, &videos);

    let output = composer
        .compose("exec_1_abc", &scenes(&["first", "second", "third"]))
        .await
        .unwrap();

    let rendered = encoder.rendered.lock().clone();
    let captions: Vec<&str> = rendered.iter().map(|(s, _)| s.subtitle.as_str()).collect();
    assert_eq!(captions, ["first", "second", "third"]);
    let clip_names: Vec<String> = rendered
        .iter()
        .map(|(_, p)| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert!(clip_names[0].starts_with("exec_1_abc_clip1_"));
    assert!(clip_names[2].starts_with("exec_1_abc_clip3_"));

    let concatenated = encoder.concatenated.lock().clone();
    assert_eq!(
        concatenated,
        rendered.iter().map(|(_, p)| p.clone()).collect::<Vec<_>>()
    );

    assert_eq!(output.parent().unwrap(), videos.as_path());
    assert_eq!(
        dir_entries(&videos),
        vec![output.file_name().unwrap().to_string_lossy().to_string()]
    );
}

#[tokio::test]
async fn clip_failure_aborts_and_cleans_up() {
    let temp = TempDir::new().unwrap();
    let encoder = Arc::new(RecordingEncoder::failing_at(2));
    let composer = VideoComposer::new(
        Arc::clone(&encoder) as Arc<dyn MediaEncoder>,
        temp.path(),
    );

    let err = composer
        .compose("exec_2_abc", &scenes(&["a", "b", "c"]))
        .await
        .unwrap_err();

    match err {
        CompositionError::ClipFailed { scene, message } => {
            assert_eq!(scene, 2);
            assert!(message.contains("encoder crashed"));
        }
        other => panic!("expected ClipFailed, got {other:?}"),
    }
    // third scene is never attempted and nothing is concatenated
    assert_eq!(encoder.rendered.lock().len(), 2);
    assert!(encoder.concatenated.lock().is_empty());
    assert!(dir_entries(temp.path()).is_empty());
}

#[tokio::test]
async fn missing_toolchain_fails_the_first_clip() {
    let temp = TempDir::new().unwrap();
    let media = MediaConfig {
        ffmpeg_path: temp
            .path()
            .join("no-such-ffmpeg")
            .display()
            .to_string(),
        ..MediaConfig::default()
    };
    let composer = VideoComposer::new(Arc::new(FfmpegEncoder::new(media)), temp.path());

    let err = composer
        .compose("exec_3_abc", &scenes(&["only"]))
        .await
        .unwrap_err();
    match err {
        CompositionError::ClipFailed { scene, message } => {
            assert_eq!(scene, 1);
            assert!(message.contains("no-such-ffmpeg"));
        }
        other => panic!("expected ClipFailed, got {other:?}"),
    }
    assert!(dir_entries(temp.path()).is_empty());
}

#[test]
fn scene_list_json_uses_camel_case() {
    let parsed: Vec<Scene> = serde_json::from_str(
        r#"[
            {"imagePath": "/a.png", "audioPath": "/a.mp3", "subtitle": "Hi", "duration": 6},
            {"duration": 5}
        ]"#,
    )
    .unwrap();
    assert_eq!(parsed[0].image_path.as_deref(), Some("/a.png"));
    assert_eq!(parsed[0].audio_path.as_deref(), Some("/a.mp3"));
    assert_eq!(parsed[1].image_path, None);
    assert_eq!(parsed[1].subtitle, "");
}
