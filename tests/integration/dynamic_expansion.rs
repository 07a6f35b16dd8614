//! Dynamic scene expansion through the bundled shorts template

use super::test_utils::{shorts_template, Harness, ScriptedText, PLANNING_FAILURE};
use shortgen::config::MediaConfig;
use shortgen::error::{ApiError, CompositionError};
use shortgen::pipeline::{ArtifactInfo, RunStatus, StageKind};
use shortgen::types::NodeStatus;
use shortgen::video::collect_scenes;

const SCRIPT: [&str; 4] = [
    "Today we'll look at tides.",
    "The moon pulls the ocean toward it.",
    "Earth spins beneath that bulge.",
    "So most coasts see two high tides a day.",
];

#[tokio::test]
async fn four_scene_script_expands_into_twelve_nodes() {
    let harness = Harness::new(ScriptedText::new(&SCRIPT, &[]));

    let id = harness
        .registry
        .submit("Why are there tides?", &shorts_template())
        .unwrap();
    let snapshot = harness.registry.wait(&id).await.unwrap();

    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(snapshot.nodes.len(), 13);
    assert_eq!(snapshot.count(NodeStatus::Completed), 13);

    let root = snapshot.node("root").unwrap();
    assert_eq!(root.output_array, SCRIPT.to_vec());
    assert_eq!(root.children.len(), 8);

    for (index, narration) in SCRIPT.iter().enumerate() {
        let n = index + 1;
        let planning = snapshot.node(&format!("scene{}_planning", n)).unwrap();
        assert_eq!(planning.kind, StageKind::Text);
        assert_eq!(planning.parent_id.as_deref(), Some("root"));
        assert_eq!(planning.parent_array_index, index);
        assert!(planning
            .input
            .as_deref()
            .unwrap()
            .starts_with(&format!("Scene {} narration:\n{}", n, narration)));
        assert_eq!(
            planning.output_array,
            vec![
                format!("Caption: {}", narration),
                format!("Illustration of {}", narration)
            ]
        );

        let image = snapshot.node(&format!("scene{}_image", n)).unwrap();
        assert_eq!(image.kind, StageKind::Image);
        assert_eq!(image.model, "dall-e-3");
        assert_eq!(image.parent_id, Some(planning.id.clone()));
        assert_eq!(
            image.input.as_deref(),
            Some(format!("Illustration of {}", narration).as_str())
        );
        assert!(matches!(
            image.artifact,
            Some(ArtifactInfo::Image {
                local_path: Some(_),
                ..
            })
        ));

        let audio = snapshot.node(&format!("scene{}_audio", n)).unwrap();
        assert_eq!(audio.kind, StageKind::Speech);
        assert_eq!(audio.model, "tts-1");
        assert_eq!(audio.parent_id.as_deref(), Some("root"));
        assert_eq!(audio.input.as_deref(), Some(*narration));
    }
}

#[tokio::test]
async fn scenes_are_collected_and_composed_in_order() {
    let harness = Harness::new(ScriptedText::new(&SCRIPT, &[]));

    let id = harness
        .registry
        .submit("Why are there tides?", &shorts_template())
        .unwrap();
    let snapshot = harness.registry.wait(&id).await.unwrap();

    let scenes = collect_scenes(&snapshot, &MediaConfig::default());
    assert_eq!(scenes.len(), 4);
    assert_eq!(scenes[0].subtitle, "Caption: Today we'll look at tides.");
    assert_eq!(scenes[0].duration, 3);
    // 9 words at 150 wpm round up to 4 seconds
    assert_eq!(scenes[3].duration, 4);
    assert!(scenes.iter().all(|s| s.image_path.is_some() && s.audio_path.is_some()));

    let video = harness.registry.compose(&id, &scenes).await.unwrap();
    assert!(video.exists());
    assert!(video.starts_with(harness.videos_dir()));

    let rendered = harness.encoder.rendered.lock().clone();
    let subtitles: Vec<&str> = rendered.iter().map(|(s, _)| s.subtitle.as_str()).collect();
    assert_eq!(
        subtitles,
        SCRIPT
            .iter()
            .map(|n| format!("Caption: {}", n))
            .collect::<Vec<_>>()
    );
    for (_, clip) in &rendered {
        assert!(!clip.exists(), "temporary clip left behind: {}", clip.display());
    }
    assert_eq!(harness.encoder.concatenated.lock().len(), 4);
}

#[tokio::test]
async fn failed_planning_stops_only_that_scene_image() {
    let script = [
        "Today we'll look at tides.",
        "CAPTION_FAIL the moon pulls water.",
        "Earth spins beneath that bulge.",
    ];
    assert!(script[1].contains(PLANNING_FAILURE));
    let harness = Harness::new(ScriptedText::new(&script, &[]));

    let id = harness
        .registry
        .submit("Why are there tides?", &shorts_template())
        .unwrap();
    let snapshot = harness.registry.wait(&id).await.unwrap();

    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(snapshot.nodes.len(), 10);

    let status = |id: &str| snapshot.node(id).unwrap().status;
    assert_eq!(status("scene2_planning"), NodeStatus::Failed);
    assert_eq!(status("scene2_image"), NodeStatus::Pending);
    assert_eq!(status("scene2_audio"), NodeStatus::Completed);
    for n in [1, 3] {
        for role in ["planning", "image", "audio"] {
            assert_eq!(status(&format!("scene{}_{}", n, role)), NodeStatus::Completed);
        }
    }

    let scenes = collect_scenes(&snapshot, &MediaConfig::default());
    assert_eq!(scenes.len(), 3);
    assert_eq!(scenes[1].subtitle, "");
    assert_eq!(scenes[1].image_path, None);
    assert!(scenes[1].audio_path.is_some());
    assert!(scenes[2].image_path.is_some());
}

#[tokio::test]
async fn empty_script_expands_into_nothing() {
    let harness = Harness::new(ScriptedText::new(&[], &[]));

    let id = harness
        .registry
        .submit("Nothing to say", &shorts_template())
        .unwrap();
    let snapshot = harness.registry.wait(&id).await.unwrap();

    assert_eq!(snapshot.nodes.len(), 1);
    assert_eq!(snapshot.node("root").unwrap().status, NodeStatus::Completed);

    let scenes = collect_scenes(&snapshot, &MediaConfig::default());
    assert!(scenes.is_empty());
    let err = harness.registry.compose(&id, &scenes).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Composition(CompositionError::NoScenes)
    ));
}
