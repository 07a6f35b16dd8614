//! Narration duration estimates

use proptest::prelude::*;
use shortgen::config::MediaConfig;
use shortgen::video::{estimate_speech_secs, scene_duration};

proptest! {
    #[test]
    fn estimate_is_words_at_150_per_minute_rounded_up(words in 1usize..2000) {
        let text = vec!["word"; words].join(" ");
        let secs = estimate_speech_secs(&text).unwrap() as usize;
        prop_assert!(secs * 150 >= words * 60);
        prop_assert!((secs - 1) * 150 < words * 60);
    }

    #[test]
    fn scene_duration_never_drops_below_minimum(estimate in proptest::option::of(0u32..600)) {
        let media = MediaConfig::default();
        let duration = scene_duration(estimate, &media);
        prop_assert!(duration >= media.min_scene_secs);
        if let Some(secs) = estimate.filter(|s| *s > 0) {
            prop_assert!(duration >= secs);
        }
    }
}
