use std::time::Duration;

use super::fixture::harness;
use crate::error::StudioError;
use crate::media::runtime::VideoElement;
use crate::pipeline::{LANGUAGES, Notice, StorySession};
use crate::voice::{SpeakerSpec, SpeakingStyle, VoiceGender};

#[tokio::test]
async fn test_english_story_skips_translation() {
    let h = harness();
    let mut session = StorySession::new(h.studio.clone());
    session.script = "A lighthouse keeper finds a map.".into();

    let audio = session.generate().await.unwrap().unwrap();

    assert!((audio.duration() - 2.0).abs() < 1e-9);
    assert_eq!(h.backend.call_count("translate"), 0);
    let call = h.backend.speech_calls().pop().unwrap();
    assert_eq!(call.text, "A lighthouse keeper finds a map.");
    assert_eq!(call.style, SpeakingStyle::Fiction);
    assert!(matches!(call.speaker, SpeakerSpec::Solo(ref v) if v.id == "v_father_solo"));

    let video = session.video().unwrap();
    assert!(video.is_looping());
    assert_eq!(video.duration(), Some(8.0));
    assert!(matches!(session.notice(), Some(Notice::Info(_))));
}

#[tokio::test]
async fn test_translation_precedes_speech_and_visuals_use_original() {
    let h = harness();
    let mut session = StorySession::new(h.studio.clone());
    session.language = LANGUAGES[1].to_string();
    session.script = "The river sang at night.".into();

    session.generate().await.unwrap();

    let calls = h.backend.calls();
    assert_eq!(calls[0], "translate");
    assert_eq!(h.backend.speech_calls()[0].text, "[Urdu] The river sang at night.");
    assert_eq!(
        session.visual_prompt(),
        Some("A cinematic scene: The river sang at night.")
    );
    assert_eq!(h.backend.call_count("synthesize_video"), 1);
}

#[test]
fn test_voice_list_follows_gender() {
    let h = harness();
    let mut session = StorySession::new(h.studio.clone());
    assert_eq!(session.gender(), VoiceGender::Male);
    assert_eq!(session.voice_id(), "v_father_solo");
    assert!(session.voices().iter().all(|v| v.gender == VoiceGender::Male));

    session.set_gender(VoiceGender::Child);
    assert_eq!(session.voice_id(), "v6");
    assert!(session.select_voice("v8").is_ok());
    assert_eq!(session.voice_id(), "v8");
    assert!(matches!(session.select_voice("v1"), Err(StudioError::InvalidState(_))));
    assert_eq!(session.voice_id(), "v8");
}

#[tokio::test]
async fn test_empty_script_is_noop() {
    let h = harness();
    let mut session = StorySession::new(h.studio.clone());
    session.script = "\n ".into();

    assert_eq!(session.generate().await.unwrap(), None);
    assert_eq!(h.backend.total_calls(), 0);
    assert!(matches!(session.export().await, Err(StudioError::InvalidState(_))));
}

#[tokio::test]
async fn test_video_failure_reports_paid_key_notice() {
    let h = harness();
    h.backend.fail("synthesize_video");
    let mut session = StorySession::new(h.studio.clone());
    session.script = "Clouds over the valley.".into();

    let err = session.generate().await.unwrap_err();

    assert!(err.is_backend_equivalent());
    assert_eq!(
        session.notice().map(Notice::message),
        Some("Generation failed. Video generation requires a paid API key.")
    );
    assert!(session.audio().is_none());
    assert!(session.video().is_none());
    assert!(!session.workflow().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_export_loops_background_clip() {
    let h = harness();
    let mut session = StorySession::new(h.studio.clone());
    session.script = "Stars fell like rain.".into();
    session.generate().await.unwrap();

    let file = session.export().await.unwrap();

    assert!(file.filename.starts_with("story_video_"));
    assert_eq!(file.duration, Duration::from_secs(2));
    let video = h.runtime.videos.last().unwrap();
    assert!(video.is_looping());
    assert_eq!(video.playback_rate(), 1.0);
    assert!((video.last_pause_position().unwrap() - 2.0).abs() < 1e-9);
    assert_eq!(h.sink.files().len(), 1);
}
