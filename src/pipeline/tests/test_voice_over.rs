use std::time::Duration;

use super::fixture::harness;
use crate::error::StudioError;
use crate::export::WAV_MIME;
use crate::pipeline::{Notice, VoiceOverSession};
use crate::sync::PlaybackState;
use crate::voice::{ScriptLanguage, SpeakerSpec, SpeakingStyle};

#[tokio::test]
async fn test_empty_text_makes_no_backend_call() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "   \n\t".into();

    assert_eq!(session.generate().await.unwrap(), None);
    assert_eq!(session.generate_script("").await.unwrap(), None);
    assert_eq!(session.translate_to_urdu().await.unwrap(), None);

    assert_eq!(h.backend.total_calls(), 0);
    assert!(session.audio().is_none());
    assert!(session.notice().is_none());
    assert!(!session.workflow().is_busy());
}

#[tokio::test]
async fn test_refusal_surfaces_text_and_keeps_no_asset() {
    let h = harness();
    h.backend.refuse_speech("I cannot narrate this content.");
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "Read this".into();

    let err = session.generate().await.unwrap_err();

    assert!(matches!(err, StudioError::Backend(ref m) if m.contains("I cannot narrate this content.")));
    assert!(session.audio().is_none());
    let notice = session.notice().unwrap();
    assert!(notice.is_failure());
    assert!(notice.message().starts_with("Generation failed: "));
    assert!(notice.message().contains("I cannot narrate this content."));
    assert!(!session.workflow().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_generate_and_preview_single_voice() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "Once there was a kite.".into();
    session.style = SpeakingStyle::Fiction;

    let audio = session.generate().await.unwrap().unwrap();

    assert!((audio.duration() - 2.0).abs() < 1e-9);
    assert_eq!(audio.sample_rate(), 24_000);
    let calls = h.backend.speech_calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0].speaker, SpeakerSpec::Solo(v) if v.id == "v_father_solo"));
    assert_eq!(calls[0].style, SpeakingStyle::Fiction);
    assert!(matches!(session.notice(), Some(Notice::Info(_))));

    assert_eq!(session.toggle_preview().unwrap(), PlaybackState::Playing);
    assert_eq!(h.runtime.engine.audible_sources(), 1);
    assert_eq!(session.toggle_preview().unwrap(), PlaybackState::Stopped);
    assert_eq!(h.runtime.engine.audible_sources(), 0);
}

#[tokio::test]
async fn test_enhancement_only_for_single_voice_styles() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "Dr. Smith arrived at 5 pm".into();
    session.enhance = true;
    session.style = SpeakingStyle::NonFiction;
    session.generate().await.unwrap();
    assert_eq!(h.backend.call_count("optimize_for_speech"), 1);
    assert_eq!(h.backend.speech_calls()[0].text, "Dr. Smith arrived at 5 pm.");
    assert_eq!(session.text, "Dr. Smith arrived at 5 pm.");

    session.style = SpeakingStyle::Podcast;
    session.pair_id = "pair_male_female".into();
    session.generate().await.unwrap();
    assert_eq!(h.backend.call_count("optimize_for_speech"), 1);
    assert!(matches!(&h.backend.speech_calls()[1].speaker, SpeakerSpec::Pair(a, b) if a.name == "Alex" && b.name == "Sarah"));
}

#[tokio::test]
async fn test_detune_is_dropped_for_dialogues() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    let voice = session.select_voice("v6").unwrap();
    assert_eq!(voice.recommended_pitch_cents, 450.0);
    assert_eq!(session.effective_detune(), 450.0);

    session.style = SpeakingStyle::Story;
    assert_eq!(session.detune(), 450.0);
    assert_eq!(session.effective_detune(), 0.0);
    assert!(session.select_voice("nobody").is_err());
}

#[tokio::test]
async fn test_story_extras_run_alongside_speech() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.style = SpeakingStyle::SoloStory;
    session.text = "A fox finds a key.".into();

    session.generate().await.unwrap();

    let story = session.story().unwrap();
    assert_eq!(story.title, "The Lost Key");
    assert!(story.image.is_some());
    assert_eq!(story.metadata.as_ref().unwrap().tags, vec!["story".to_string()]);
    for method in ["synthesize_image", "generate_title", "generate_seo_metadata"] {
        assert_eq!(h.backend.call_count(method), 1, "{}", method);
    }
}

#[tokio::test]
async fn test_story_extra_failures_are_tolerated() {
    let h = harness();
    h.backend
        .fail("synthesize_image")
        .fail("generate_title")
        .fail("generate_seo_metadata");
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.style = SpeakingStyle::Story;
    session.text = "Dad: Look!\nSon: Wow!".into();

    assert!(session.generate().await.unwrap().is_some());

    let story = session.story().unwrap();
    assert_eq!(story.title, "Story");
    assert!(story.image.is_none());
    assert!(story.metadata.is_none());
    assert!(matches!(session.export_story_video().await, Err(StudioError::InvalidState(_))));
}

#[tokio::test]
async fn test_script_generation_and_translation() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());

    assert!(session.generate_script("kites").await.is_err());
    assert_eq!(h.backend.total_calls(), 0);

    session.style = SpeakingStyle::Podcast;
    let script = session.generate_script("kites").await.unwrap().unwrap();
    assert!(script.starts_with("Dad: kites"));
    assert_eq!(session.text, script);

    session.translate_to_urdu().await.unwrap();
    assert!(session.text.starts_with("[Urdu] Dad: kites"));
    assert_eq!(session.script_language, ScriptLanguage::Urdu);
}

#[tokio::test]
async fn test_download_audio_uses_default_name() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "Hello".into();
    assert!(session.download_audio().await.is_err());

    session.generate().await.unwrap();
    let file = session.download_audio().await.unwrap();

    assert_eq!(file.filename, "voxstudio_audio.wav");
    assert_eq!(file.mime, WAV_MIME);
    // -100 центов замедляют воспроизведение, файл длиннее исходных двух секунд
    assert!(file.duration > Duration::from_secs(2));
    assert_eq!(h.sink.files().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_story_video_export_uses_title() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.style = SpeakingStyle::SoloStory;
    session.text = "A fox finds a key.".into();
    session.set_detune(0.0);
    session.generate().await.unwrap();

    let file = session.export_story_video().await.unwrap();

    assert_eq!(file.filename, "the_lost_key.webm");
    assert_eq!(file.duration, Duration::from_secs(2));
    assert!(!h.studio.exporter.is_rendering());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_result_is_discarded() {
    let h = harness();
    h.backend.set_speech_delay(Duration::from_secs(5));
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.text = "Slow request".into();
    let guard = session.workflow().guard();

    let (result, _) = tokio::join!(session.generate(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        guard.invalidate();
    });

    assert!(matches!(result, Err(StudioError::InvalidState(_))));
    assert!(session.audio().is_none());
    assert!(session.notice().is_none());
    assert!(!session.workflow().is_busy());
    assert!(session.workflow().status().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_story_video_keeps_audio_length_with_recommended_detune() {
    let h = harness();
    let mut session = VoiceOverSession::new(h.studio.clone());
    session.style = SpeakingStyle::SoloStory;
    session.text = "A fox finds a key.".into();
    assert_eq!(session.effective_detune(), -100.0);
    session.generate().await.unwrap();

    let file = session.export_story_video().await.unwrap();

    assert_eq!(file.duration, Duration::from_secs(2));
    assert_eq!(session.effective_detune(), -100.0);
    assert_eq!(session.preview().detune(), -100.0);
}
