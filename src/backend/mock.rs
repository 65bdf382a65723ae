//! Сценарный бэкенд для тестов: считает вызовы и отвечает заготовками.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::backend::{GenerativeBackend, SeoMetadata};
use crate::error::{Result, StudioError};
use crate::media::AspectRatio;
use crate::media::headless::png_header;
use crate::voice::{PodcastPair, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle, VoiceAnalysis, VoiceGender};

/// Записанный вызов синтеза речи
#[derive(Debug, Clone)]
pub struct SpeechCall {
    pub text: String,
    pub speaker: SpeakerSpec,
    pub style: SpeakingStyle,
}

pub struct MockBackend {
    calls: Mutex<Vec<&'static str>>,
    failing: Mutex<HashSet<&'static str>>,
    speech_calls: Mutex<Vec<SpeechCall>>,
    refusal: Mutex<Option<String>>,
    transcription: Mutex<String>,
    /// Длительность синтезированной речи, в секундах
    speech_seconds: Mutex<f64>,
    speech_delay: Mutex<Duration>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            speech_calls: Mutex::new(Vec::new()),
            refusal: Mutex::new(None),
            transcription: Mutex::new("Hello from the uploaded clip".to_string()),
            speech_seconds: Mutex::new(2.0),
            speech_delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Вызов `method` будет завершаться ошибкой бэкенда
    pub fn fail(&self, method: &'static str) -> &Self {
        self.failing.lock().insert(method);
        self
    }

    /// Синтез речи вернёт текст вместо аудио
    pub fn refuse_speech(&self, text: &str) -> &Self {
        *self.refusal.lock() = Some(text.to_string());
        self
    }

    pub fn set_transcription(&self, text: &str) -> &Self {
        *self.transcription.lock() = text.to_string();
        self
    }

    pub fn set_speech_seconds(&self, seconds: f64) -> &Self {
        *self.speech_seconds.lock() = seconds;
        self
    }

    /// Синтез речи будет отвечать с задержкой
    pub fn set_speech_delay(&self, delay: Duration) -> &Self {
        *self.speech_delay.lock() = delay;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|m| **m == method).count()
    }

    pub fn speech_calls(&self) -> Vec<SpeechCall> {
        self.speech_calls.lock().clone()
    }

    fn record(&self, method: &'static str) -> Result<()> {
        self.calls.lock().push(method);
        if self.failing.lock().contains(method) {
            return Err(StudioError::Backend(format!("{} failed", method)));
        }
        Ok(())
    }

    pub fn analysis() -> VoiceAnalysis {
        VoiceAnalysis {
            gender: VoiceGender::Male,
            age: "middle-aged".into(),
            accent: "Lahori".into(),
            language: "Urdu".into(),
            intonation: "rising".into(),
            rhythm: "measured".into(),
            style_prompt: "Warm baritone with gentle pauses".into(),
            base_voice: "Fenrir".into(),
            pitch: -80.0,
            description: "Calm storyteller".into(),
        }
    }
}

#[async_trait]
impl GenerativeBackend for MockBackend {
    async fn synthesize_speech(&self, text: &str, speaker: &SpeakerSpec, style: SpeakingStyle) -> Result<String> {
        self.record("synthesize_speech")?;
        self.speech_calls.lock().push(SpeechCall {
            text: text.to_string(),
            speaker: speaker.clone(),
            style,
        });
        let delay = *self.speech_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(refusal) = self.refusal.lock().clone() {
            return Err(StudioError::Backend(format!("speech synthesis was refused: {}", refusal)));
        }
        let frames = (*self.speech_seconds.lock() * 24_000.0).round() as usize;
        Ok(STANDARD.encode(vec![0u8; frames * 2]))
    }

    async fn transcribe(&self, _media_base64: &str, _mime: &str) -> Result<String> {
        self.record("transcribe")?;
        Ok(self.transcription.lock().clone())
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.record("translate")?;
        Ok(format!("[{}] {}", target_language, text))
    }

    async fn improve_script(&self, text: &str, style: &str) -> Result<String> {
        self.record("improve_script")?;
        Ok(format!("{} ({})", text, style))
    }

    async fn optimize_for_speech(&self, text: &str) -> Result<String> {
        self.record("optimize_for_speech")?;
        Ok(format!("{}.", text))
    }

    async fn generate_dialogue_script(
        &self,
        text: &str,
        kind: ScriptKind,
        pair: &PodcastPair,
        language: ScriptLanguage,
    ) -> Result<String> {
        self.record("generate_dialogue_script")?;
        Ok(match kind {
            ScriptKind::SoloStory => format!("Once upon a time, {} ({})", text, language),
            _ => format!("{}: {}\n{}: Tell me more!", pair.first.name, text, pair.second.name),
        })
    }

    async fn analyze_voice_sample(&self, _media_base64: &str, _mime: &str) -> Result<VoiceAnalysis> {
        self.record("analyze_voice_sample")?;
        Ok(Self::analysis())
    }

    async fn synthesize_image(&self, _prompt: &str, aspect: AspectRatio) -> Result<String> {
        self.record("synthesize_image")?;
        let (w, h) = aspect.dimensions();
        Ok(STANDARD.encode(png_header(w, h)))
    }

    async fn generate_visual_prompt(&self, script: &str) -> Result<String> {
        self.record("generate_visual_prompt")?;
        Ok(format!("A cinematic scene: {}", script))
    }

    async fn synthesize_video(&self, _prompt: &str) -> Result<Bytes> {
        self.record("synthesize_video")?;
        Ok(Bytes::from_static(b"generated-video"))
    }

    async fn generate_title(&self, _text: &str) -> Result<String> {
        self.record("generate_title")?;
        Ok("The Lost Key".to_string())
    }

    async fn generate_seo_metadata(&self, text: &str) -> Result<SeoMetadata> {
        self.record("generate_seo_metadata")?;
        Ok(SeoMetadata {
            title: "The Lost Key".into(),
            description: text.chars().take(80).collect(),
            tags: vec!["story".into()],
        })
    }
}
