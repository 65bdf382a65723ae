//! # Backend модуль
//!
//! Интерфейс генеративного бэкенда: текст, речь, изображения, видео.
//! Любой вызов может завершиться `StudioError::Backend`.

pub mod gemini;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::media::AspectRatio;
use crate::voice::{PodcastPair, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle, VoiceAnalysis};

pub use gemini::GeminiBackend;

/// Метаданные для публикации истории
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SeoMetadata {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Генеративный бэкенд
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Синтез речи; результат - base64 сырого PCM 16 бит
    async fn synthesize_speech(&self, text: &str, speaker: &SpeakerSpec, style: SpeakingStyle) -> Result<String>;

    /// Транскрипция аудио или видео, переданного в base64
    async fn transcribe(&self, media_base64: &str, mime: &str) -> Result<String>;

    async fn translate(&self, text: &str, target_language: &str) -> Result<String>;

    /// Переписать сценарий в заданном стиле
    async fn improve_script(&self, text: &str, style: &str) -> Result<String>;

    /// Подготовить текст к чтению вслух
    async fn optimize_for_speech(&self, text: &str) -> Result<String>;

    async fn generate_dialogue_script(
        &self,
        text: &str,
        kind: ScriptKind,
        pair: &PodcastPair,
        language: ScriptLanguage,
    ) -> Result<String>;

    async fn analyze_voice_sample(&self, media_base64: &str, mime: &str) -> Result<VoiceAnalysis>;

    /// Синтез изображения; результат - base64 PNG
    async fn synthesize_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String>;

    async fn generate_visual_prompt(&self, script: &str) -> Result<String>;

    /// Синтез видео длительной операцией с опросом
    async fn synthesize_video(&self, prompt: &str) -> Result<Bytes>;

    async fn generate_title(&self, text: &str) -> Result<String>;

    async fn generate_seo_metadata(&self, text: &str) -> Result<SeoMetadata>;
}
