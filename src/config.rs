//! Модуль конфигурации библиотеки voxstudio
//!
//! Единственный обязательный параметр окружения - ключ доступа к бэкенду.
//! Его отсутствие не прерывает запуск: вызовы просто завершатся ошибкой.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::audio::SPEECH_SAMPLE_RATE;
use crate::error::{Result, StudioError};

/// Переменные окружения с ключом доступа, в порядке приоритета
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Ключ доступа к генеративному бэкенду
    pub api_key: String,
    /// Базовый адрес REST API
    pub api_base_url: String,
    /// Модель для текста, транскрипции и анализа голоса
    pub text_model: String,
    /// Модель синтеза речи
    pub speech_model: String,
    /// Модель синтеза изображений
    pub image_model: String,
    /// Модель синтеза видео
    pub video_model: String,
    /// Частота дискретизации синтезированной речи
    pub speech_sample_rate: u32,
    /// Интервал опроса длительной операции синтеза видео, в секундах
    pub video_poll_interval_secs: u64,
    /// Верхний предел длительности офлайн-рендеринга, в секундах
    pub max_render_seconds: f64,
    /// Предпочтительный контейнер записи
    pub preferred_container: String,
    /// Запасные контейнеры, в порядке проверки
    pub fallback_containers: Vec<String>,
    /// Частота кадров захвата поверхности рисования
    pub capture_fps: u32,
    /// Имя аудиофайла по умолчанию
    pub default_audio_name: String,
    /// Имя видео истории по умолчанию
    pub default_story_name: String,
    /// Имя видео с lip-sync по умолчанию
    pub default_lipsync_name: String,
    /// Максимальный размер загружаемого видео для транскрипции, в байтах
    pub max_upload_bytes: u64,
    /// Каталог для сохранения файлов
    pub download_dir: Option<String>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            video_model: "veo-2.0-generate-001".to_string(),
            speech_sample_rate: SPEECH_SAMPLE_RATE,
            video_poll_interval_secs: 10,
            max_render_seconds: 3600.0,
            preferred_container: "video/webm;codecs=vp9,opus".to_string(),
            fallback_containers: vec!["video/webm".to_string(), "video/mp4".to_string()],
            capture_fps: 30,
            default_audio_name: "voxstudio_audio".to_string(),
            default_story_name: "story_video".to_string(),
            default_lipsync_name: "smart_lipsync_video".to_string(),
            max_upload_bytes: 20 * 1024 * 1024, // 20 MB
            download_dir: None,
        }
    }
}

impl StudioConfig {
    /// Собрать конфигурацию из переменных окружения.
    ///
    /// Отсутствие ключа - предупреждение, а не ошибка.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        match API_KEY_VARS.iter().find_map(|var| std::env::var(var).ok()) {
            Some(key) if !key.trim().is_empty() => config.api_key = key.trim().to_string(),
            _ => warn!(
                "{} is missing from environment variables; backend calls will fail",
                API_KEY_VARS[0]
            ),
        }

        if let Ok(base) = std::env::var("VOXSTUDIO_API_BASE") {
            config.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Ok(dir) = std::env::var("VOXSTUDIO_DOWNLOAD_DIR") {
            config.download_dir = Some(dir);
        }

        config
    }

    /// Загрузить переопределения из JSON-файла. Ключ из окружения имеет приоритет.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: StudioConfig = serde_json::from_str(&raw)?;
        if config.api_key.is_empty() {
            config.api_key = Self::from_env().api_key;
        }
        config.validate()?;
        info!("Loaded studio configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Есть ли ключ доступа
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Проверить согласованность значений
    pub fn validate(&self) -> Result<()> {
        if self.speech_sample_rate == 0 {
            return Err(StudioError::Configuration("speech_sample_rate must be positive".into()));
        }
        if !(self.max_render_seconds > 0.0) {
            return Err(StudioError::Configuration("max_render_seconds must be positive".into()));
        }
        if self.capture_fps == 0 {
            return Err(StudioError::Configuration("capture_fps must be positive".into()));
        }
        if self.preferred_container.is_empty() {
            return Err(StudioError::Configuration("preferred_container is empty".into()));
        }
        Ok(())
    }

    /// Кандидаты контейнера записи в порядке предпочтения
    pub fn container_candidates(&self) -> Vec<String> {
        std::iter::once(self.preferred_container.clone())
            .chain(self.fallback_containers.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = StudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.speech_sample_rate, 24_000);
        assert_eq!(
            config.container_candidates(),
            vec!["video/webm;codecs=vp9,opus", "video/webm", "video/mp4"]
        );
    }

    #[test]
    fn test_json_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"api_key": "k", "capture_fps": 24, "default_story_name": "tale"}}"#).unwrap();

        let config = StudioConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.api_key, "k");
        assert_eq!(config.capture_fps, 24);
        assert_eq!(config.default_story_name, "tale");
        assert_eq!(config.text_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let config = StudioConfig { capture_fps: 0, ..StudioConfig::default() };
        assert!(matches!(config.validate(), Err(StudioError::Configuration(_))));
    }
}
