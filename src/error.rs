//! Модуль обработки ошибок библиотеки voxstudio
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при генерации,
//! воспроизведении и экспорте озвучки.

use thiserror::Error;

/// Ошибки библиотеки voxstudio
#[derive(Debug, Error)]
pub enum StudioError {
    /// Генеративный бэкенд не вернул пригодный результат (включая отказ модели)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Повреждённые или обрезанные аудиоданные
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Ошибка офлайн-рендеринга со сдвигом высоты тона
    #[error("Render error: {0}")]
    Render(String),

    /// Ошибка захвата потоков или записи контейнера
    #[error("Capture error: {0}")]
    Capture(String),

    /// Длительности непригодны для вычисления скорости синхронизации
    #[error("Degenerate duration: audio {audio:.3}s, visual {visual:?}")]
    DegenerateDuration { audio: f64, visual: Option<f64> },

    /// Операция недопустима в текущем состоянии
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Пустой ввод, запрос к бэкенду не выполняется
    #[error("Input text is empty")]
    EmptyInput,

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка WAV-контейнера
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ошибка с цепочкой контекста
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl StudioError {
    /// Ошибки, которые пользователь видит как сбой генерации
    pub fn is_backend_equivalent(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::DegenerateDuration { .. } | Self::Http(_)
        )
    }

    /// Ошибки, прерывающие экспорт видео
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Self::Capture(_))
    }
}

impl From<&str> for StudioError {
    fn from(s: &str) -> Self {
        StudioError::Other(s.to_string())
    }
}

impl From<String> for StudioError {
    fn from(s: String) -> Self {
        StudioError::Other(s)
    }
}

/// Тип Result для библиотеки voxstudio
pub type Result<T> = std::result::Result<T, StudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_duration_counts_as_backend_failure() {
        let err = StudioError::DegenerateDuration { audio: 0.0, visual: Some(10.0) };
        assert!(err.is_backend_equivalent());
        assert!(!err.is_capture_failure());
        assert!(err.to_string().contains("audio 0.000s"));
    }

    #[test]
    fn test_string_conversion() {
        let err: StudioError = "boom".into();
        assert!(matches!(err, StudioError::Other(ref m) if m == "boom"));
    }
}
