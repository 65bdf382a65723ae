//! Выбор контейнера записи до её начала.

use log::{info, warn};

use crate::error::{Result, StudioError};
use crate::media::runtime::RecorderFactory;

/// Контейнер, выбранный для записи
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerFormat {
    pub mime: String,
}

impl ContainerFormat {
    pub fn new(mime: impl Into<String>) -> Self {
        Self { mime: mime.into() }
    }

    /// MIME без параметров кодеков
    pub fn base_mime(&self) -> &str {
        self.mime.split(';').next().unwrap_or(&self.mime).trim()
    }

    /// Расширение файла для контейнера
    pub fn extension(&self) -> &'static str {
        match self.base_mime() {
            "video/mp4" | "audio/mp4" => "mp4",
            "video/ogg" | "audio/ogg" => "ogg",
            "video/x-matroska" => "mkv",
            _ => "webm",
        }
    }
}

/// Первый поддерживаемый рантаймом контейнер из списка кандидатов
///
/// # Ошибки
///
/// `StudioError::Capture`, если ни один кандидат не поддерживается.
pub fn select_container(recorders: &dyn RecorderFactory, candidates: &[String]) -> Result<ContainerFormat> {
    for (index, mime) in candidates.iter().enumerate() {
        if recorders.is_type_supported(mime) {
            if index > 0 {
                warn!("Preferred container {} unsupported, falling back to {}", candidates[0], mime);
            }
            info!("Recording container: {}", mime);
            return Ok(ContainerFormat::new(mime.clone()));
        }
    }
    Err(StudioError::Capture(format!(
        "none of the recording containers are supported: {}",
        candidates.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::HeadlessRecorderFactory;

    fn candidates() -> Vec<String> {
        vec![
            "video/webm;codecs=vp9,opus".to_string(),
            "video/webm".to_string(),
            "video/mp4".to_string(),
        ]
    }

    #[test]
    fn test_preferred_container_wins() {
        let factory = HeadlessRecorderFactory::default();
        let format = select_container(&factory, &candidates()).unwrap();
        assert_eq!(format.mime, "video/webm;codecs=vp9,opus");
        assert_eq!(format.base_mime(), "video/webm");
        assert_eq!(format.extension(), "webm");
    }

    #[test]
    fn test_fallback_container_extension() {
        let factory = HeadlessRecorderFactory::new(["video/mp4"]);
        let format = select_container(&factory, &candidates()).unwrap();
        assert_eq!(format.extension(), "mp4");
    }

    #[test]
    fn test_nothing_supported_is_capture_error() {
        let factory = HeadlessRecorderFactory::new(Vec::<String>::new());
        let err = select_container(&factory, &candidates()).unwrap_err();
        assert!(err.is_capture_failure());
    }
}
