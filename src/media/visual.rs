use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::media::runtime::VideoElement;

/// Соотношение сторон кадра
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AspectRatio {
    /// 9:16
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Размеры поверхности рисования для кадра
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Portrait => (720, 1280),
            Self::Landscape => (1280, 720),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portrait => "9:16",
            Self::Landscape => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Неподвижное изображение с подписью
#[derive(Debug, Clone, PartialEq)]
pub struct StillComposite {
    /// Закодированное изображение (PNG или JPEG)
    pub image: Bytes,
    pub caption: Option<String>,
    pub aspect: AspectRatio,
}

/// Видеодорожка презентации
#[derive(Clone)]
pub enum VisualAsset {
    Video(Arc<dyn VideoElement>),
    Still(StillComposite),
}

impl VisualAsset {
    /// Собственная длительность; у неподвижного изображения её нет
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Video(video) => video.duration(),
            Self::Still(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&Arc<dyn VideoElement>> {
        match self {
            Self::Video(video) => Some(video),
            Self::Still(_) => None,
        }
    }
}

impl fmt::Debug for VisualAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video(video) => f.debug_tuple("Video").field(&video.duration()).finish(),
            Self::Still(still) => f
                .debug_struct("Still")
                .field("bytes", &still.image.len())
                .field("caption", &still.caption)
                .field("aspect", &still.aspect)
                .finish(),
        }
    }
}
