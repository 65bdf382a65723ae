//! voxstudio: студия озвучки и видеоисторий.
//!
//! Декодирование речи бэкенда, рендер с изменением высоты тона,
//! синхронный предпросмотр аудио и видео, запись ролика в реальном
//! времени и сценарии поверх генеративного бэкенда.
//!
//! Платформенные примитивы (аудиодвижок, видеоэлементы, рекордер,
//! поверхность рисования) описаны трейтами в [`media::runtime`];
//! headless-реализации из [`media::headless`] работают на часах tokio.

pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod media;
pub mod pipeline;
pub mod progress;
pub mod sync;
pub mod utils;
pub mod voice;

pub use audio::{AudioAsset, PitchRenderer};
pub use backend::{GeminiBackend, GenerativeBackend};
pub use config::StudioConfig;
pub use error::{Result, StudioError};
pub use export::{ExportRequest, ExportedFile, VideoExporter};
pub use pipeline::{
    DubbingSession, LipSyncSession, Notice, StorySession, Studio, TranscriptionSession, VoiceOverSession,
};
pub use sync::{PlaybackState, PlaybackSynchronizer, SyncPolicy};
pub use voice::{SpeakingStyle, VoiceLibrary, VoiceProfile};
