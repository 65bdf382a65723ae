//! # Media Runtime
//!
//! Интерфейсы медиапримитивов, с которыми работают синхронизатор и экспорт:
//! источники воспроизведения аудио, видеоэлемент, поверхность рисования,
//! потоки захвата и рекордер контейнера.
//!
//! Завершение воспроизведения сообщается через `tokio::sync::watch`, а не
//! через колбэки: ожидающая сторона просто делает `.await`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};

static NEXT_MEDIA_ID: AtomicU64 = AtomicU64::new(1);

/// Уникальный идентификатор источника или трека в пределах процесса
pub fn next_media_id() -> u64 {
    NEXT_MEDIA_ID.fetch_add(1, Ordering::Relaxed)
}

/// Тип трека в потоке
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Трек живого потока захвата
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: u64,
    pub kind: TrackKind,
    /// Откуда пришёл трек (для диагностики)
    pub label: String,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self { id: next_media_id(), kind, label: label.into() }
    }
}

/// Живой поток, набор треков
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStream {
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    /// Видеотреки первого потока плюс аудиотреки второго.
    ///
    /// Звук исходного видео в результат не попадает.
    pub fn combine(video: &MediaStream, audio: &MediaStream) -> Result<MediaStream> {
        let tracks: Vec<MediaTrack> = video
            .video_tracks()
            .cloned()
            .chain(audio.audio_tracks().cloned())
            .collect();

        if !tracks.iter().any(|t| t.kind == TrackKind::Video) {
            return Err(StudioError::Capture("visual capture produced no video track".into()));
        }
        if !tracks.iter().any(|t| t.kind == TrackKind::Audio) {
            return Err(StudioError::Capture("audio capture produced no audio track".into()));
        }
        Ok(MediaStream { tracks })
    }
}

/// Причина завершения источника
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Дошёл до конца буфера
    Natural,
    /// Остановлен вызовом `stop()`
    Stopped,
}

/// Состояние источника воспроизведения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Idle,
    Playing,
    Ended(EndReason),
}

/// Куда направлен звук источника
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioRoute {
    /// Слышимый выход (предпросмотр)
    Speakers,
    /// Назначение захвата для записи
    Capture,
}

/// Одноразовый источник воспроизведения буфера.
///
/// Запускается не более одного раза за время жизни; для повторного
/// воспроизведения создаётся новый источник.
pub trait AudioSource: Send + Sync {
    fn id(&self) -> u64;

    fn route(&self) -> AudioRoute;

    /// Начать воспроизведение с нулевой позиции
    fn start(&self) -> Result<()>;

    /// Остановить воспроизведение; повторный вызов ничего не делает
    fn stop(&self);

    /// Подписка на состояние источника
    fn state(&self) -> watch::Receiver<SourceState>;
}

/// Дождаться завершения источника
pub async fn wait_for_end(state: &mut watch::Receiver<SourceState>) -> EndReason {
    loop {
        let current = *state.borrow_and_update();
        if let SourceState::Ended(reason) = current {
            return reason;
        }
        if state.changed().await.is_err() {
            // Источник уничтожен, не дойдя до конца
            return EndReason::Stopped;
        }
    }
}

/// Аудиовыход с возможностью создавать источники
pub trait AudioEngine: Send + Sync {
    fn sample_rate(&self) -> u32;

    /// Создать источник со сдвигом высоты тона `detune_cents`
    fn create_source(
        &self,
        asset: Arc<AudioAsset>,
        detune_cents: f64,
        route: AudioRoute,
    ) -> Result<Arc<dyn AudioSource>>;

    /// Поток захвата для источника, направленного в `AudioRoute::Capture`
    fn capture_stream(&self, source: &dyn AudioSource) -> Result<MediaStream>;

    /// Освободить выход; источники после этого не создаются
    fn close(&self);
}

/// Видеоэлемент с собственной длительностью
pub trait VideoElement: Send + Sync {
    /// Длительность в секундах, `None` пока метаданные не загружены
    fn duration(&self) -> Option<f64>;

    /// Подписка на загрузку метаданных
    fn metadata(&self) -> watch::Receiver<Option<f64>>;

    fn set_playback_rate(&self, rate: f64);

    fn playback_rate(&self) -> f64;

    fn set_looping(&self, looping: bool);

    fn is_looping(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn seek(&self, position: f64);

    fn position(&self) -> f64;

    fn play(&self) -> Result<()>;

    fn pause(&self);

    fn is_playing(&self) -> bool;

    /// Живой поток с треками элемента
    fn capture_stream(&self) -> Result<MediaStream>;
}

/// Дождаться метаданных видео и вернуть его длительность
pub async fn wait_for_metadata(video: &dyn VideoElement) -> Result<f64> {
    let mut metadata = video.metadata();
    loop {
        let current = *metadata.borrow_and_update();
        if let Some(duration) = current {
            return Ok(duration);
        }
        if metadata.changed().await.is_err() {
            return Err(StudioError::Decode("video metadata never became available".into()));
        }
    }
}

/// Создание видеоэлемента из байтов загруженного или синтезированного файла
pub trait VideoLoader: Send + Sync {
    fn load_video(&self, bytes: Bytes, mime: &str) -> Result<Arc<dyn VideoElement>>;
}

/// Прямоугольник на поверхности рисования
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Цвет с прозрачностью
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 1.0 };
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 1.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Стиль подписи
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: String,
    pub color: Rgba,
    pub align: TextAlign,
}

/// Размеры загруженного изображения
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Внеэкранная поверхность рисования
pub trait DrawingSurface: Send + Sync {
    fn resize(&self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// Разобрать закодированное изображение
    fn load_image(&self, image: &[u8]) -> Result<ImageInfo>;

    fn draw_image(&self, image: &[u8], dest: Rect) -> Result<()>;

    fn fill_rect(&self, rect: Rect, color: Rgba);

    fn fill_text(&self, text: &str, x: f64, y: f64, style: &TextStyle);

    /// Живой поток текущих пикселей поверхности с частотой `fps`
    fn capture_stream(&self, fps: u32) -> Result<MediaStream>;
}

/// Рекордер живого потока в контейнер
pub trait MediaRecorder: Send {
    fn mime_type(&self) -> &str;

    fn start(&mut self) -> Result<()>;

    /// Остановить запись; после последнего чанка канал закрывается
    fn stop(&mut self);
}

/// Фабрика рекордеров с проверкой поддержки контейнера
pub trait RecorderFactory: Send + Sync {
    fn is_type_supported(&self, mime: &str) -> bool;

    /// Создать рекордер и канал, в который он пишет чанки по порядку
    fn create(
        &self,
        stream: &MediaStream,
        mime: &str,
    ) -> Result<(Box<dyn MediaRecorder>, mpsc::UnboundedReceiver<Bytes>)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_takes_video_from_first_and_audio_from_second() {
        let video = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "element"),
            MediaTrack::new(TrackKind::Audio, "element"),
        ]);
        let audio = MediaStream::new(vec![MediaTrack::new(TrackKind::Audio, "speech")]);

        let combined = MediaStream::combine(&video, &audio).unwrap();
        assert_eq!(combined.tracks.len(), 2);
        assert_eq!(combined.video_tracks().next().unwrap().label, "element");
        assert_eq!(combined.audio_tracks().next().unwrap().label, "speech");
    }

    #[test]
    fn test_combine_without_audio_is_capture_error() {
        let video = MediaStream::new(vec![MediaTrack::new(TrackKind::Video, "surface")]);
        let err = MediaStream::combine(&video, &MediaStream::default()).unwrap_err();
        assert!(err.is_capture_failure());
    }

    #[tokio::test]
    async fn test_wait_for_end_sees_final_state() {
        let (tx, mut rx) = watch::channel(SourceState::Idle);
        tx.send_replace(SourceState::Playing);
        tx.send_replace(SourceState::Ended(EndReason::Natural));
        assert_eq!(wait_for_end(&mut rx).await, EndReason::Natural);

        let (tx, mut rx) = watch::channel(SourceState::Playing);
        drop(tx);
        assert_eq!(wait_for_end(&mut rx).await, EndReason::Stopped);
    }
}
