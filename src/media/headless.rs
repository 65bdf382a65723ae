//! # Headless Runtime
//!
//! Детерминированная реализация медиапримитивов поверх часов tokio.
//!
//! Источник «играет» ровно `длительность / скорость` секунд виртуального
//! времени, видеоэлемент вычисляет позицию из момента запуска и скорости,
//! поверхность записывает команды рисования, рекордер выдаёт чанки с
//! заданным интервалом. С `tokio::time::pause()` запись длиной в минуты
//! проходит в тестах мгновенно.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use log::{debug, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audio::{AudioAsset, detune_to_rate};
use crate::error::{Result, StudioError};
use crate::media::runtime::{
    AudioEngine, AudioRoute, AudioSource, DrawingSurface, EndReason, ImageInfo, MediaRecorder,
    MediaStream, MediaTrack, RecorderFactory, Rect, Rgba, SourceState, TextStyle, TrackKind,
    VideoElement, VideoLoader, next_media_id,
};

/// Длительность синтезированного клипа по умолчанию
pub const DEFAULT_CLIP_SECONDS: f64 = 8.0;

fn runtime_handle() -> Result<Handle> {
    Handle::try_current()
        .map_err(|_| StudioError::InvalidState("no async runtime to drive media playback".into()))
}

// ---------------------------------------------------------------------------
// Аудио

/// Аудиовыход без устройства
pub struct HeadlessAudioEngine {
    sample_rate: u32,
    /// Живые источники; завершённые вычищаются при создании следующего
    sources: Mutex<Vec<Arc<HeadlessSource>>>,
    created: AtomicUsize,
    closed: AtomicBool,
}

impl HeadlessAudioEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            sources: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Сколько источников сейчас слышно
    pub fn audible_sources(&self) -> usize {
        self.sources
            .lock()
            .iter()
            .filter(|s| s.route == AudioRoute::Speakers && s.is_playing())
            .count()
    }

    /// Сколько источников сейчас играет, включая захват
    pub fn playing_sources(&self) -> usize {
        self.sources.lock().iter().filter(|s| s.is_playing()).count()
    }

    pub fn created_sources(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Сколько источников ещё не завершилось
    pub fn live_sources(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl AudioEngine for HeadlessAudioEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn create_source(
        &self,
        asset: Arc<AudioAsset>,
        detune_cents: f64,
        route: AudioRoute,
    ) -> Result<Arc<dyn AudioSource>> {
        if self.is_closed() {
            return Err(StudioError::InvalidState("audio engine is closed".into()));
        }
        let seconds = asset.duration() / detune_to_rate(detune_cents);
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(StudioError::Render(format!(
                "detune {} cents gives unusable playback length",
                detune_cents
            )));
        }

        let (state, _) = watch::channel(SourceState::Idle);
        let source = Arc::new(HeadlessSource {
            id: next_media_id(),
            route,
            playback_seconds: seconds,
            state: Arc::new(state),
            task: Mutex::new(None),
        });
        debug!("Created audio source {} ({:?}, {:.3}s)", source.id, route, seconds);
        let mut sources = self.sources.lock();
        sources.retain(|s| !s.has_ended());
        sources.push(Arc::clone(&source));
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(source)
    }

    fn capture_stream(&self, source: &dyn AudioSource) -> Result<MediaStream> {
        if source.route() != AudioRoute::Capture {
            return Err(StudioError::Capture(format!(
                "audio source {} is not routed to a capture destination",
                source.id()
            )));
        }
        Ok(MediaStream::new(vec![MediaTrack::new(
            TrackKind::Audio,
            format!("capture-{}", source.id()),
        )]))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        for source in self.sources.lock().iter() {
            source.stop();
        }
    }
}

/// Источник, завершающийся по таймеру tokio
pub struct HeadlessSource {
    id: u64,
    route: AudioRoute,
    playback_seconds: f64,
    state: Arc<watch::Sender<SourceState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeadlessSource {
    pub fn is_playing(&self) -> bool {
        *self.state.borrow() == SourceState::Playing
    }

    pub fn playback_seconds(&self) -> f64 {
        self.playback_seconds
    }

    fn has_ended(&self) -> bool {
        matches!(*self.state.borrow(), SourceState::Ended(_))
    }
}

impl AudioSource for HeadlessSource {
    fn id(&self) -> u64 {
        self.id
    }

    fn route(&self) -> AudioRoute {
        self.route
    }

    fn start(&self) -> Result<()> {
        if *self.state.borrow() != SourceState::Idle {
            return Err(StudioError::InvalidState(format!(
                "audio source {} can be started only once",
                self.id
            )));
        }
        let handle = runtime_handle()?;

        self.state.send_replace(SourceState::Playing);
        let state = Arc::clone(&self.state);
        let length = Duration::from_secs_f64(self.playback_seconds);
        let task = handle.spawn(async move {
            tokio::time::sleep(length).await;
            state.send_if_modified(|s| {
                if *s == SourceState::Playing {
                    *s = SourceState::Ended(EndReason::Natural);
                    true
                } else {
                    false
                }
            });
        });
        *self.task.lock() = Some(task);
        Ok(())
    }

    fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.state.send_if_modified(|s| {
            if *s == SourceState::Playing {
                *s = SourceState::Ended(EndReason::Stopped);
                true
            } else {
                false
            }
        });
    }

    fn state(&self) -> watch::Receiver<SourceState> {
        self.state.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Видео

struct VideoState {
    rate: f64,
    looping: bool,
    muted: bool,
    playing: bool,
    anchor_position: f64,
    anchor_at: Instant,
    last_pause_position: Option<f64>,
    plays: usize,
}

/// Видеоэлемент, позиция которого вычисляется по виртуальным часам
pub struct HeadlessVideo {
    metadata: watch::Sender<Option<f64>>,
    state: Mutex<VideoState>,
    capture_supported: bool,
}

impl HeadlessVideo {
    /// Видео с уже загруженными метаданными
    pub fn new(duration: f64) -> Self {
        let video = Self::pending();
        video.load_metadata(duration);
        video
    }

    /// Видео, метаданные которого ещё загружаются
    pub fn pending() -> Self {
        let (metadata, _) = watch::channel(None);
        Self {
            metadata,
            state: Mutex::new(VideoState {
                rate: 1.0,
                looping: false,
                muted: false,
                playing: false,
                anchor_position: 0.0,
                anchor_at: Instant::now(),
                last_pause_position: None,
                plays: 0,
            }),
            capture_supported: true,
        }
    }

    /// Элемент, захват которого не поддерживается
    pub fn without_capture(mut self) -> Self {
        self.capture_supported = false;
        self
    }

    pub fn load_metadata(&self, duration: f64) {
        self.metadata.send_replace(Some(duration));
    }

    /// Позиция в момент последней паузы
    pub fn last_pause_position(&self) -> Option<f64> {
        self.state.lock().last_pause_position
    }

    pub fn is_muted(&self) -> bool {
        self.state.lock().muted
    }

    /// Сколько раз вызывался `play()`
    pub fn play_count(&self) -> usize {
        self.state.lock().plays
    }

    fn position_of(&self, state: &VideoState) -> f64 {
        if !state.playing {
            return state.anchor_position;
        }
        let elapsed = Instant::now().duration_since(state.anchor_at).as_secs_f64();
        let raw = state.anchor_position + elapsed * state.rate;
        match *self.metadata.borrow() {
            Some(duration) if duration > 0.0 => {
                if state.looping {
                    raw % duration
                } else {
                    raw.min(duration)
                }
            }
            _ => raw,
        }
    }

    fn reanchor(&self, state: &mut VideoState) {
        state.anchor_position = self.position_of(state);
        state.anchor_at = Instant::now();
    }
}

impl VideoElement for HeadlessVideo {
    fn duration(&self) -> Option<f64> {
        *self.metadata.borrow()
    }

    fn metadata(&self) -> watch::Receiver<Option<f64>> {
        self.metadata.subscribe()
    }

    fn set_playback_rate(&self, rate: f64) {
        let mut state = self.state.lock();
        self.reanchor(&mut state);
        state.rate = rate;
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().rate
    }

    fn set_looping(&self, looping: bool) {
        let mut state = self.state.lock();
        self.reanchor(&mut state);
        state.looping = looping;
    }

    fn is_looping(&self) -> bool {
        self.state.lock().looping
    }

    fn set_muted(&self, muted: bool) {
        self.state.lock().muted = muted;
    }

    fn seek(&self, position: f64) {
        let mut state = self.state.lock();
        let duration = self.duration().unwrap_or(f64::INFINITY);
        state.anchor_position = position.clamp(0.0, duration);
        state.anchor_at = Instant::now();
    }

    fn position(&self) -> f64 {
        let state = self.state.lock();
        self.position_of(&state)
    }

    fn play(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.playing {
            return Ok(());
        }
        if let Some(duration) = self.duration() {
            if !state.looping && state.anchor_position >= duration {
                state.anchor_position = 0.0;
            }
        }
        state.anchor_at = Instant::now();
        state.playing = true;
        state.plays += 1;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.lock();
        if !state.playing {
            return;
        }
        self.reanchor(&mut state);
        state.playing = false;
        state.last_pause_position = Some(state.anchor_position);
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn capture_stream(&self) -> Result<MediaStream> {
        if !self.capture_supported {
            return Err(StudioError::Capture("video element does not support capture".into()));
        }
        Ok(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "video-element"),
            MediaTrack::new(TrackKind::Audio, "video-element"),
        ]))
    }
}

// ---------------------------------------------------------------------------
// Поверхность рисования

/// Записанная команда рисования
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Image { dest: Rect, source: ImageInfo },
    Rect { rect: Rect, color: Rgba },
    Text { text: String, x: f64, y: f64, style: TextStyle },
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Минимальный PNG-заголовок (сигнатура и IHDR) с заданными размерами
pub fn png_header(width: u32, height: u32) -> Vec<u8> {
    let mut png = PNG_SIGNATURE.to_vec();
    png.extend_from_slice(&13u32.to_be_bytes());
    png.extend_from_slice(b"IHDR");
    png.extend_from_slice(&width.to_be_bytes());
    png.extend_from_slice(&height.to_be_bytes());
    // глубина 8, RGBA, без чересстрочности
    png.extend_from_slice(&[8, 6, 0, 0, 0]);
    png
}

fn parse_png_size(image: &[u8]) -> Option<ImageInfo> {
    if image.len() < 24 || image[..8] != PNG_SIGNATURE || &image[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes([image[16], image[17], image[18], image[19]]);
    let height = u32::from_be_bytes([image[20], image[21], image[22], image[23]]);
    (width > 0 && height > 0).then_some(ImageInfo { width, height })
}

struct SurfaceState {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

/// Поверхность, записывающая команды рисования
pub struct HeadlessSurface {
    state: Mutex<SurfaceState>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SurfaceState { width: 300, height: 150, ops: Vec::new() }),
        }
    }

    /// Команды с момента последнего изменения размера
    pub fn ops(&self) -> Vec<DrawOp> {
        self.state.lock().ops.clone()
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingSurface for HeadlessSurface {
    fn resize(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        state.width = width;
        state.height = height;
        // изменение размера очищает холст
        state.ops.clear();
    }

    fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    fn load_image(&self, image: &[u8]) -> Result<ImageInfo> {
        parse_png_size(image)
            .ok_or_else(|| StudioError::Capture("image could not be decoded".into()))
    }

    fn draw_image(&self, image: &[u8], dest: Rect) -> Result<()> {
        let source = self.load_image(image)?;
        self.state.lock().ops.push(DrawOp::Image { dest, source });
        Ok(())
    }

    fn fill_rect(&self, rect: Rect, color: Rgba) {
        self.state.lock().ops.push(DrawOp::Rect { rect, color });
    }

    fn fill_text(&self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.state.lock().ops.push(DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            style: style.clone(),
        });
    }

    fn capture_stream(&self, fps: u32) -> Result<MediaStream> {
        if fps == 0 {
            return Err(StudioError::Capture("capture frame rate must be positive".into()));
        }
        Ok(MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            format!("surface@{}fps", fps),
        )]))
    }
}

// ---------------------------------------------------------------------------
// Рекордер

/// Фабрика рекордеров с фиксированным списком поддерживаемых контейнеров
pub struct HeadlessRecorderFactory {
    supported: Vec<String>,
    timeslice: Duration,
    created: AtomicUsize,
}

impl HeadlessRecorderFactory {
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
            timeslice: Duration::from_millis(250),
            created: AtomicUsize::new(0),
        }
    }

    pub fn with_timeslice(mut self, timeslice: Duration) -> Self {
        self.timeslice = timeslice;
        self
    }

    /// Сколько рекордеров было создано
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl Default for HeadlessRecorderFactory {
    fn default() -> Self {
        Self::new(["video/webm;codecs=vp9,opus", "video/webm", "video/mp4"])
    }
}

impl RecorderFactory for HeadlessRecorderFactory {
    fn is_type_supported(&self, mime: &str) -> bool {
        self.supported.iter().any(|m| m == mime)
    }

    fn create(
        &self,
        stream: &MediaStream,
        mime: &str,
    ) -> Result<(Box<dyn MediaRecorder>, mpsc::UnboundedReceiver<Bytes>)> {
        if !self.is_type_supported(mime) {
            return Err(StudioError::Capture(format!("container {} is not supported", mime)));
        }
        if stream.tracks.is_empty() {
            return Err(StudioError::Capture("cannot record an empty stream".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.created.fetch_add(1, Ordering::SeqCst);
        let recorder = HeadlessRecorder {
            mime: mime.to_string(),
            timeslice: self.timeslice,
            tx: Some(tx),
            stop_tx: None,
        };
        Ok((Box::new(recorder), rx))
    }
}

/// Рекордер, выдающий чанк на каждый интервал
pub struct HeadlessRecorder {
    mime: String,
    timeslice: Duration,
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl MediaRecorder for HeadlessRecorder {
    fn mime_type(&self) -> &str {
        &self.mime
    }

    fn start(&mut self) -> Result<()> {
        let Some(tx) = self.tx.take() else {
            return Err(StudioError::InvalidState("recorder was already started".into()));
        };
        let handle = runtime_handle()?;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let mime = self.mime.clone();
        let timeslice = self.timeslice;

        handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + timeslice, timeslice);
            let mut index = 0u64;
            let _ = tx.send(Bytes::from(format!("{}:header\n", mime)));
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        index += 1;
                        if tx.send(Bytes::from(format!("{}:chunk{}\n", mime, index))).is_err() {
                            warn!("Recorder output dropped before stop");
                            return;
                        }
                    }
                }
            }
            let _ = tx.send(Bytes::from(format!("{}:final\n", mime)));
        });

        self.stop_tx = Some(stop_tx);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
        // рекордер не был запущен: закрываем канал
        self.tx.take();
    }
}

impl Drop for HeadlessRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Загрузчик видео: каждый непустой файл становится клипом заданной длительности
pub struct HeadlessVideoLoader {
    clip_duration: Mutex<f64>,
    loaded: Mutex<Vec<Arc<HeadlessVideo>>>,
}

impl HeadlessVideoLoader {
    pub fn new(clip_duration: f64) -> Self {
        Self {
            clip_duration: Mutex::new(clip_duration),
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn set_clip_duration(&self, seconds: f64) {
        *self.clip_duration.lock() = seconds;
    }

    /// Последнее загруженное видео
    pub fn last(&self) -> Option<Arc<HeadlessVideo>> {
        self.loaded.lock().last().cloned()
    }

    pub fn loaded(&self) -> usize {
        self.loaded.lock().len()
    }
}

impl VideoLoader for HeadlessVideoLoader {
    fn load_video(&self, bytes: Bytes, mime: &str) -> Result<Arc<dyn VideoElement>> {
        if bytes.is_empty() {
            return Err(StudioError::Decode(format!("empty {} file", mime)));
        }
        let video = Arc::new(HeadlessVideo::new(*self.clip_duration.lock()));
        self.loaded.lock().push(Arc::clone(&video));
        Ok(video)
    }
}

// ---------------------------------------------------------------------------

/// Набор headless-примитивов для одной сессии
pub struct HeadlessRuntime {
    pub engine: Arc<HeadlessAudioEngine>,
    pub surface: Arc<HeadlessSurface>,
    pub recorders: Arc<HeadlessRecorderFactory>,
    pub videos: Arc<HeadlessVideoLoader>,
}

impl HeadlessRuntime {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_recorders(sample_rate, HeadlessRecorderFactory::default())
    }

    pub fn with_recorders(sample_rate: u32, recorders: HeadlessRecorderFactory) -> Self {
        Self {
            engine: Arc::new(HeadlessAudioEngine::new(sample_rate)),
            surface: Arc::new(HeadlessSurface::new()),
            recorders: Arc::new(recorders),
            videos: Arc::new(HeadlessVideoLoader::new(DEFAULT_CLIP_SECONDS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::runtime::wait_for_end;

    fn asset(seconds: f64) -> Arc<AudioAsset> {
        let frames = (seconds * 24_000.0) as usize;
        Arc::new(AudioAsset::mono(24_000, vec![0.0; frames]).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_ends_after_its_duration() {
        let engine = HeadlessAudioEngine::new(24_000);
        let source = engine.create_source(asset(3.0), 0.0, AudioRoute::Speakers).unwrap();
        let mut state = source.state();

        let started = Instant::now();
        source.start().unwrap();
        assert_eq!(engine.audible_sources(), 1);

        assert_eq!(wait_for_end(&mut state).await, EndReason::Natural);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(engine.audible_sources(), 0);
        assert!(source.start().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_detune_shortens_playback() {
        let engine = HeadlessAudioEngine::new(24_000);
        let source = engine.create_source(asset(4.0), 1200.0, AudioRoute::Speakers).unwrap();
        let mut state = source.state();
        let started = Instant::now();
        source.start().unwrap();
        wait_for_end(&mut state).await;
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reports_stopped() {
        let engine = HeadlessAudioEngine::new(24_000);
        let source = engine.create_source(asset(10.0), 0.0, AudioRoute::Capture).unwrap();
        let mut state = source.state();
        source.start().unwrap();
        source.stop();
        assert_eq!(wait_for_end(&mut state).await, EndReason::Stopped);
        assert!(engine.capture_stream(source.as_ref()).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_sources_are_released() {
        let engine = HeadlessAudioEngine::new(24_000);
        for _ in 0..5 {
            let source = engine.create_source(asset(1.0), 0.0, AudioRoute::Speakers).unwrap();
            let mut state = source.state();
            source.start().unwrap();
            source.stop();
            wait_for_end(&mut state).await;
        }
        let idle = engine.create_source(asset(1.0), 0.0, AudioRoute::Speakers).unwrap();

        assert_eq!(engine.created_sources(), 6);
        assert_eq!(engine.live_sources(), 1);
        drop(idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_position_follows_rate_and_loop() {
        let video = HeadlessVideo::new(8.0);
        video.set_playback_rate(2.0);
        video.set_looping(true);
        video.play().unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((video.position() - 2.0).abs() < 1e-9);

        video.set_looping(false);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((video.position() - 8.0).abs() < 1e-9);

        video.pause();
        assert_eq!(video.last_pause_position(), Some(8.0));
    }

    #[test]
    fn test_png_header_parsing() {
        let surface = HeadlessSurface::new();
        let info = surface.load_image(&png_header(640, 480)).unwrap();
        assert_eq!(info, ImageInfo { width: 640, height: 480 });
        assert!(surface.load_image(b"GIF89a").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recorder_emits_chunks_until_stopped() {
        let factory = HeadlessRecorderFactory::new(["video/webm"]);
        let stream = MediaStream::new(vec![MediaTrack::new(TrackKind::Video, "v")]);
        assert!(factory.create(&stream, "video/mp4").is_err());

        let (mut recorder, mut rx) = factory.create(&stream, "video/webm").unwrap();
        recorder.start().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        recorder.stop();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks.first().unwrap().as_ref(), b"video/webm:header\n");
        assert_eq!(chunks.last().unwrap().as_ref(), b"video/webm:final\n");
        assert!(chunks.len() >= 5);
    }
}
