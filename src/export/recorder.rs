//! # Real-Time Recorder
//!
//! Экспорт видео с озвучкой записью в реальном времени.
//!
//! ## Протокол
//!
//! 1. Остановить предпросмотр.
//! 2. Для неподвижного кадра нарисовать изображение с подписью на поверхности.
//! 3. Открыть захват видеодорожки и новый источник аудио, направленный в захват.
//! 4. Объединить видеотреки первого потока с аудиотреками второго.
//! 5. Выбрать поддерживаемый контейнер до начала записи.
//! 6. Запустить рекордер, видео с начала (скорость по `SyncPolicy`), затем аудио с нуля.
//! 7. По естественному завершению аудио остановить рекордер: длительность
//!    файла определяется аудио, а не видео.
//! 8. Собрать чанки в один файл, отдать получателю, вернуть видео в исходное
//!    состояние (цикл включён, скорость 1.0, позиция 0).
//!
//! Флаг `is_rendering()` сбрасывается при любом исходе.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::time::Instant;

use crate::audio::AudioAsset;
use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::export::compositor::compose;
use crate::export::container::{ContainerFormat, select_container};
use crate::export::download::{DownloadSink, ExportedFile};
use crate::export::filename::export_filename;
use crate::media::runtime::{
    AudioSource, DrawingSurface, EndReason, MediaRecorder, MediaStream, RecorderFactory, wait_for_end,
};
use crate::media::{StudioContext, VisualAsset};
use crate::sync::{PlaybackSynchronizer, SyncPolicy};

/// Что и как экспортировать
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub audio: Arc<AudioAsset>,
    pub visual: VisualAsset,
    pub policy: SyncPolicy,
    pub title: Option<String>,
    /// Имя файла, если заголовка нет
    pub default_name: String,
    /// Добавлять к имени по умолчанию отметку времени
    pub timestamped: bool,
}

impl ExportRequest {
    pub fn new(audio: Arc<AudioAsset>, visual: VisualAsset, default_name: impl Into<String>) -> Self {
        Self {
            audio,
            visual,
            policy: SyncPolicy::default(),
            title: None,
            default_name: default_name.into(),
            timestamped: false,
        }
    }

    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn timestamped(mut self) -> Self {
        self.timestamped = true;
        self
    }
}

/// Состояние одной записи
pub struct RecordingSession {
    pub started_at: Instant,
    pub stream: MediaStream,
    pub container: ContainerFormat,
    chunks: Vec<Bytes>,
}

impl RecordingSession {
    fn new(stream: MediaStream, container: ContainerFormat) -> Self {
        Self {
            started_at: Instant::now(),
            stream,
            container,
            chunks: Vec::new(),
        }
    }

    fn push(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Собрать чанки в один файл; сессия при этом освобождается
    fn finish(self, filename: String, duration: Duration) -> ExportedFile {
        let total = self.chunks.iter().map(Bytes::len).sum();
        let mut blob = BytesMut::with_capacity(total);
        for chunk in &self.chunks {
            blob.extend_from_slice(chunk);
        }
        ExportedFile {
            filename,
            mime: self.container.mime,
            bytes: blob.freeze(),
            duration,
        }
    }
}

/// Сбрасывает флаг записи при выходе из области видимости
struct RenderingGuard(Arc<AtomicBool>);

impl RenderingGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| StudioError::InvalidState("an export is already in progress".into()))?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for RenderingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn as_capture(err: StudioError, what: &str) -> StudioError {
    match err {
        StudioError::Capture(_) => err,
        other => StudioError::Capture(format!("{}: {}", what, other)),
    }
}

/// Вернуть видео в исходное состояние
fn restore_idle(visual: &VisualAsset) {
    if let VisualAsset::Video(video) = visual {
        video.pause();
        video.set_looping(true);
        video.set_playback_rate(1.0);
        video.seek(0.0);
    }
}

/// Экспорт видео с озвучкой
pub struct VideoExporter {
    ctx: Arc<StudioContext>,
    recorders: Arc<dyn RecorderFactory>,
    surface: Arc<dyn DrawingSurface>,
    sink: Arc<dyn DownloadSink>,
    config: StudioConfig,
    rendering: Arc<AtomicBool>,
}

impl VideoExporter {
    pub fn new(
        ctx: Arc<StudioContext>,
        recorders: Arc<dyn RecorderFactory>,
        surface: Arc<dyn DrawingSurface>,
        sink: Arc<dyn DownloadSink>,
        config: StudioConfig,
    ) -> Self {
        Self {
            ctx,
            recorders,
            surface,
            sink,
            config,
            rendering: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Идёт ли запись
    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::SeqCst)
    }

    pub fn sink(&self) -> &Arc<dyn DownloadSink> {
        &self.sink
    }

    /// Записать видео с озвучкой и отдать файл получателю.
    ///
    /// Длится столько, сколько играет аудио. Предпросмотр `preview`, если
    /// передан, останавливается первым.
    pub async fn export(
        &self,
        preview: Option<&mut PlaybackSynchronizer>,
        request: ExportRequest,
    ) -> Result<ExportedFile> {
        let _guard = RenderingGuard::acquire(&self.rendering)?;

        if let Some(sync) = preview {
            sync.stop();
        }
        self.ctx.stop_active();

        let result = self.record(&request).await;
        restore_idle(&request.visual);

        match &result {
            Ok(file) => info!(
                "Exported {} ({} bytes, {:.2}s)",
                file.filename,
                file.bytes.len(),
                file.duration.as_secs_f64()
            ),
            Err(e) => error!("Video export failed: {}", e),
        }
        result
    }

    async fn record(&self, request: &ExportRequest) -> Result<ExportedFile> {
        let rate = request
            .policy
            .rate(request.visual.duration(), request.audio.duration())?;
        let container = select_container(self.recorders.as_ref(), &self.config.container_candidates())?;

        let visual_stream = self
            .open_visual_capture(&request.visual)
            .map_err(|e| as_capture(e, "visual capture failed"))?;
        let (source, audio_stream) = self
            .ctx
            // без сдвига высоты тона: запись длится ровно столько, сколько аудио
            .create_capture_source(Arc::clone(&request.audio), 0.0)
            .map_err(|e| as_capture(e, "audio capture failed"))?;
        let combined = MediaStream::combine(&visual_stream, &audio_stream)?;

        let (mut recorder, mut chunks) = self
            .recorders
            .create(&combined, &container.mime)
            .map_err(|e| as_capture(e, "recorder could not be created"))?;
        let mut session = RecordingSession::new(combined, container);
        let mut source_state = source.state();

        if let Err(e) = self.start_recording(recorder.as_mut(), &source, request, rate, &mut session) {
            recorder.stop();
            source.stop();
            self.ctx.release(source.id());
            return Err(as_capture(e, "recording could not start"));
        }
        debug!("Recording at visual rate {:.3}", rate);

        let reason = wait_for_end(&mut source_state).await;
        recorder.stop();
        let duration = session.started_at.elapsed();
        if let VisualAsset::Video(video) = &request.visual {
            video.pause();
        }
        self.ctx.release(source.id());

        while let Some(chunk) = chunks.recv().await {
            session.push(chunk);
        }
        if reason != EndReason::Natural {
            warn!("Recording stopped after {} chunks", session.chunk_count());
            return Err(StudioError::Capture(
                "recording was interrupted before the audio finished".into(),
            ));
        }

        let timestamp = request.timestamped.then(|| Utc::now().timestamp_millis());
        let filename = export_filename(
            request.title.as_deref(),
            &request.default_name,
            session.container.extension(),
            timestamp,
        );
        let file = session.finish(filename, duration);
        self.sink.deliver(&file).await?;
        Ok(file)
    }

    fn open_visual_capture(&self, visual: &VisualAsset) -> Result<MediaStream> {
        match visual {
            VisualAsset::Still(still) => {
                compose(self.surface.as_ref(), still)?;
                self.surface.capture_stream(self.config.capture_fps)
            }
            VisualAsset::Video(video) => video.capture_stream(),
        }
    }

    /// Рекордер, затем видео, затем аудио
    fn start_recording(
        &self,
        recorder: &mut dyn MediaRecorder,
        source: &Arc<dyn AudioSource>,
        request: &ExportRequest,
        rate: f64,
        session: &mut RecordingSession,
    ) -> Result<()> {
        recorder.start()?;
        session.started_at = Instant::now();

        if let VisualAsset::Video(video) = &request.visual {
            video.set_muted(true);
            video.set_looping(!request.policy.enabled);
            video.set_playback_rate(rate);
            video.seek(0.0);
            video.play()?;
        }
        self.ctx.start_exclusive(Arc::clone(source))
    }
}
