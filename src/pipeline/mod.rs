//! # Pipeline модуль
//!
//! Сценарии студии поверх бэкенда, синхронизатора и экспорта:
//! озвучка текста, дубляж видео клонированным голосом, lip-sync по сценарию,
//! AI-история и транскрипция.
//!
//! Общие правила для всех сценариев:
//! - пустой ввод не вызывает бэкенд и не меняет состояние;
//! - любой сбой заканчивается одним читаемым `Notice::Failure` и возвратом
//!   к шагу, с которого можно повторить;
//! - результат устаревшего запроса (после `SessionGuard::invalidate`) отбрасывается.

pub mod dubbing;
pub mod lipsync;
pub mod story;
pub mod transcription;
pub mod voice_over;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{error, info, warn};

use crate::audio::{AudioAsset, decode_speech_base64};
use crate::backend::GenerativeBackend;
use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::export::{DownloadSink, VideoExporter};
use crate::media::runtime::{AudioEngine, DrawingSurface, RecorderFactory, VideoLoader};
use crate::media::{HeadlessRuntime, StudioContext};
use crate::progress::{ProcessStep, ProgressTracker};

pub use dubbing::{ACCENT_OPTIONS, AccentTarget, DubbingSession, DubbingStep};
pub use lipsync::LipSyncSession;
pub use story::{LANGUAGES, StorySession};
pub use transcription::{NO_SPEECH, TranscriptionSession};
pub use voice_over::{StoryExtras, VoiceOverSession};

/// Сообщение пользователю по итогам операции
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Failure(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Self::Info(m) | Self::Failure(m) => m,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// Счётчик поколений запросов сценария
#[derive(Debug, Default)]
pub struct SessionGuard {
    generation: AtomicU64,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Начать новый запрос; предыдущие становятся устаревшими
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Сделать устаревшими все начатые запросы
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Общие службы студии, которые разделяют все сценарии
pub struct Studio {
    pub config: StudioConfig,
    pub backend: Arc<dyn GenerativeBackend>,
    pub ctx: Arc<StudioContext>,
    pub exporter: Arc<VideoExporter>,
    pub videos: Arc<dyn VideoLoader>,
    pub progress: Arc<ProgressTracker>,
}

impl Studio {
    pub fn new(
        config: StudioConfig,
        backend: Arc<dyn GenerativeBackend>,
        engine: Arc<dyn AudioEngine>,
        recorders: Arc<dyn RecorderFactory>,
        surface: Arc<dyn DrawingSurface>,
        videos: Arc<dyn VideoLoader>,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        if !config.has_credentials() {
            warn!("No API key configured; backend calls will fail");
        }
        let ctx = Arc::new(StudioContext::new(engine));
        let exporter = Arc::new(VideoExporter::new(
            Arc::clone(&ctx),
            recorders,
            surface,
            sink,
            config.clone(),
        ));
        Self {
            config,
            backend,
            ctx,
            exporter,
            videos,
            progress: Arc::new(ProgressTracker::new()),
        }
    }

    /// Студия на headless-примитивах
    pub fn headless(
        config: StudioConfig,
        backend: Arc<dyn GenerativeBackend>,
        runtime: &HeadlessRuntime,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        Self::new(
            config,
            backend,
            runtime.engine.clone(),
            runtime.recorders.clone(),
            runtime.surface.clone(),
            runtime.videos.clone(),
            sink,
        )
    }

    /// Декодировать ответ синтеза речи
    pub fn decode_speech(&self, encoded: &str) -> Result<Arc<AudioAsset>> {
        Ok(Arc::new(decode_speech_base64(encoded, self.config.speech_sample_rate)?))
    }
}

/// Состояние одного сценария: текущий статус, итоговое сообщение, поколение запроса
pub struct Workflow {
    progress: Arc<ProgressTracker>,
    guard: Arc<SessionGuard>,
    status: Option<String>,
    notice: Option<Notice>,
    /// Запрос, начатый последним вызовом `begin`
    latest: Option<u64>,
}

impl Workflow {
    pub fn new(progress: Arc<ProgressTracker>) -> Self {
        Self {
            progress,
            guard: Arc::new(SessionGuard::new()),
            status: None,
            notice: None,
            latest: None,
        }
    }

    /// Начать запрос: сбросить сообщение и получить номер поколения
    pub fn begin(&mut self) -> u64 {
        self.notice = None;
        let ticket = self.guard.begin();
        self.latest = Some(ticket);
        ticket
    }

    /// Счётчик поколений, через который запрос можно отменить извне
    pub fn guard(&self) -> Arc<SessionGuard> {
        Arc::clone(&self.guard)
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_some()
    }

    pub fn report(&mut self, step: ProcessStep, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.progress.set_step(step, Some(message.clone()));
        self.status = Some(message);
    }

    /// Проверить, что результат запроса ещё нужен
    pub fn ensure_current(&self, ticket: u64) -> Result<()> {
        if self.guard.is_current(ticket) {
            Ok(())
        } else {
            Err(StudioError::InvalidState("result of a superseded request was discarded".into()))
        }
    }

    pub fn succeed(&mut self, message: impl Into<String>) {
        self.status = None;
        self.progress.complete();
        self.notice = Some(Notice::Info(message.into()));
    }

    /// Завершить запрос ошибкой. Для устаревшего запроса сообщение не показывается.
    pub fn fail(&mut self, ticket: u64, err: StudioError, message: &str) -> StudioError {
        if !self.guard.is_current(ticket) {
            warn!("Discarding failure of a superseded request: {}", err);
            // отменён извне, а новый запрос не начат: снять занятость
            if self.latest == Some(ticket) {
                self.latest = None;
                self.status = None;
                self.progress.reset();
            }
            return err;
        }
        error!("{}: {}", message, err);
        self.status = None;
        self.progress.reset();
        self.notice = Some(Notice::Failure(message.to_string()));
        err
    }
}

/// Непустой ввод после обрезки пробелов
pub(crate) fn non_empty(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
