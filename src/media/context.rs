//! Явно владеемый аудиовыход сессии.
//!
//! Создаётся в начале сессии сценария, передаётся по ссылке синхронизатору
//! и экспорту, закрывается в конце. Держит не более одного активного
//! источника: запуск нового всегда останавливает предыдущий.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};
use crate::media::runtime::{AudioEngine, AudioRoute, AudioSource, MediaStream};

pub struct StudioContext {
    engine: Arc<dyn AudioEngine>,
    active: Mutex<Option<Arc<dyn AudioSource>>>,
    closed: AtomicBool,
}

impl StudioContext {
    pub fn new(engine: Arc<dyn AudioEngine>) -> Self {
        Self {
            engine,
            active: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(StudioError::InvalidState("audio context is closed".into()));
        }
        Ok(())
    }

    /// Создать слышимый источник для предпросмотра
    pub fn create_source(&self, asset: Arc<AudioAsset>, detune_cents: f64) -> Result<Arc<dyn AudioSource>> {
        self.ensure_open()?;
        self.engine.create_source(asset, detune_cents, AudioRoute::Speakers)
    }

    /// Создать источник, направленный в поток захвата
    pub fn create_capture_source(
        &self,
        asset: Arc<AudioAsset>,
        detune_cents: f64,
    ) -> Result<(Arc<dyn AudioSource>, MediaStream)> {
        self.ensure_open()?;
        let source = self.engine.create_source(asset, detune_cents, AudioRoute::Capture)?;
        let stream = self
            .engine
            .capture_stream(source.as_ref())
            .map_err(|e| StudioError::Capture(format!("audio capture failed: {}", e)))?;
        Ok((source, stream))
    }

    /// Запустить источник, предварительно остановив активный
    pub fn start_exclusive(&self, source: Arc<dyn AudioSource>) -> Result<()> {
        self.ensure_open()?;
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            if previous.id() != source.id() {
                debug!("Stopping audio source {} before starting {}", previous.id(), source.id());
                previous.stop();
            }
        }
        source.start()?;
        *active = Some(source);
        Ok(())
    }

    /// Идентификатор активного источника
    pub fn active_id(&self) -> Option<u64> {
        self.active.lock().as_ref().map(|s| s.id())
    }

    /// Забыть источник, если он всё ещё активный
    pub fn release(&self, id: u64) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|s| s.id() == id) {
            *active = None;
        }
    }

    /// Остановить активный источник
    pub fn stop_active(&self) {
        if let Some(source) = self.active.lock().take() {
            source.stop();
        }
    }

    /// Закрыть выход; повторный вызов ничего не делает
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_active();
        self.engine.close();
        debug!("Audio context closed");
    }
}

impl Drop for StudioContext {
    fn drop(&mut self) {
        self.close();
    }
}
