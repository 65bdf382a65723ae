//! # Playback Synchronizer
//!
//! Одновременный предпросмотр озвучки и видеодорожки.
//!
//! Два состояния: `Stopped` и `Playing`. Пауза означает остановку со
//! сбросом в начало. Видео всегда запускается до аудио в том же
//! синхронном шаге, так что отставание, если оно есть, приходится на звук.

use std::sync::Arc;

use log::{debug, info};

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};
use crate::media::runtime::{AudioSource, EndReason, SourceState, wait_for_end};
use crate::media::{StudioContext, VisualAsset};
use crate::sync::policy::SyncPolicy;

/// Состояние предпросмотра
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

pub struct PlaybackSynchronizer {
    ctx: Arc<StudioContext>,
    audio: Option<Arc<AudioAsset>>,
    visual: Option<VisualAsset>,
    policy: SyncPolicy,
    detune_cents: f64,
    state: PlaybackState,
    source: Option<Arc<dyn AudioSource>>,
}

impl PlaybackSynchronizer {
    pub fn new(ctx: Arc<StudioContext>) -> Self {
        Self {
            ctx,
            audio: None,
            visual: None,
            policy: SyncPolicy::default(),
            detune_cents: 0.0,
            state: PlaybackState::Stopped,
            source: None,
        }
    }

    pub fn context(&self) -> &Arc<StudioContext> {
        &self.ctx
    }

    /// Заменить озвучку; текущее воспроизведение останавливается
    pub fn set_audio(&mut self, audio: Option<Arc<AudioAsset>>) {
        self.stop();
        self.audio = audio;
    }

    pub fn audio(&self) -> Option<&Arc<AudioAsset>> {
        self.audio.as_ref()
    }

    /// Заменить видеодорожку; текущее воспроизведение останавливается
    pub fn set_visual(&mut self, visual: Option<VisualAsset>) {
        self.stop();
        self.visual = visual;
    }

    pub fn visual(&self) -> Option<&VisualAsset> {
        self.visual.as_ref()
    }

    /// Применяется со следующего запуска
    pub fn set_policy(&mut self, policy: SyncPolicy) {
        self.policy = policy;
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Сдвиг высоты тона при живом воспроизведении, применяется со следующего запуска
    pub fn set_detune(&mut self, detune_cents: f64) {
        self.detune_cents = detune_cents;
    }

    pub fn detune(&self) -> f64 {
        self.detune_cents
    }

    /// Текущее состояние с учётом естественного завершения аудио
    pub fn state(&mut self) -> PlaybackState {
        let ended = self
            .source
            .as_ref()
            .is_some_and(|s| matches!(*s.state().borrow(), SourceState::Ended(_)));
        if ended {
            self.settle();
        }
        self.state
    }

    pub fn is_playing(&mut self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Скорость видео для текущих длительностей
    pub fn current_rate(&self) -> Result<f64> {
        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| StudioError::InvalidState("no audio to synchronize".into()))?;
        self.policy
            .rate(self.visual.as_ref().and_then(VisualAsset::duration), audio.duration())
    }

    /// Запустить предпросмотр с начала.
    ///
    /// Допустим только из `Stopped`. Предыдущий источник контекста
    /// останавливается до запуска нового.
    pub fn play(&mut self) -> Result<()> {
        if self.state() == PlaybackState::Playing {
            return Err(StudioError::InvalidState("playback is already running, stop it first".into()));
        }
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("no audio to play".into()))?;
        let rate = self.current_rate()?;
        let source = self.ctx.create_source(audio, self.detune_cents)?;

        if let Some(VisualAsset::Video(video)) = &self.visual {
            video.set_muted(true);
            video.set_playback_rate(rate);
            video.seek(0.0);
            video.play()?;
        }
        if let Err(e) = self.ctx.start_exclusive(Arc::clone(&source)) {
            self.halt_visual();
            return Err(e);
        }

        info!("Preview started (rate {:.3}, detune {} cents)", rate, self.detune_cents);
        self.source = Some(source);
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Остановить предпросмотр и сбросить в начало. Из `Stopped` ничего не делает.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(source) = &self.source {
            source.stop();
        }
        self.settle();
        debug!("Preview stopped");
    }

    /// Переключить воспроизведение, вернуть новое состояние
    pub fn toggle(&mut self) -> Result<PlaybackState> {
        match self.state() {
            PlaybackState::Playing => self.stop(),
            PlaybackState::Stopped => self.play()?,
        }
        Ok(self.state)
    }

    /// Дождаться завершения аудио и перейти в `Stopped`.
    ///
    /// `None`, если воспроизведение не запущено.
    pub async fn finished(&mut self) -> Option<EndReason> {
        let source = self.source.clone()?;
        let mut state = source.state();
        let reason = wait_for_end(&mut state).await;
        if self.source.as_ref().is_some_and(|s| s.id() == source.id()) {
            self.settle();
        }
        Some(reason)
    }

    fn settle(&mut self) {
        if let Some(source) = self.source.take() {
            self.ctx.release(source.id());
        }
        self.halt_visual();
        self.state = PlaybackState::Stopped;
    }

    fn halt_visual(&self) {
        if let Some(VisualAsset::Video(video)) = &self.visual {
            video.pause();
            video.seek(0.0);
        }
    }
}

impl Drop for PlaybackSynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}
