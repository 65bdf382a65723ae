//! # Media модуль
//!
//! Медиапримитивы в виде трейтов, явный аудиоконтекст сессии,
//! описание видеодорожки и headless-реализация для тестов и встраивания.

pub mod context;
pub mod headless;
pub mod runtime;
pub mod visual;

pub use context::StudioContext;
pub use headless::{
    HeadlessAudioEngine, HeadlessRecorderFactory, HeadlessRuntime, HeadlessSurface, HeadlessVideo,
    HeadlessVideoLoader,
};
pub use runtime::{
    AudioEngine, AudioRoute, AudioSource, DrawingSurface, EndReason, MediaRecorder, MediaStream,
    RecorderFactory, SourceState, VideoElement, VideoLoader, wait_for_end, wait_for_metadata,
};
pub use visual::{AspectRatio, StillComposite, VisualAsset};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::AudioAsset;

    fn asset(seconds: f64) -> Arc<AudioAsset> {
        Arc::new(AudioAsset::mono(24_000, vec![0.0; (seconds * 24_000.0) as usize]).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_keeps_one_source_active() {
        let engine = Arc::new(HeadlessAudioEngine::new(24_000));
        let ctx = StudioContext::new(engine.clone());

        let first = ctx.create_source(asset(10.0), 0.0).unwrap();
        let second = ctx.create_source(asset(10.0), 0.0).unwrap();
        ctx.start_exclusive(first.clone()).unwrap();
        ctx.start_exclusive(second.clone()).unwrap();

        assert_eq!(engine.audible_sources(), 1);
        assert_eq!(*first.state().borrow(), SourceState::Ended(EndReason::Stopped));
        assert_eq!(ctx.active_id(), Some(second.id()));
    }

    #[tokio::test]
    async fn test_closed_context_refuses_sources() {
        let engine = Arc::new(HeadlessAudioEngine::new(24_000));
        let ctx = StudioContext::new(engine.clone());
        ctx.close();

        assert!(engine.is_closed());
        assert!(ctx.create_source(asset(1.0), 0.0).is_err());
        assert!(ctx.create_capture_source(asset(1.0), 0.0).is_err());
    }

    #[tokio::test]
    async fn test_metadata_wait() {
        let video = Arc::new(HeadlessVideo::pending());
        let loader = video.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            loader.load_metadata(12.5);
        });
        assert_eq!(wait_for_metadata(video.as_ref()).await.unwrap(), 12.5);
    }
}
