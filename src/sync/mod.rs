//! # Sync модуль
//!
//! Политика подгонки скорости видео и синхронизатор предпросмотра.

pub mod policy;
pub mod synchronizer;

pub use policy::{MAX_RATE, MIN_DURATION, MIN_RATE, SyncPolicy, retime_rate};
pub use synchronizer::{PlaybackState, PlaybackSynchronizer};
