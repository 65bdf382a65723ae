//! # Audio модуль
//!
//! Представление синтезированной речи в памяти, декодирование ответа
//! бэкенда, кодирование в WAV и офлайн-рендеринг со сдвигом высоты тона.

pub mod asset;
pub mod codec;
pub mod pitch;

pub use asset::{AudioAsset, duration_in_seconds};
pub use codec::{decode_container, decode_speech_base64, decode_speech_bytes, encode_as_container};
pub use pitch::{PitchRenderer, detune_to_rate, render_with_pitch_shift, rendered_frames};

/// Частота дискретизации ответа синтеза речи
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
