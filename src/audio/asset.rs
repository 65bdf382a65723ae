//! Неизменяемый аудиобуфер декодированной речи.

use crate::error::{Result, StudioError};

/// Вычисляет длительность аудио в секундах на основе количества фреймов и частоты дискретизации.
///
/// # Примеры
///
/// ```rust
/// use voxstudio::audio::duration_in_seconds;
/// assert_eq!(duration_in_seconds(24000, 24000), 1.0);
/// assert_eq!(duration_in_seconds(48000, 24000), 2.0);
/// ```
pub fn duration_in_seconds(frame_count: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frame_count as f64 / sample_rate as f64
}

/// Декодированная речь в памяти: планарные f32 семплы по каналам.
///
/// Создаётся один раз на успешный синтез и больше не изменяется;
/// при повторной генерации заменяется целиком.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioAsset {
    /// Создать буфер из планарных каналов одинаковой длины
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StudioError::Decode("sample rate must be positive".into()));
        }
        let Some(first) = channels.first() else {
            return Err(StudioError::Decode("audio must have at least one channel".into()));
        };
        let frames = first.len();
        if channels.iter().any(|ch| ch.len() != frames) {
            return Err(StudioError::Decode("channels have different lengths".into()));
        }
        Ok(Self { sample_rate, channels })
    }

    /// Моно-буфер
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Result<Self> {
        Self::new(sample_rate, vec![samples])
    }

    /// Собрать буфер из перемежённых (interleaved) семплов
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Result<Self> {
        if channel_count == 0 {
            return Err(StudioError::Decode("channel count must be positive".into()));
        }
        if samples.len() % channel_count != 0 {
            return Err(StudioError::Decode(format!(
                "{} samples do not form whole frames of {} channels",
                samples.len(),
                channel_count
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &sample) in channels.iter_mut().zip(frame) {
                ch.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Количество фреймов (семплов на канал)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Длительность в секундах
    pub fn duration(&self) -> f64 {
        duration_in_seconds(self.frames(), self.sample_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Семплы в перемежённом порядке (frame-major)
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channel_count());
        for i in 0..self.frames() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }

    /// Среднеквадратичное значение по всем каналам
    pub fn rms(&self) -> f32 {
        let total: usize = self.channels.iter().map(Vec::len).sum();
        if total == 0 {
            return 0.0;
        }
        let sum_squares: f32 = self.channels.iter().flatten().map(|&s| s * s).sum();
        (sum_squares / total as f32).sqrt()
    }
}
