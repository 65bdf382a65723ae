//! # Pitch Rendering
//!
//! Офлайн-рендеринг буфера со сдвигом высоты тона (detune, в центах).
//!
//! Сдвиг реализован как изменение скорости воспроизведения
//! `r = 2^(cents/1200)`: длительность результата равна `исходная / r`.
//! Используется только для скачивания файла с применённым сдвигом; при
//! живом прослушивании detune применяется источником воспроизведения.
//!
//! Ресемплинг выполняет Rubato (Sinc-интерполяция); задержка фильтра
//! компенсируется, длина результата округляется до целого фрейма.

use std::sync::Arc;

use log::{debug, info};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::audio::asset::AudioAsset;
use crate::error::{Result, StudioError};

/// Верхний предел длительности результата по умолчанию, в секундах
pub const DEFAULT_MAX_RENDER_SECONDS: f64 = 3600.0;

const CHUNK_FRAMES: usize = 1024;

/// Коэффициент скорости воспроизведения для сдвига в центах
pub fn detune_to_rate(detune_cents: f64) -> f64 {
    2f64.powf(detune_cents / 1200.0)
}

/// Ожидаемое число фреймов после рендеринга
pub fn rendered_frames(frames: usize, detune_cents: f64) -> f64 {
    (frames as f64 / detune_to_rate(detune_cents)).round()
}

/// Офлайн-рендерер со сдвигом высоты тона
#[derive(Debug, Clone, Copy)]
pub struct PitchRenderer {
    max_render_seconds: f64,
}

impl Default for PitchRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RENDER_SECONDS)
    }
}

impl PitchRenderer {
    pub fn new(max_render_seconds: f64) -> Self {
        Self { max_render_seconds }
    }

    /// Рендерит буфер со сдвигом `detune_cents`.
    ///
    /// Нулевой сдвиг возвращает исходный буфер без ресемплинга.
    ///
    /// # Ошибки
    ///
    /// `StudioError::Render`, если сдвиг не конечен, результат пуст
    /// или длиннее установленного предела.
    pub fn render(&self, asset: &Arc<AudioAsset>, detune_cents: f64) -> Result<Arc<AudioAsset>> {
        if !detune_cents.is_finite() {
            return Err(StudioError::Render(format!("detune {} is not finite", detune_cents)));
        }
        if detune_cents == 0.0 {
            debug!("Detune is zero, returning the source buffer");
            return Ok(Arc::clone(asset));
        }

        let rate = detune_to_rate(detune_cents);
        let target = rendered_frames(asset.frames(), detune_cents);
        if !(target >= 1.0) {
            return Err(StudioError::Render(format!(
                "rendered length would be {} frames at rate {:.4}",
                target, rate
            )));
        }
        let target_seconds = target / asset.sample_rate() as f64;
        if target_seconds > self.max_render_seconds {
            return Err(StudioError::Render(format!(
                "rendered length {:.1}s exceeds the {:.1}s ceiling",
                target_seconds, self.max_render_seconds
            )));
        }

        info!(
            "Rendering {:.3}s of audio with detune {} cents (rate {:.4})",
            asset.duration(),
            detune_cents,
            rate
        );
        let channels = resample(asset.channels(), 1.0 / rate, target as usize)?;
        Ok(Arc::new(AudioAsset::new(asset.sample_rate(), channels)?))
    }
}

/// Рендер с пределом по умолчанию
pub fn render_with_pitch_shift(asset: &Arc<AudioAsset>, detune_cents: f64) -> Result<Arc<AudioAsset>> {
    PitchRenderer::default().render(asset, detune_cents)
}

/// Ресемплинг с коэффициентом `ratio` (выход/вход), ровно `target` фреймов на канал.
fn resample(input: &[Vec<f32>], ratio: f64, target: usize) -> Result<Vec<Vec<f32>>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, input.len())
        .map_err(|e| StudioError::Render(format!("resampler initialisation failed: {}", e)))?;

    let delay = resampler.output_delay();
    let needed = target + delay;
    let frames = input.first().map(Vec::len).unwrap_or(0);
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(needed); input.len()];

    // Входные данные дополняются тишиной, пока не наберётся нужная длина выхода
    let max_input = frames + delay * 4 + CHUNK_FRAMES * 8 + (needed as f64 / ratio) as usize;
    let mut pos = 0;
    while output[0].len() < needed {
        if pos > max_input {
            return Err(StudioError::Render(format!(
                "resampler stalled at {} of {} frames",
                output[0].len(),
                needed
            )));
        }

        let n = resampler.input_frames_next();
        let chunk: Vec<Vec<f32>> = input
            .iter()
            .map(|ch| {
                let mut block = vec![0.0; n];
                if pos < ch.len() {
                    let end = (pos + n).min(ch.len());
                    block[..end - pos].copy_from_slice(&ch[pos..end]);
                }
                block
            })
            .collect();

        let produced = resampler
            .process(&chunk, None)
            .map_err(|e| StudioError::Render(format!("resampling failed: {}", e)))?;
        for (out, block) in output.iter_mut().zip(produced) {
            out.extend_from_slice(&block);
        }
        pos += n;
    }

    for channel in &mut output {
        channel.drain(..delay);
        channel.truncate(target);
    }
    Ok(output)
}
