//! Политика подгонки скорости видео под длительность озвучки.
//!
//! `rate = clamp(V / A, 0.5, 2.0)`. За пределами диапазона видео выглядит
//! неестественно, поэтому рассинхрон принимается осознанно. Одна и та же
//! функция используется при предпросмотре и при экспорте.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StudioError};

/// Минимальная скорость видео
pub const MIN_RATE: f64 = 0.5;
/// Максимальная скорость видео
pub const MAX_RATE: f64 = 2.0;
/// Длительность, ниже которой деление недопустимо, в секундах
pub const MIN_DURATION: f64 = 1e-3;

/// Скорость видео длительностью `visual` для аудио длительностью `audio`
///
/// # Ошибки
///
/// `StudioError::DegenerateDuration`, если любая длительность не конечна
/// или близка к нулю.
pub fn retime_rate(visual: f64, audio: f64) -> Result<f64> {
    if !audio.is_finite() || audio < MIN_DURATION || !visual.is_finite() || visual < MIN_DURATION {
        return Err(StudioError::DegenerateDuration { audio, visual: Some(visual) });
    }
    Ok((visual / audio).clamp(MIN_RATE, MAX_RATE))
}

/// Включена ли подгонка скорости
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    pub enabled: bool,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self::enabled()
    }
}

impl SyncPolicy {
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Скорость для текущих длительностей.
    ///
    /// Без видеодорожки (или с неизвестной/бесконечной длительностью)
    /// и при выключенной политике скорость равна 1.0. Вырожденная
    /// длительность аудио всегда ошибка.
    pub fn rate(&self, visual: Option<f64>, audio: f64) -> Result<f64> {
        if !audio.is_finite() || audio < MIN_DURATION {
            return Err(StudioError::DegenerateDuration { audio, visual });
        }
        if !self.enabled {
            return Ok(1.0);
        }
        match visual {
            Some(v) if v.is_finite() => retime_rate(v, audio),
            _ => Ok(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_within_bounds_is_exact() {
        assert_eq!(retime_rate(10.0, 10.0).unwrap(), 1.0);
        assert_eq!(retime_rate(15.0, 10.0).unwrap(), 1.5);
        assert_eq!(retime_rate(6.0, 10.0).unwrap(), 0.6);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(retime_rate(20.0, 5.0).unwrap(), MAX_RATE);
        assert_eq!(retime_rate(5.0, 20.0).unwrap(), MIN_RATE);
    }

    #[test]
    fn test_rate_bounds_hold_across_grid() {
        for v in [0.01, 0.3, 1.0, 2.7, 9.9, 60.0, 3600.0] {
            for a in [0.01, 0.5, 1.0, 4.2, 30.0, 600.0] {
                let rate = retime_rate(v, a).unwrap();
                assert!((MIN_RATE..=MAX_RATE).contains(&rate), "V={} A={} rate={}", v, a, rate);
                let raw = v / a;
                if (MIN_RATE..=MAX_RATE).contains(&raw) {
                    assert_eq!(rate, raw);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_audio_is_rejected() {
        let policy = SyncPolicy::enabled();
        assert!(matches!(
            policy.rate(Some(10.0), 0.0),
            Err(StudioError::DegenerateDuration { .. })
        ));
        assert!(policy.rate(Some(10.0), f64::NAN).is_err());
        // даже при выключенной политике пустое аудио не воспроизводится
        assert!(SyncPolicy::disabled().rate(None, 0.0).is_err());
        assert!(retime_rate(0.0, 10.0).is_err());
    }

    #[test]
    fn test_missing_or_disabled_visual_uses_native_rate() {
        assert_eq!(SyncPolicy::enabled().rate(None, 5.0).unwrap(), 1.0);
        assert_eq!(SyncPolicy::enabled().rate(Some(f64::INFINITY), 5.0).unwrap(), 1.0);
        assert_eq!(SyncPolicy::disabled().rate(Some(20.0), 5.0).unwrap(), 1.0);
    }
}
