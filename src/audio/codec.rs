//! # Audio Codec
//!
//! Декодирование ответа синтеза речи и кодирование буфера в WAV.
//!
//! Бэкенд возвращает «сырой» PCM: 16 бит, little-endian, моно, без заголовка,
//! с фиксированной частотой дискретизации. Для скачивания буфер упаковывается
//! в канонический RIFF/WAVE (16-бит PCM), все поля размеров вычисляются `hound`.
//!
//! ## Примеры использования
//!
//! ```rust
//! use voxstudio::audio::{decode_speech_bytes, encode_as_container, decode_container};
//!
//! let raw = [0x00, 0x40, 0x00, 0xC0]; // 0.5, -0.5
//! let asset = decode_speech_bytes(&raw, 24_000).unwrap();
//! let wav = encode_as_container(&asset).unwrap();
//! assert_eq!(decode_container(&wav).unwrap(), asset);
//! ```

use std::io::Cursor;

use base64::Engine as _;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

use crate::audio::asset::AudioAsset;
use crate::error::{Result, StudioError};

/// Полная шкала 16-битного PCM
const PCM16_SCALE: f32 = 32768.0;

/// Декодирует «сырой» 16-битный PCM без заголовка в моно-буфер.
///
/// # Ошибки
///
/// `StudioError::Decode`, если частота нулевая или длина данных
/// не кратна размеру фрейма (обрезанный ответ).
pub fn decode_speech_bytes(raw: &[u8], sample_rate_hint: u32) -> Result<AudioAsset> {
    if sample_rate_hint == 0 {
        return Err(StudioError::Decode("sample rate hint must be positive".into()));
    }
    if raw.len() % 2 != 0 {
        return Err(StudioError::Decode(format!(
            "{} bytes is not a whole number of 16-bit frames",
            raw.len()
        )));
    }

    let samples: Vec<f32> = raw
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / PCM16_SCALE)
        .collect();

    debug!("Decoded {} speech samples at {} Hz", samples.len(), sample_rate_hint);
    AudioAsset::mono(sample_rate_hint, samples)
}

/// То же, что [`decode_speech_bytes`], но для base64-ответа бэкенда.
pub fn decode_speech_base64(encoded: &str, sample_rate_hint: u32) -> Result<AudioAsset> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| StudioError::Decode(format!("invalid base64 audio payload: {}", e)))?;
    decode_speech_bytes(&raw, sample_rate_hint)
}

/// Квантование f32 в 16-бит с симметричной шкалой, чтобы k/32768 возвращалось в k.
fn quantize(sample: f32) -> i16 {
    (sample * PCM16_SCALE).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Кодирует буфер в канонический WAV (16-бит PCM).
///
/// Количество каналов и частота берутся из буфера; выравнивание блока,
/// байтрейт и размеры чанков вычисляются из этих полей.
pub fn encode_as_container(asset: &AudioAsset) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: asset.channel_count() as u16,
        sample_rate: asset.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + asset.frames() * asset.channel_count() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for frame in 0..asset.frames() {
            for channel in asset.channels() {
                writer.write_sample(quantize(channel[frame]))?;
            }
        }
        writer.finalize()?;
    }

    let bytes = cursor.into_inner();
    info!(
        "Encoded WAV: {} frames, {} ch, {} Hz, {} bytes",
        asset.frames(),
        asset.channel_count(),
        asset.sample_rate(),
        bytes.len()
    );
    Ok(bytes)
}

/// Декодирует WAV-контейнер обратно в буфер.
///
/// Поддерживаются 16/24/32-битный целочисленный и 32-битный float PCM.
pub fn decode_container(bytes: &[u8]) -> Result<AudioAsset> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| StudioError::Decode(format!("invalid WAV container: {}", e)))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / PCM16_SCALE))
            .collect::<std::result::Result<_, _>>(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<std::result::Result<_, _>>(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2147483648.0))
            .collect::<std::result::Result<_, _>>(),
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<_, _>>(),
        (format, bits) => {
            return Err(StudioError::Decode(format!(
                "unsupported WAV format: {:?}, {} bits",
                format, bits
            )));
        }
    }
    .map_err(|e| StudioError::Decode(format!("truncated WAV payload: {}", e)))?;

    AudioAsset::from_interleaved(spec.sample_rate, spec.channels as usize, &interleaved)
}
