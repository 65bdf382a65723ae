//! Скачивание озвучки в WAV, при необходимости со сдвигом высоты тона.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use log::info;

use crate::audio::{AudioAsset, PitchRenderer, encode_as_container};
use crate::config::StudioConfig;
use crate::error::Result;
use crate::export::download::{DownloadSink, ExportedFile};
use crate::export::filename::export_filename;

pub const WAV_MIME: &str = "audio/wav";

/// Сохранить озвучку как WAV.
///
/// Ненулевой `detune_cents` рендерится офлайн, чтобы файл звучал так же,
/// как предпросмотр.
pub async fn export_audio(
    asset: &Arc<AudioAsset>,
    detune_cents: f64,
    title: Option<&str>,
    config: &StudioConfig,
    sink: &dyn DownloadSink,
) -> Result<ExportedFile> {
    let rendered = PitchRenderer::new(config.max_render_seconds).render(asset, detune_cents)?;
    let bytes = encode_as_container(&rendered)?;

    let file = ExportedFile {
        filename: export_filename(title, &config.default_audio_name, "wav", None),
        mime: WAV_MIME.to_string(),
        bytes: Bytes::from(bytes),
        duration: Duration::from_secs_f64(rendered.duration()),
    };
    sink.deliver(&file).await?;

    info!("Exported audio {} ({:.2}s)", file.filename, rendered.duration());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode_container;
    use crate::export::download::MemorySink;

    fn tone(seconds: f64) -> Arc<AudioAsset> {
        let frames = (seconds * 24_000.0) as usize;
        let samples = (0..frames).map(|i| ((i as f32) * 0.05).sin() * 0.4).collect();
        Arc::new(AudioAsset::mono(24_000, samples).unwrap())
    }

    #[tokio::test]
    async fn test_export_without_detune_keeps_samples() {
        let sink = MemorySink::new();
        let asset = tone(0.5);

        let file = export_audio(&asset, 0.0, Some("My Podcast"), &StudioConfig::default(), &sink)
            .await
            .unwrap();

        assert_eq!(file.filename, "my_podcast.wav");
        assert_eq!(file.mime, WAV_MIME);
        let restored = decode_container(&file.bytes).unwrap();
        assert_eq!(restored.frames(), asset.frames());
        assert_eq!(sink.files().len(), 1);
    }

    #[tokio::test]
    async fn test_export_with_detune_renders_shifted_audio() {
        let sink = MemorySink::new();
        let file = export_audio(&tone(1.0), -1200.0, None, &StudioConfig::default(), &sink)
            .await
            .unwrap();

        assert_eq!(file.filename, "voxstudio_audio.wav");
        assert_eq!(decode_container(&file.bytes).unwrap().frames(), 48_000);
        assert_eq!(file.duration, Duration::from_secs(2));
    }
}
