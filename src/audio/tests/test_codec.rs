use crate::audio::{
    AudioAsset, SPEECH_SAMPLE_RATE, decode_container, decode_speech_base64, decode_speech_bytes,
    encode_as_container,
};
use crate::error::StudioError;
use base64::Engine as _;

/// Сырой PCM из набора 16-битных значений
fn pcm_bytes(values: &[i16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn test_decode_speech_bytes_scales_by_full_range() {
    let raw = pcm_bytes(&[0, 16384, -16384, i16::MIN, i16::MAX]);
    let asset = decode_speech_bytes(&raw, SPEECH_SAMPLE_RATE).unwrap();

    assert_eq!(asset.channel_count(), 1);
    assert_eq!(asset.frames(), 5);
    let samples = asset.channel(0).unwrap();
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[1], 0.5);
    assert_eq!(samples[2], -0.5);
    assert_eq!(samples[3], -1.0);
    assert!((samples[4] - 32767.0 / 32768.0).abs() < f32::EPSILON);
}

#[test]
fn test_decode_odd_length_is_rejected() {
    let err = decode_speech_bytes(&[0x00, 0x40, 0x01], SPEECH_SAMPLE_RATE).unwrap_err();
    assert!(matches!(err, StudioError::Decode(_)));
}

#[test]
fn test_decode_zero_rate_is_rejected() {
    let err = decode_speech_bytes(&[0x00, 0x40], 0).unwrap_err();
    assert!(matches!(err, StudioError::Decode(_)));
}

#[test]
fn test_decode_empty_payload_gives_empty_asset() {
    let asset = decode_speech_bytes(&[], SPEECH_SAMPLE_RATE).unwrap();
    assert!(asset.is_empty());
    assert_eq!(asset.duration(), 0.0);
}

#[test]
fn test_decode_base64_payload() {
    let raw = pcm_bytes(&[100, -100, 2000]);
    let encoded = base64::engine::general_purpose::STANDARD.encode(&raw);

    let asset = decode_speech_base64(&encoded, SPEECH_SAMPLE_RATE).unwrap();
    assert_eq!(asset.frames(), 3);
    assert!(decode_speech_base64("not base64!!", SPEECH_SAMPLE_RATE).is_err());
}

#[test]
fn test_wav_round_trip_is_lossless_for_pcm16_values() {
    let values: Vec<i16> = (0..2400).map(|i| ((i * 37) % 65536 - 32768) as i16).collect();
    let asset = decode_speech_bytes(&pcm_bytes(&values), SPEECH_SAMPLE_RATE).unwrap();

    let wav = encode_as_container(&asset).unwrap();
    let restored = decode_container(&wav).unwrap();

    assert_eq!(restored.sample_rate(), SPEECH_SAMPLE_RATE);
    assert_eq!(restored, asset);
}

#[test]
fn test_wav_header_fields() {
    let asset = AudioAsset::new(24_000, vec![vec![0.0; 10], vec![0.25; 10]]).unwrap();
    let wav = encode_as_container(&asset).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    // 44 байта заголовка + 10 фреймов * 2 канала * 2 байта
    assert_eq!(wav.len(), 44 + 40);
    let riff_size = u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]);
    assert_eq!(riff_size as usize, wav.len() - 8);
    let channels = u16::from_le_bytes([wav[22], wav[23]]);
    let sample_rate = u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]);
    let byte_rate = u32::from_le_bytes([wav[28], wav[29], wav[30], wav[31]]);
    let block_align = u16::from_le_bytes([wav[32], wav[33]]);
    assert_eq!(channels, 2);
    assert_eq!(sample_rate, 24_000);
    assert_eq!(byte_rate, 24_000 * 4);
    assert_eq!(block_align, 4);
}

#[test]
fn test_encode_clamps_out_of_range_samples() {
    let asset = AudioAsset::mono(8_000, vec![1.5, -1.5]).unwrap();
    let restored = decode_container(&encode_as_container(&asset).unwrap()).unwrap();
    let samples = restored.channel(0).unwrap();
    assert!((samples[0] - 32767.0 / 32768.0).abs() < f32::EPSILON);
    assert_eq!(samples[1], -1.0);
}

#[test]
fn test_decode_container_rejects_garbage() {
    let err = decode_container(b"definitely not a wav file").unwrap_err();
    assert!(matches!(err, StudioError::Decode(_)));
}
