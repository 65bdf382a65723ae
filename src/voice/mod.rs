//! # Voice модуль
//!
//! Голоса (пресеты и клоны), пары дикторов, стили чтения и тексты запросов.

pub mod presets;
pub mod profile;
pub mod prompt;

pub use presets::{PODCAST_PAIRS, PRESET_VOICES, VoiceLibrary, podcast_pair, preset_voice, voices_by_gender};
pub use profile::{
    ClonedTraits, PairSpeaker, PodcastPair, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle,
    VoiceAnalysis, VoiceGender, VoiceProfile,
};
pub use prompt::{SpeechRequest, VoiceSelection};
