//! Встроенные голоса и пары дикторов, плюс библиотека клонов сессии.

use once_cell::sync::Lazy;

use crate::error::{Result, StudioError};
use crate::voice::profile::{PairSpeaker, PodcastPair, SpeakerSpec, SpeakingStyle, VoiceGender, VoiceProfile};

/// Встроенные голоса
pub static PRESET_VOICES: Lazy<Vec<VoiceProfile>> = Lazy::new(|| {
    use VoiceGender::*;
    vec![
        // Мужские
        VoiceProfile::preset("v_father_solo", "Storyteller Father", Male, "Protective, warm, calm", "Fenrir", -100.0),
        VoiceProfile::preset("urdu_radio_male", "Urdu Radio Commercial", Male, "Deep, resonant, high-impact radio voice", "Fenrir", -120.0).speaking("Urdu"),
        VoiceProfile::preset("v1", "Deep Narrator", Male, "Authoritative, deep", "Fenrir", -200.0),
        VoiceProfile::preset("v2", "Standard Man", Male, "Conversational, clear", "Puck", 0.0),
        VoiceProfile::preset("urdu_comm_male", "Urdu Commercial (Male)", Male, "Bold, professional, ad-style", "Fenrir", -80.0).speaking("Urdu"),
        VoiceProfile::preset("urdu_male_narrator", "Urdu Narrator (Male)", Male, "Deep, clear Urdu accent", "Fenrir", -50.0).speaking("Urdu"),
        VoiceProfile::preset("urdu_wise_old", "Urdu Wise Elder", Male, "Relaxed, Grandfatherly", "Fenrir", -160.0).speaking("Urdu"),
        // Женские
        VoiceProfile::preset("v_mother_solo", "Storyteller Mother", Female, "Gentle, nurturing, soothing", "Kore", 0.0),
        VoiceProfile::preset("v3", "Soft Woman", Female, "Calm, soothing", "Kore", 0.0),
        VoiceProfile::preset("urdu_comm_female", "Urdu Commercial (Female)", Female, "Smooth, polished, professional", "Kore", 0.0).speaking("Urdu"),
        VoiceProfile::preset("urdu_female_narrator", "Urdu Narrator (Female)", Female, "Warm, melodic Urdu accent", "Kore", 0.0).speaking("Urdu"),
        VoiceProfile::preset("v4", "Energetic Woman", Female, "Bright, fast", "Zephyr", 0.0),
        // Детские
        VoiceProfile::preset("v6", "Playful Boy", Child, "Excited, high energy", "Puck", 450.0),
        VoiceProfile::preset("v_boy_urdu", "Urdu Little Boy", Child, "Sweet, innocent Urdu boy", "Puck", 400.0).speaking("Urdu"),
        VoiceProfile::preset("v8", "Baby Girl", Child, "Cute, toddler", "Kore", 600.0),
        VoiceProfile::preset("v_girl_urdu", "Urdu Little Princess", Child, "Happy, sweet Urdu girl", "Kore", 550.0).speaking("Urdu"),
    ]
});

fn pair(id: &str, name: &str, description: &str, first: PairSpeaker, second: PairSpeaker) -> PodcastPair {
    PodcastPair {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        first,
        second,
    }
}

/// Встроенные пары дикторов
pub static PODCAST_PAIRS: Lazy<Vec<PodcastPair>> = Lazy::new(|| {
    vec![
        pair(
            "pair_father_son",
            "Father & Son",
            "A deep dad voice and a playful boy",
            PairSpeaker::new("Dad", "Fenrir", "Father"),
            PairSpeaker::new("Son", "Puck", "Boy"),
        ),
        pair(
            "pair_mother_son",
            "Mother & Son",
            "A nurturing mom and an energetic boy",
            PairSpeaker::new("Mom", "Kore", "Mother"),
            PairSpeaker::new("Son", "Puck", "Boy"),
        ),
        pair(
            "pair_father_daughter",
            "Father & Daughter",
            "A calm dad and a sweet little girl",
            PairSpeaker::new("Dad", "Fenrir", "Father"),
            PairSpeaker::new("Daughter", "Kore", "Girl"),
        ),
        pair(
            "pair_mother_daughter",
            "Mother & Daughter",
            "A warm mom and a bubbly little girl",
            PairSpeaker::new("Mom", "Kore", "Mother"),
            PairSpeaker::new("Daughter", "Zephyr", "Girl"),
        ),
        pair(
            "pair_male_female",
            "Host & Co-Host",
            "Classic professional duo",
            PairSpeaker::new("Alex", "Fenrir", "Male"),
            PairSpeaker::new("Sarah", "Kore", "Female"),
        ),
    ]
});

pub fn preset_voice(id: &str) -> Option<&'static VoiceProfile> {
    PRESET_VOICES.iter().find(|v| v.id == id)
}

pub fn podcast_pair(id: &str) -> Option<&'static PodcastPair> {
    PODCAST_PAIRS.iter().find(|p| p.id == id)
}

/// Пресеты указанной категории, в порядке объявления
pub fn voices_by_gender(gender: VoiceGender) -> impl Iterator<Item = &'static VoiceProfile> {
    PRESET_VOICES.iter().filter(move |v| v.gender == gender)
}

/// Пресеты и клоны, созданные в текущей сессии
#[derive(Debug, Default)]
pub struct VoiceLibrary {
    cloned: Vec<VoiceProfile>,
}

impl VoiceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Добавить клон; клон с тем же id заменяется
    pub fn add_cloned(&mut self, profile: VoiceProfile) {
        self.cloned.retain(|v| v.id != profile.id);
        self.cloned.push(profile);
    }

    pub fn cloned(&self) -> &[VoiceProfile] {
        &self.cloned
    }

    /// Голос по id: сначала клоны сессии, затем пресеты
    pub fn voice(&self, id: &str) -> Option<&VoiceProfile> {
        self.cloned.iter().find(|v| v.id == id).or_else(|| preset_voice(id))
    }

    /// Определить дикторов для стиля по выбранным id
    pub fn resolve(&self, style: SpeakingStyle, voice_id: &str, pair_id: &str) -> Result<SpeakerSpec> {
        if style.is_multi_speaker() {
            let pair = podcast_pair(pair_id)
                .ok_or_else(|| StudioError::InvalidState(format!("unknown speaker pair '{}'", pair_id)))?;
            Ok(SpeakerSpec::pair(pair))
        } else {
            let voice = self
                .voice(voice_id)
                .ok_or_else(|| StudioError::InvalidState(format!("unknown voice '{}'", voice_id)))?;
            Ok(SpeakerSpec::Solo(voice.clone()))
        }
    }
}
