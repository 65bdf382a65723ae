//! Голоса: пресеты и клоны в одном типе, пары дикторов, стили речи.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Категория голоса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoiceGender {
    Male,
    Female,
    Child,
}

/// Характеристики, полученные анализом образца голоса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClonedTraits {
    pub age: String,
    pub accent: String,
    pub language: String,
    pub intonation: String,
    pub rhythm: String,
    /// Инструкция стиля, передаётся синтезу речи без изменений
    pub style_instruction: String,
}

/// Голос для синтеза речи: пресет или клон
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: String,
    pub name: String,
    pub gender: VoiceGender,
    pub description: String,
    /// Идентификатор голоса бэкенда
    pub backend_voice: String,
    /// Рекомендуемый сдвиг высоты тона, в центах
    pub recommended_pitch_cents: f64,
    /// Язык, на котором пресет всегда говорит
    pub native_language: Option<String>,
    pub cloned: Option<ClonedTraits>,
}

impl VoiceProfile {
    pub fn preset(
        id: &str,
        name: &str,
        gender: VoiceGender,
        description: &str,
        backend_voice: &str,
        recommended_pitch_cents: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            gender,
            description: description.to_string(),
            backend_voice: backend_voice.to_string(),
            recommended_pitch_cents,
            native_language: None,
            cloned: None,
        }
    }

    pub fn speaking(mut self, language: &str) -> Self {
        self.native_language = Some(language.to_string());
        self
    }

    /// Клон голоса из результата анализа образца
    pub fn from_analysis(id: impl Into<String>, name: impl Into<String>, analysis: VoiceAnalysis) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender: analysis.gender,
            description: analysis.description,
            backend_voice: analysis.base_voice,
            recommended_pitch_cents: analysis.pitch,
            native_language: None,
            cloned: Some(ClonedTraits {
                age: analysis.age,
                accent: analysis.accent,
                language: analysis.language,
                intonation: analysis.intonation,
                rhythm: analysis.rhythm,
                style_instruction: analysis.style_prompt,
            }),
        }
    }

    pub fn is_cloned(&self) -> bool {
        self.cloned.is_some()
    }

    pub fn style_instruction(&self) -> Option<&str> {
        self.cloned.as_ref().map(|c| c.style_instruction.as_str())
    }

    /// Копия клона с дополнением к инструкции стиля: `"{инструкция}. {дополнение}"`.
    /// Для пресета возвращается копия без изменений.
    pub fn with_style_suffix(&self, suffix: &str) -> Self {
        let mut profile = self.clone();
        if let Some(traits) = profile.cloned.as_mut() {
            traits.style_instruction = format!("{}. {}", traits.style_instruction, suffix);
        }
        profile
    }
}

/// Результат анализа образца голоса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAnalysis {
    pub gender: VoiceGender,
    pub age: String,
    pub accent: String,
    pub language: String,
    pub intonation: String,
    pub rhythm: String,
    pub style_prompt: String,
    pub base_voice: String,
    pub pitch: f64,
    pub description: String,
}

/// Один из дикторов пары
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSpeaker {
    /// Имя в сценарии (`Dad: ...`)
    pub name: String,
    pub backend_voice: String,
    pub label: String,
}

impl PairSpeaker {
    pub fn new(name: &str, backend_voice: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            backend_voice: backend_voice.to_string(),
            label: label.to_string(),
        }
    }
}

/// Пара дикторов для подкаста и истории по ролям
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodcastPair {
    pub id: String,
    pub name: String,
    pub description: String,
    pub first: PairSpeaker,
    pub second: PairSpeaker,
}

/// Кто говорит, определяется один раз на входе в синтез
#[derive(Debug, Clone, PartialEq)]
pub enum SpeakerSpec {
    Solo(VoiceProfile),
    Pair(PairSpeaker, PairSpeaker),
}

impl SpeakerSpec {
    pub fn pair(pair: &PodcastPair) -> Self {
        Self::Pair(pair.first.clone(), pair.second.clone())
    }

    pub fn is_multi_speaker(&self) -> bool {
        matches!(self, Self::Pair(..))
    }
}

/// Манера чтения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeakingStyle {
    #[default]
    Standard,
    Fiction,
    NonFiction,
    Singing,
    Podcast,
    Story,
    SoloStory,
}

impl SpeakingStyle {
    /// Диалог двух дикторов
    pub fn is_multi_speaker(&self) -> bool {
        matches!(self, Self::Podcast | Self::Story)
    }

    /// История с картинкой, заголовком и метаданными
    pub fn is_story(&self) -> bool {
        matches!(self, Self::Story | Self::SoloStory)
    }

    /// Сдвиг высоты тона применяется только к одиночному голосу
    pub fn allows_detune(&self) -> bool {
        !self.is_multi_speaker()
    }

    /// Улучшение текста для речи не применяется к сценариям по ролям
    pub fn allows_enhancement(&self) -> bool {
        !matches!(self, Self::Podcast | Self::Story | Self::SoloStory)
    }
}

/// Язык генерируемого сценария
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScriptLanguage {
    #[default]
    English,
    Urdu,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => f.write_str("English"),
            Self::Urdu => f.write_str("Urdu"),
        }
    }
}

/// Вид генерируемого сценария
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptKind {
    /// Подкаст двух ведущих
    Podcast,
    /// История по ролям для пары
    Story,
    /// История для одного рассказчика
    SoloStory,
}

impl ScriptKind {
    /// Вид сценария для стиля, если стиль его предполагает
    pub fn for_style(style: SpeakingStyle) -> Option<Self> {
        match style {
            SpeakingStyle::Podcast => Some(Self::Podcast),
            SpeakingStyle::Story => Some(Self::Story),
            SpeakingStyle::SoloStory => Some(Self::SoloStory),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> VoiceAnalysis {
        serde_json::from_str(
            r#"{
                "gender": "MALE",
                "age": "middle-aged",
                "accent": "Lahori",
                "language": "Urdu",
                "intonation": "rising",
                "rhythm": "measured",
                "stylePrompt": "Warm baritone with gentle pauses",
                "baseVoice": "Fenrir",
                "pitch": -80,
                "description": "Calm storyteller"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_clone_from_analysis() {
        let profile = VoiceProfile::from_analysis("cloned_sync_voice", "Detected Voice", analysis());
        assert!(profile.is_cloned());
        assert_eq!(profile.backend_voice, "Fenrir");
        assert_eq!(profile.recommended_pitch_cents, -80.0);
        assert_eq!(profile.style_instruction(), Some("Warm baritone with gentle pauses"));
    }

    #[test]
    fn test_style_suffix_only_touches_clones() {
        let profile = VoiceProfile::from_analysis("c", "C", analysis());
        let reinforced = profile.with_style_suffix("Maintain exact Lahori accent and middle-aged vocal characteristics.");
        assert_eq!(
            reinforced.style_instruction(),
            Some("Warm baritone with gentle pauses. Maintain exact Lahori accent and middle-aged vocal characteristics.")
        );

        let preset = VoiceProfile::preset("v2", "Standard Man", VoiceGender::Male, "", "Puck", 0.0);
        assert_eq!(preset.with_style_suffix("ignored"), preset);
    }

    #[test]
    fn test_style_flags() {
        assert!(SpeakingStyle::Podcast.is_multi_speaker());
        assert!(!SpeakingStyle::SoloStory.is_multi_speaker());
        assert!(SpeakingStyle::SoloStory.is_story());
        assert!(SpeakingStyle::SoloStory.allows_detune());
        assert!(!SpeakingStyle::SoloStory.allows_enhancement());
        assert!(SpeakingStyle::Fiction.allows_enhancement());
        assert_eq!(ScriptKind::for_style(SpeakingStyle::Standard), None);
        assert_eq!(
            serde_json::to_string(&SpeakingStyle::NonFiction).unwrap(),
            "\"NON_FICTION\""
        );
    }
}
