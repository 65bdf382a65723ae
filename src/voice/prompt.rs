//! Формирование текста запроса к синтезу речи и к генерации сценариев.

use crate::voice::profile::{PairSpeaker, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle};

/// Голоса для одного запроса синтеза
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelection {
    Single(String),
    /// Имя диктора в сценарии и его голос
    Multi(Vec<(String, String)>),
}

/// Готовый запрос к синтезу речи
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub prompt: String,
    pub voices: VoiceSelection,
}

impl SpeechRequest {
    pub fn build(text: &str, speaker: &SpeakerSpec, style: SpeakingStyle) -> Self {
        match speaker {
            SpeakerSpec::Pair(first, second) => Self {
                prompt: conversation_prompt(text, first, second),
                voices: VoiceSelection::Multi(vec![
                    (first.name.clone(), first.backend_voice.clone()),
                    (second.name.clone(), second.backend_voice.clone()),
                ]),
            },
            SpeakerSpec::Solo(voice) => {
                let mut prompt = if voice.native_language.as_deref() == Some("Urdu") {
                    format!("Narrate the following text in Urdu with a natural Pakistani accent: {}", text)
                } else {
                    styled_prompt(text, style)
                };
                if let Some(instruction) = voice.style_instruction() {
                    prompt = format!("{}\n\n{}", instruction, prompt);
                }
                Self {
                    prompt,
                    voices: VoiceSelection::Single(voice.backend_voice.clone()),
                }
            }
        }
    }
}

fn conversation_prompt(text: &str, first: &PairSpeaker, second: &PairSpeaker) -> String {
    format!(
        "TTS the following conversation between {} and {}.\n\n{}",
        first.name, second.name, text
    )
}

fn styled_prompt(text: &str, style: SpeakingStyle) -> String {
    match style {
        SpeakingStyle::Fiction => format!(
            "Read the following story with deep emotion, character expression, and dramatic flair suitable for an audiobook: {}",
            text
        ),
        SpeakingStyle::NonFiction => format!(
            "Narrate the following text in a clear, professional, and factual documentary style: {}",
            text
        ),
        SpeakingStyle::Singing => format!("Sing this cheerfully: {}", text),
        _ => text.to_string(),
    }
}

pub fn translation_prompt(text: &str, target_language: &str) -> String {
    if target_language.eq_ignore_ascii_case("urdu") {
        format!(
            "Translate the following text to Urdu (Pakistani standard). Provide only the translated Urdu text, nothing else:\n\n{}",
            text
        )
    } else {
        format!(
            "Translate the following text to {}. Provide only the translated text, nothing else:\n\n{}",
            target_language, text
        )
    }
}

pub fn improve_script_prompt(text: &str, style: &str) -> String {
    format!(
        "Rewrite the following script so that it reads well aloud. Target style: {}. \
         Fix grammar, keep the meaning and the original length. Provide only the rewritten script:\n\n{}",
        style, text
    )
}

pub fn optimize_prompt(text: &str) -> String {
    format!(
        "Optimize the following text for natural text-to-speech narration. Add punctuation for pauses, \
         expand abbreviations and numbers into words, keep the meaning. Provide only the optimized text:\n\n{}",
        text
    )
}

fn language_instruction(language: ScriptLanguage) -> &'static str {
    match language {
        ScriptLanguage::Urdu => {
            "The dialogue must be in Urdu (Roman Urdu or Urdu script as preferred, but make it natural)."
        }
        ScriptLanguage::English => "The dialogue must be in English.",
    }
}

/// Запрос на сценарий по теме или черновику
pub fn dialogue_script_prompt(
    text: &str,
    kind: ScriptKind,
    first: &PairSpeaker,
    second: &PairSpeaker,
    language: ScriptLanguage,
) -> String {
    match kind {
        ScriptKind::Podcast => format!(
            "Create a podcast script between two speakers, {s1} and {s2}, based on the following topic or text: \"{text}\".\n\
             {lang}\n\
             Format the output strictly as:\n\
             {s1}: [Line]\n\
             {s2}: [Line]\n\
             Keep the tone conversational.",
            s1 = first.name,
            s2 = second.name,
            text = text,
            lang = language_instruction(language),
        ),
        ScriptKind::Story => format!(
            "Write a short story told as a dialogue between {s1} ({l1}) and {s2} ({l2}), based on: \"{text}\".\n\
             {lang}\n\
             Format the output strictly as:\n\
             {s1}: [Line]\n\
             {s2}: [Line]\n\
             Keep it warm and suitable for family listening.",
            s1 = first.name,
            l1 = first.label,
            s2 = second.name,
            l2 = second.label,
            text = text,
            lang = language_instruction(language),
        ),
        ScriptKind::SoloStory => format!(
            "Write a short story for a single narrator based on: \"{}\".\n{}\n\
             Provide only the story text, without a title or speaker names.",
            text,
            match language {
                ScriptLanguage::Urdu => "The story must be in Urdu, natural and easy to narrate.",
                ScriptLanguage::English => "The story must be in English.",
            },
        ),
    }
}

pub fn visual_prompt_request(script: &str) -> String {
    format!(
        "Describe a single cinematic scene that captures the following script, as a prompt for a video \
         generation model. Mention setting, lighting, mood and camera movement. Provide only the prompt:\n\n{}",
        script
    )
}

pub fn story_image_prompt(script: &str) -> String {
    format!(
        "A vivid storybook illustration for the following story, no text in the image: {}",
        script
    )
}

pub fn title_prompt(text: &str) -> String {
    format!(
        "Suggest a short, catchy title (at most six words) for the following story. Provide only the title:\n\n{}",
        text
    )
}

pub fn seo_prompt(text: &str) -> String {
    format!(
        "Create YouTube metadata for the following story. Respond with JSON of the form \
         {{\"title\": string, \"description\": string, \"tags\": [string]}}:\n\n{}",
        text
    )
}

pub const TRANSCRIBE_PROMPT: &str =
    "Please transcribe the speech in this video accurately. Provide only the transcription without intro or outro text.";

pub const ANALYZE_VOICE_PROMPT: &str = "Analyze the speaker's voice in this media. Respond with JSON containing: \
     gender (MALE, FEMALE or CHILD), age, accent, language, intonation, rhythm, \
     stylePrompt (a one-sentence instruction describing how to reproduce this voice), \
     baseVoice (one of Puck, Charon, Kore, Fenrir, Zephyr), pitch (cents offset from the base voice), \
     description.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::presets::{podcast_pair, preset_voice};
    use crate::voice::profile::{VoiceAnalysis, VoiceGender, VoiceProfile};

    #[test]
    fn test_urdu_preset_overrides_style() {
        let voice = preset_voice("urdu_male_narrator").unwrap().clone();
        let request = SpeechRequest::build("Salaam", &SpeakerSpec::Solo(voice), SpeakingStyle::Fiction);
        assert_eq!(
            request.prompt,
            "Narrate the following text in Urdu with a natural Pakistani accent: Salaam"
        );
        assert_eq!(request.voices, VoiceSelection::Single("Fenrir".into()));
    }

    #[test]
    fn test_style_framing() {
        let voice = SpeakerSpec::Solo(preset_voice("v2").unwrap().clone());
        assert_eq!(SpeechRequest::build("hi", &voice, SpeakingStyle::Standard).prompt, "hi");
        assert_eq!(SpeechRequest::build("la", &voice, SpeakingStyle::Singing).prompt, "Sing this cheerfully: la");
        assert!(
            SpeechRequest::build("x", &voice, SpeakingStyle::NonFiction)
                .prompt
                .contains("documentary style: x")
        );
    }

    #[test]
    fn test_pair_uses_multi_speaker_voices() {
        let speaker = SpeakerSpec::pair(podcast_pair("pair_male_female").unwrap());
        let request = SpeechRequest::build("Alex: Hi\nSarah: Hello", &speaker, SpeakingStyle::Podcast);
        assert!(request.prompt.starts_with("TTS the following conversation between Alex and Sarah.\n\n"));
        assert_eq!(
            request.voices,
            VoiceSelection::Multi(vec![("Alex".into(), "Fenrir".into()), ("Sarah".into(), "Kore".into())])
        );
    }

    #[test]
    fn test_cloned_instruction_is_passed_verbatim() {
        let clone = VoiceProfile::from_analysis(
            "c",
            "Clone",
            VoiceAnalysis {
                gender: VoiceGender::Female,
                age: "young".into(),
                accent: "British".into(),
                language: "English".into(),
                intonation: "lively".into(),
                rhythm: "quick".into(),
                style_prompt: "Bright; crisp consonants!".into(),
                base_voice: "Zephyr".into(),
                pitch: 0.0,
                description: String::new(),
            },
        );
        let request = SpeechRequest::build("Hello", &SpeakerSpec::Solo(clone), SpeakingStyle::Standard);
        assert_eq!(request.prompt, "Bright; crisp consonants!\n\nHello");
    }

    #[test]
    fn test_podcast_script_language() {
        let pair = podcast_pair("pair_father_son").unwrap();
        let prompt = dialogue_script_prompt("kites", ScriptKind::Podcast, &pair.first, &pair.second, ScriptLanguage::Urdu);
        assert!(prompt.contains("Dad: [Line]"));
        assert!(prompt.contains("The dialogue must be in Urdu"));
        assert!(translation_prompt("x", "Urdu").contains("Pakistani standard"));
        assert!(translation_prompt("x", "French").contains("to French."));
    }
}
