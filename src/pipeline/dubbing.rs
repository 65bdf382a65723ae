//! Дубляж видео клонированным голосом.
//!
//! Загруженное видео транскрибируется и анализируется, голос клонируется,
//! сценарий переписывается под выбранный акцент и озвучивается заново.
//! Сбой анализа возвращает к загрузке, сбой синтеза возвращает к сценарию.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use uuid::Uuid;

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};
use crate::export::{ExportRequest, ExportedFile};
use crate::media::VisualAsset;
use crate::media::runtime::{VideoElement, wait_for_metadata};
use crate::pipeline::{Notice, Studio, Workflow, non_empty};
use crate::progress::ProcessStep;
use crate::sync::{PlaybackState, PlaybackSynchronizer, SyncPolicy};
use crate::voice::{SpeakerSpec, SpeakingStyle, VoiceProfile};

/// Имя файла дубляжа по умолчанию
pub const DEFAULT_DUB_NAME: &str = "enhanced_video";

/// Целевой акцент озвучки
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccentTarget {
    /// Сохранить язык и манеру исходного диктора
    Original,
    /// Английский с урду/пакистанским акцентом
    EnglishUrduAccent,
    /// Любой другой акцент по описанию
    Custom(String),
}

impl Default for AccentTarget {
    fn default() -> Self {
        Self::Custom("Standard Professional".to_string())
    }
}

impl fmt::Display for AccentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => f.write_str("Original (Preserve)"),
            Self::EnglishUrduAccent => f.write_str("English (Urdu Accent)"),
            Self::Custom(accent) => f.write_str(accent),
        }
    }
}

impl AccentTarget {
    pub fn parse(label: &str) -> Self {
        match label {
            "Original (Preserve)" => Self::Original,
            "English (Urdu Accent)" => Self::EnglishUrduAccent,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Стиль переписывания сценария
    pub fn script_style(&self, language: &str) -> String {
        match self {
            Self::Original => format!("Natural, Relaxing, and Grammatically Correct in {}", language),
            other => other.to_string(),
        }
    }

    /// Дополнение к инструкции стиля клонированного голоса
    pub fn accent_instruction(&self, voice: &VoiceProfile) -> String {
        let (age, accent, language) = voice
            .cloned
            .as_ref()
            .map(|c| (c.age.as_str(), c.accent.as_str(), language_or_default(&c.language)))
            .unwrap_or(("adult", "natural", "English"));
        match self {
            Self::Original => format!(
                "Speak in {}. Maintain the speaker's original {} accent, {} voice characteristics, pitch, tone, and emotions. The delivery must be natural and relaxing.",
                language, accent, age
            ),
            Self::EnglishUrduAccent => format!(
                "Speak in English with a perfect Urdu/Pakistani accent. Keep the speaker's {} voice characteristics.",
                age
            ),
            Self::Custom(target) => format!(
                "Keep the speaker's {} voice quality (pitch/tone) but speak in perfect {}.",
                age, target
            ),
        }
    }
}

fn language_or_default(language: &str) -> &str {
    if language.trim().is_empty() { "English" } else { language }
}

/// Варианты акцента, в порядке показа
pub const ACCENT_OPTIONS: [&str; 7] = [
    "Standard Professional",
    "Original (Preserve)",
    "American Accent",
    "British Accent",
    "English (Urdu Accent)",
    "Urdu (Native)",
    "Energetic Promo",
];

/// Шаг сценария дубляжа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DubbingStep {
    Upload,
    Review,
    Result,
}

/// Загруженное видео
struct SourceVideo {
    element: Arc<dyn VideoElement>,
    encoded: String,
    mime: String,
}

/// Сценарий дубляжа
pub struct DubbingSession {
    studio: Arc<Studio>,
    workflow: Workflow,
    step: DubbingStep,
    pub accent: AccentTarget,
    pub script: String,
    transcription: Option<String>,
    source: Option<SourceVideo>,
    voice: Option<VoiceProfile>,
    audio: Option<Arc<AudioAsset>>,
    preview: PlaybackSynchronizer,
}

impl DubbingSession {
    pub fn new(studio: Arc<Studio>) -> Self {
        let mut preview = PlaybackSynchronizer::new(Arc::clone(&studio.ctx));
        // исходное видео идёт со своей скоростью; подгонку включает `set_sync`
        preview.set_policy(SyncPolicy::disabled());
        Self {
            workflow: Workflow::new(Arc::clone(&studio.progress)),
            preview,
            studio,
            step: DubbingStep::Upload,
            accent: AccentTarget::default(),
            script: String::new(),
            transcription: None,
            source: None,
            voice: None,
            audio: None,
        }
    }

    pub fn step(&self) -> DubbingStep {
        self.step
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.workflow.notice()
    }

    pub fn transcription(&self) -> Option<&str> {
        self.transcription.as_deref()
    }

    pub fn voice(&self) -> Option<&VoiceProfile> {
        self.voice.as_ref()
    }

    pub fn audio(&self) -> Option<&Arc<AudioAsset>> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&Arc<dyn VideoElement>> {
        self.source.as_ref().map(|s| &s.element)
    }

    /// Загрузить видео; предыдущие результаты сбрасываются
    pub async fn load_video(&mut self, bytes: Bytes, mime: &str) -> Result<f64> {
        let element = self.studio.videos.load_video(bytes.clone(), mime)?;
        let duration = wait_for_metadata(element.as_ref()).await?;
        self.preview.set_audio(None);
        self.preview.set_visual(None);
        self.source = Some(SourceVideo {
            element,
            encoded: STANDARD.encode(&bytes),
            mime: mime.to_string(),
        });
        self.transcription = None;
        self.voice = None;
        self.audio = None;
        self.script.clear();
        self.step = DubbingStep::Upload;
        Ok(duration)
    }

    /// Транскрибировать видео, клонировать голос и подготовить сценарий
    pub async fn analyze(&mut self) -> Result<()> {
        let (encoded, mime) = match &self.source {
            Some(source) => (source.encoded.clone(), source.mime.clone()),
            None => return Err(StudioError::InvalidState("upload a video first".into())),
        };
        let ticket = self.workflow.begin();
        match self.run_analysis(ticket, &encoded, &mime).await {
            Ok((transcription, voice, script)) => {
                self.transcription = Some(transcription);
                self.voice = Some(voice);
                self.script = script;
                self.step = DubbingStep::Review;
                self.workflow.succeed("Voice cloned, review the script");
                Ok(())
            }
            Err(e) => {
                let err = self.workflow.fail(ticket, e, "Analysis failed. Try a shorter video.");
                if self.workflow.notice().is_some_and(Notice::is_failure) {
                    self.step = DubbingStep::Upload;
                }
                Err(err)
            }
        }
    }

    async fn run_analysis(&mut self, ticket: u64, encoded: &str, mime: &str) -> Result<(String, VoiceProfile, String)> {
        let backend = Arc::clone(&self.studio.backend);
        self.workflow.report(
            ProcessStep::Script,
            "Analyzing video audio, language, age, accent, and voice characteristics...",
        );
        let (transcription, analysis) =
            tokio::try_join!(backend.transcribe(encoded, mime), backend.analyze_voice_sample(encoded, mime))?;
        self.workflow.ensure_current(ticket)?;

        let voice = VoiceProfile::from_analysis(format!("cloned_{}", Uuid::new_v4()), "Cloned Voice", analysis);
        let language = voice
            .cloned
            .as_ref()
            .map(|c| language_or_default(&c.language).to_string())
            .unwrap_or_else(|| "English".to_string());

        self.workflow.report(ProcessStep::Script, "Enhancing script grammar and style...");
        let script = backend
            .improve_script(&transcription, &self.accent.script_style(&language))
            .await?;
        self.workflow.ensure_current(ticket)?;
        Ok((transcription, voice, script))
    }

    /// Озвучить сценарий клонированным голосом с выбранным акцентом
    pub async fn generate(&mut self) -> Result<Option<Arc<AudioAsset>>> {
        let Some(script) = non_empty(&self.script).map(str::to_string) else {
            return Ok(None);
        };
        let voice = self
            .voice
            .as_ref()
            .ok_or_else(|| StudioError::InvalidState("analyze the video first".into()))?
            .clone();
        let speaker = SpeakerSpec::Solo(voice.with_style_suffix(&self.accent.accent_instruction(&voice)));

        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Speech, "Generating high-fidelity cloned audio...");
        let result = match self
            .studio
            .backend
            .synthesize_speech(&script, &speaker, SpeakingStyle::Standard)
            .await
        {
            Ok(encoded) => self
                .workflow
                .ensure_current(ticket)
                .and_then(|_| self.studio.decode_speech(&encoded)),
            Err(e) => Err(e),
        };

        match result {
            Ok(audio) => {
                let visual = self.video().cloned().map(VisualAsset::Video);
                self.preview.set_audio(Some(Arc::clone(&audio)));
                self.preview.set_visual(visual);
                self.audio = Some(Arc::clone(&audio));
                self.step = DubbingStep::Result;
                self.workflow.succeed("Dubbed audio ready");
                Ok(Some(audio))
            }
            Err(e) => {
                let err = self.workflow.fail(ticket, e, "Generation failed.");
                if self.workflow.notice().is_some_and(Notice::is_failure) {
                    self.step = DubbingStep::Review;
                }
                Err(err)
            }
        }
    }

    pub fn toggle_preview(&mut self) -> Result<PlaybackState> {
        self.preview.toggle()
    }

    pub fn set_sync(&mut self, policy: SyncPolicy) {
        self.preview.set_policy(policy);
    }

    pub fn sync_policy(&self) -> SyncPolicy {
        self.preview.policy()
    }

    /// Записать видео с новой озвучкой
    pub async fn export(&mut self) -> Result<ExportedFile> {
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("nothing to export, generate the dub first".into()))?;
        let video = self
            .video()
            .cloned()
            .ok_or_else(|| StudioError::InvalidState("upload a video first".into()))?;

        let request = ExportRequest::new(audio, VisualAsset::Video(video), DEFAULT_DUB_NAME)
            .with_policy(self.preview.policy())
            .timestamped();
        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Export, "Recording dubbed video...");
        let exporter = Arc::clone(&self.studio.exporter);
        match exporter.export(Some(&mut self.preview), request).await {
            Ok(file) => {
                self.workflow.succeed(format!("Saved {}", file.filename));
                Ok(file)
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Video export failed.")),
        }
    }
}
