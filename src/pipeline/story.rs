//! AI-история: сценарий, перевод, озвучка и сгенерированный фоновый клип.
//!
//! Перевод выполняется до синтеза речи. Озвучка и видео создаются
//! параллельно; визуальный запрос строится по исходному сценарию.

use std::sync::Arc;

use futures::future::try_join;

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};
use crate::export::{ExportRequest, ExportedFile};
use crate::media::VisualAsset;
use crate::media::runtime::{VideoElement, wait_for_metadata};
use crate::pipeline::{Notice, Studio, Workflow, non_empty};
use crate::progress::ProcessStep;
use crate::sync::{PlaybackState, PlaybackSynchronizer, SyncPolicy};
use crate::voice::{SpeakerSpec, SpeakingStyle, VoiceGender, VoiceProfile, preset_voice, voices_by_gender};

/// Языки озвучки истории
pub const LANGUAGES: [&str; 9] = [
    "English", "Urdu", "Hindi", "Spanish", "French", "German", "Arabic", "Chinese", "Japanese",
];

const GENERATED_VIDEO_MIME: &str = "video/mp4";

fn first_voice(gender: VoiceGender) -> Option<&'static VoiceProfile> {
    voices_by_gender(gender).next()
}

/// Сценарий AI-истории
pub struct StorySession {
    studio: Arc<Studio>,
    workflow: Workflow,
    pub script: String,
    pub language: String,
    gender: VoiceGender,
    voice_id: String,
    visual_prompt: Option<String>,
    audio: Option<Arc<AudioAsset>>,
    video: Option<Arc<dyn VideoElement>>,
    preview: PlaybackSynchronizer,
}

impl StorySession {
    pub fn new(studio: Arc<Studio>) -> Self {
        let mut preview = PlaybackSynchronizer::new(Arc::clone(&studio.ctx));
        // фоновый клип крутится по кругу со своей скоростью
        preview.set_policy(SyncPolicy::disabled());
        Self {
            workflow: Workflow::new(Arc::clone(&studio.progress)),
            studio,
            script: String::new(),
            language: LANGUAGES[0].to_string(),
            gender: VoiceGender::Male,
            voice_id: first_voice(VoiceGender::Male).map(|v| v.id.clone()).unwrap_or_default(),
            visual_prompt: None,
            audio: None,
            video: None,
            preview,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.workflow.notice()
    }

    pub fn gender(&self) -> VoiceGender {
        self.gender
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    /// Голоса, доступные для выбранной категории
    pub fn voices(&self) -> Vec<&'static VoiceProfile> {
        voices_by_gender(self.gender).collect()
    }

    /// Сменить категорию голоса; выбирается первый голос категории
    pub fn set_gender(&mut self, gender: VoiceGender) {
        self.gender = gender;
        self.voice_id = first_voice(gender).map(|v| v.id.clone()).unwrap_or_default();
    }

    pub fn select_voice(&mut self, id: &str) -> Result<()> {
        match preset_voice(id) {
            Some(voice) if voice.gender == self.gender => {
                self.voice_id = voice.id.clone();
                Ok(())
            }
            _ => Err(StudioError::InvalidState(format!(
                "voice '{}' is not available for {:?}",
                id, self.gender
            ))),
        }
    }

    pub fn visual_prompt(&self) -> Option<&str> {
        self.visual_prompt.as_deref()
    }

    pub fn audio(&self) -> Option<&Arc<AudioAsset>> {
        self.audio.as_ref()
    }

    pub fn video(&self) -> Option<&Arc<dyn VideoElement>> {
        self.video.as_ref()
    }

    /// Создать озвучку и фоновый клип для текущего сценария
    pub async fn generate(&mut self) -> Result<Option<Arc<AudioAsset>>> {
        let Some(script) = non_empty(&self.script).map(str::to_string) else {
            return Ok(None);
        };
        let voice = preset_voice(&self.voice_id)
            .cloned()
            .ok_or_else(|| StudioError::InvalidState(format!("unknown voice '{}'", self.voice_id)))?;

        let ticket = self.workflow.begin();
        match self.run(ticket, script, voice).await {
            Ok((audio, video, prompt)) => {
                video.set_looping(true);
                self.preview.set_audio(Some(Arc::clone(&audio)));
                self.preview.set_visual(Some(VisualAsset::Video(Arc::clone(&video))));
                self.audio = Some(Arc::clone(&audio));
                self.video = Some(video);
                self.visual_prompt = Some(prompt);
                self.workflow.succeed("Story ready");
                Ok(Some(audio))
            }
            Err(e) => Err(self.workflow.fail(
                ticket,
                e,
                "Generation failed. Video generation requires a paid API key.",
            )),
        }
    }

    async fn run(
        &mut self,
        ticket: u64,
        script: String,
        voice: VoiceProfile,
    ) -> Result<(Arc<AudioAsset>, Arc<dyn VideoElement>, String)> {
        let backend = Arc::clone(&self.studio.backend);

        let narration = if self.language.eq_ignore_ascii_case("English") {
            script.clone()
        } else {
            self.workflow
                .report(ProcessStep::Translation, format!("Translating script to {}...", self.language));
            let translated = backend.translate(&script, &self.language).await?;
            self.workflow.ensure_current(ticket)?;
            translated
        };

        self.workflow.report(ProcessStep::Speech, "Generating high-quality AI Voiceover...");
        let speaker = SpeakerSpec::Solo(voice);
        let speech = backend.synthesize_speech(&narration, &speaker, SpeakingStyle::Fiction);
        let workflow = &mut self.workflow;
        let visuals = async {
            workflow.report(ProcessStep::Visuals, "Analyzing script scenes & composing visuals...");
            let prompt = backend.generate_visual_prompt(&script).await?;
            workflow.report(
                ProcessStep::Visuals,
                "Generating AI video footage (Veo)... This may take a moment.",
            );
            let clip = backend.synthesize_video(&prompt).await?;
            Ok::<_, StudioError>((prompt, clip))
        };
        let (encoded, (prompt, clip)) = try_join(speech, visuals).await?;
        self.workflow.ensure_current(ticket)?;

        let audio = self.studio.decode_speech(&encoded)?;
        let video = self.studio.videos.load_video(clip, GENERATED_VIDEO_MIME)?;
        wait_for_metadata(video.as_ref()).await?;
        Ok((audio, video, prompt))
    }

    pub fn toggle_preview(&mut self) -> Result<PlaybackState> {
        self.preview.toggle()
    }

    /// Записать историю: клип по кругу под озвучку
    pub async fn export(&mut self) -> Result<ExportedFile> {
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("nothing to export, generate a story first".into()))?;
        let video = self
            .video
            .clone()
            .ok_or_else(|| StudioError::InvalidState("story has no video to export".into()))?;

        let request = ExportRequest::new(
            audio,
            VisualAsset::Video(video),
            self.studio.config.default_story_name.clone(),
        )
        .with_policy(SyncPolicy::disabled())
        .timestamped();
        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Export, "Recording story video...");
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
