//! Озвучка текста: пресет или клон, подкаст и истории по ролям.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use log::warn;

use crate::audio::AudioAsset;
use crate::backend::SeoMetadata;
use crate::error::{Result, StudioError};
use crate::export::{ExportRequest, ExportedFile, export_audio};
use crate::media::{AspectRatio, StillComposite, VisualAsset};
use crate::pipeline::{Notice, Studio, Workflow, non_empty};
use crate::progress::ProcessStep;
use crate::sync::{PlaybackState, PlaybackSynchronizer};
use crate::voice::prompt::story_image_prompt;
use crate::voice::{
    PODCAST_PAIRS, PRESET_VOICES, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle, VoiceLibrary,
    VoiceProfile, podcast_pair,
};

const DEFAULT_STORY_TITLE: &str = "Story";

/// Картинка, заголовок и метаданные истории
#[derive(Debug, Clone, PartialEq)]
pub struct StoryExtras {
    pub image: Option<Bytes>,
    pub title: String,
    pub metadata: Option<SeoMetadata>,
}

impl StoryExtras {
    fn still(&self, aspect: AspectRatio) -> Option<VisualAsset> {
        self.image.as_ref().map(|image| {
            VisualAsset::Still(StillComposite {
                image: image.clone(),
                caption: Some(self.title.clone()),
                aspect,
            })
        })
    }
}

fn decode_image(encoded: &str) -> Option<Bytes> {
    match STANDARD.decode(encoded.trim()) {
        Ok(bytes) if !bytes.is_empty() => Some(Bytes::from(bytes)),
        Ok(_) => None,
        Err(e) => {
            warn!("Story image payload is not valid base64: {}", e);
            None
        }
    }
}

/// Сценарий озвучки текста
pub struct VoiceOverSession {
    studio: Arc<Studio>,
    workflow: Workflow,
    library: VoiceLibrary,
    pub text: String,
    pub style: SpeakingStyle,
    pub voice_id: String,
    pub pair_id: String,
    pub script_language: ScriptLanguage,
    /// Подготовить текст к чтению вслух перед синтезом
    pub enhance: bool,
    pub aspect: AspectRatio,
    detune_cents: f64,
    audio: Option<Arc<AudioAsset>>,
    story: Option<StoryExtras>,
    preview: PlaybackSynchronizer,
}

impl VoiceOverSession {
    pub fn new(studio: Arc<Studio>) -> Self {
        let voice = &PRESET_VOICES[0];
        Self {
            workflow: Workflow::new(Arc::clone(&studio.progress)),
            preview: PlaybackSynchronizer::new(Arc::clone(&studio.ctx)),
            studio,
            library: VoiceLibrary::new(),
            text: String::new(),
            style: SpeakingStyle::default(),
            voice_id: voice.id.clone(),
            pair_id: PODCAST_PAIRS[0].id.clone(),
            script_language: ScriptLanguage::default(),
            enhance: false,
            aspect: AspectRatio::default(),
            detune_cents: voice.recommended_pitch_cents,
            audio: None,
            story: None,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.workflow.notice()
    }

    pub fn library_mut(&mut self) -> &mut VoiceLibrary {
        &mut self.library
    }

    pub fn audio(&self) -> Option<&Arc<AudioAsset>> {
        self.audio.as_ref()
    }

    pub fn story(&self) -> Option<&StoryExtras> {
        self.story.as_ref()
    }

    pub fn preview(&mut self) -> &mut PlaybackSynchronizer {
        &mut self.preview
    }

    /// Выбрать голос; сдвиг высоты тона берётся рекомендованный
    pub fn select_voice(&mut self, id: &str) -> Result<VoiceProfile> {
        let voice = self
            .library
            .voice(id)
            .cloned()
            .ok_or_else(|| StudioError::InvalidState(format!("unknown voice '{}'", id)))?;
        self.voice_id = voice.id.clone();
        self.set_detune(voice.recommended_pitch_cents);
        Ok(voice)
    }

    pub fn set_detune(&mut self, detune_cents: f64) {
        self.detune_cents = detune_cents;
        let effective = self.effective_detune();
        self.preview.set_detune(effective);
    }

    pub fn detune(&self) -> f64 {
        self.detune_cents
    }

    /// Сдвиг, который реально применяется: для диалогов всегда ноль
    pub fn effective_detune(&self) -> f64 {
        if self.style.allows_detune() { self.detune_cents } else { 0.0 }
    }

    /// Сгенерировать сценарий для подкаста или истории по теме.
    ///
    /// Пустая тема ничего не делает и возвращает `None`.
    pub async fn generate_script(&mut self, topic: &str) -> Result<Option<String>> {
        let Some(topic) = non_empty(topic).map(str::to_string) else {
            return Ok(None);
        };
        let kind = ScriptKind::for_style(self.style).ok_or_else(|| {
            StudioError::InvalidState(format!("style {:?} does not generate scripts", self.style))
        })?;
        let pair = podcast_pair(&self.pair_id)
            .ok_or_else(|| StudioError::InvalidState(format!("unknown speaker pair '{}'", self.pair_id)))?;

        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Script, "Writing script...");
        let result = self
            .studio
            .backend
            .generate_dialogue_script(&topic, kind, pair, self.script_language)
            .await
            .and_then(|script| self.workflow.ensure_current(ticket).map(|_| script));

        match result {
            Ok(script) => {
                self.text = script.clone();
                self.workflow.succeed("Script ready");
                Ok(Some(script))
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Script generation failed.")),
        }
    }

    /// Перевести текст на урду; язык сценария переключается на урду
    pub async fn translate_to_urdu(&mut self) -> Result<Option<String>> {
        let Some(text) = non_empty(&self.text).map(str::to_string) else {
            return Ok(None);
        };
        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Translation, "Translating to Urdu...");
        let result = self
            .studio
            .backend
            .translate(&text, "Urdu")
            .await
            .and_then(|translated| self.workflow.ensure_current(ticket).map(|_| translated));

        match result {
            Ok(translated) => {
                self.text = translated.clone();
                self.script_language = ScriptLanguage::Urdu;
                self.workflow.succeed("Translated to Urdu");
                Ok(Some(translated))
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Translation failed.")),
        }
    }

    /// Синтезировать озвучку текущего текста.
    ///
    /// Пустой текст не вызывает бэкенд и не меняет состояние. Для историй
    /// параллельно с речью создаются картинка, заголовок и метаданные; их
    /// сбои не прерывают генерацию.
    pub async fn generate(&mut self) -> Result<Option<Arc<AudioAsset>>> {
        let Some(text) = non_empty(&self.text).map(str::to_string) else {
            return Ok(None);
        };
        let speaker = self.library.resolve(self.style, &self.voice_id, &self.pair_id)?;

        let ticket = self.workflow.begin();
        match self.synthesize(ticket, text, &speaker).await {
            Ok((audio, story)) => {
                let detune = self.effective_detune();
                self.preview.set_audio(Some(Arc::clone(&audio)));
                self.preview.set_visual(story.as_ref().and_then(|s| s.still(self.aspect)));
                self.preview.set_detune(detune);
                self.audio = Some(Arc::clone(&audio));
                self.story = story;
                self.workflow.succeed("Voiceover ready");
                Ok(Some(audio))
            }
            Err(e) => {
                let message = if e.is_backend_equivalent() {
                    format!("Generation failed: {}", e)
                } else {
                    "Generation failed.".to_string()
                };
                Err(self.workflow.fail(ticket, e, &message))
            }
        }
    }

    async fn synthesize(
        &mut self,
        ticket: u64,
        mut text: String,
        speaker: &SpeakerSpec,
    ) -> Result<(Arc<AudioAsset>, Option<StoryExtras>)> {
        let backend = Arc::clone(&self.studio.backend);

        if self.enhance && self.style.allows_enhancement() {
            self.workflow.report(ProcessStep::Script, "Enhancing text for narration...");
            text = backend.optimize_for_speech(&text).await?;
            self.workflow.ensure_current(ticket)?;
            self.text = text.clone();
        }

        self.workflow.report(ProcessStep::Speech, "Generating voiceover...");
        let (encoded, story) = if self.style.is_story() {
            let image_prompt = story_image_prompt(&text);
            let (speech, image, title, metadata) = tokio::join!(
                backend.synthesize_speech(&text, speaker, self.style),
                backend.synthesize_image(&image_prompt, self.aspect),
                backend.generate_title(&text),
                backend.generate_seo_metadata(&text),
            );
            let story = StoryExtras {
                image: image
                    .inspect_err(|e| warn!("Story image was not generated: {}", e))
                    .ok()
                    .and_then(|encoded| decode_image(&encoded)),
                title: title
                    .inspect_err(|e| warn!("Story title was not generated: {}", e))
                    .unwrap_or_else(|_| DEFAULT_STORY_TITLE.to_string()),
                metadata: metadata
                    .inspect_err(|e| warn!("Story metadata was not generated: {}", e))
                    .ok(),
            };
            (speech?, Some(story))
        } else {
            (backend.synthesize_speech(&text, speaker, self.style).await?, None)
        };
        self.workflow.ensure_current(ticket)?;

        let audio = self.studio.decode_speech(&encoded)?;
        Ok((audio, story))
    }

    /// Запустить или остановить предпросмотр
    pub fn toggle_preview(&mut self) -> Result<PlaybackState> {
        self.preview.toggle()
    }

    /// Скачать озвучку в WAV с текущим сдвигом высоты тона
    pub async fn download_audio(&mut self) -> Result<ExportedFile> {
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("nothing to download, generate a voiceover first".into()))?;
        self.preview.stop();

        let title = self.story.as_ref().map(|s| s.title.clone());
        let ticket = self.workflow.begin();
        let sink = Arc::clone(self.studio.exporter.sink());
        match export_audio(&audio, self.effective_detune(), title.as_deref(), &self.studio.config, sink.as_ref())
            .await
        {
            Ok(file) => {
                self.workflow.succeed(format!("Saved {}", file.filename));
                Ok(file)
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Audio download failed.")),
        }
    }

    /// Записать видео истории: картинка с заголовком под озвучку
    pub async fn export_story_video(&mut self) -> Result<ExportedFile> {
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("nothing to export, generate a story first".into()))?;
        let story = self
            .story
            .clone()
            .ok_or_else(|| StudioError::InvalidState("story video needs a story style".into()))?;
        let visual = story
            .still(self.aspect)
            .ok_or_else(|| StudioError::InvalidState("story has no image to export".into()))?;

        let request = ExportRequest::new(audio, visual, self.studio.config.default_story_name.clone())
            .with_title(Some(story.title))
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
