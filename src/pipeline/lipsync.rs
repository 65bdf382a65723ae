//! Lip-sync по сценарию: голос из видео, новый текст, видео подгоняется под озвучку.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::audio::AudioAsset;
use crate::error::{Result, StudioError};
use crate::export::{ExportRequest, ExportedFile};
use crate::media::VisualAsset;
use crate::media::runtime::{VideoElement, wait_for_metadata};
use crate::pipeline::{Notice, Studio, Workflow, non_empty};
use crate::progress::ProcessStep;
use crate::sync::{PlaybackState, PlaybackSynchronizer, SyncPolicy};
use crate::voice::{SpeakerSpec, SpeakingStyle, VoiceProfile};

pub const DETECTED_VOICE_ID: &str = "cloned_sync_voice";
pub const DETECTED_VOICE_NAME: &str = "Detected Voice";

/// Сценарий lip-sync
pub struct LipSyncSession {
    studio: Arc<Studio>,
    workflow: Workflow,
    pub script: String,
    video: Option<Arc<dyn VideoElement>>,
    sample: Option<(String, String)>,
    voice: Option<VoiceProfile>,
    audio: Option<Arc<AudioAsset>>,
    preview: PlaybackSynchronizer,
}

impl LipSyncSession {
    pub fn new(studio: Arc<Studio>) -> Self {
        Self {
            workflow: Workflow::new(Arc::clone(&studio.progress)),
            preview: PlaybackSynchronizer::new(Arc::clone(&studio.ctx)),
            studio,
            script: String::new(),
            video: None,
            sample: None,
            voice: None,
            audio: None,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.workflow.notice()
    }

    pub fn voice(&self) -> Option<&VoiceProfile> {
        self.voice.as_ref()
    }

    pub fn audio(&self) -> Option<&Arc<AudioAsset>> {
        self.audio.as_ref()
    }

    pub fn preview(&mut self) -> &mut PlaybackSynchronizer {
        &mut self.preview
    }

    /// Включить или выключить подгонку скорости видео
    pub fn set_smart_sync(&mut self, enabled: bool) {
        let policy = if enabled { SyncPolicy::enabled() } else { SyncPolicy::disabled() };
        self.preview.set_policy(policy);
    }

    pub fn smart_sync(&self) -> bool {
        self.preview.policy().enabled
    }

    /// Загрузить видео и дождаться его длительности
    pub async fn load_video(&mut self, bytes: Bytes, mime: &str) -> Result<f64> {
        let element = self.studio.videos.load_video(bytes.clone(), mime)?;
        let duration = wait_for_metadata(element.as_ref()).await?;
        self.preview.set_visual(Some(VisualAsset::Video(Arc::clone(&element))));
        self.video = Some(element);
        self.sample = Some((STANDARD.encode(&bytes), mime.to_string()));
        self.voice = None;
        Ok(duration)
    }

    /// Определить голос диктора в загруженном видео
    pub async fn analyze(&mut self) -> Result<VoiceProfile> {
        let (encoded, mime) = self
            .sample
            .clone()
            .ok_or_else(|| StudioError::InvalidState("upload a video first".into()))?;
        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Script, "Analyzing voice...");
        let result = self
            .studio
            .backend
            .analyze_voice_sample(&encoded, &mime)
            .await
            .and_then(|analysis| self.workflow.ensure_current(ticket).map(|_| analysis));

        match result {
            Ok(analysis) => {
                let voice = VoiceProfile::from_analysis(DETECTED_VOICE_ID, DETECTED_VOICE_NAME, analysis);
                self.voice = Some(voice.clone());
                self.workflow.succeed("Voice detected");
                Ok(voice)
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Voice analysis failed. Ensure the video has clear speech.")),
        }
    }

    /// Озвучить сценарий найденным голосом
    pub async fn generate(&mut self) -> Result<Option<Arc<AudioAsset>>> {
        let Some(script) = non_empty(&self.script).map(str::to_string) else {
            return Ok(None);
        };
        let voice = self
            .voice
            .clone()
            .ok_or_else(|| StudioError::InvalidState("analyze the video first".into()))?;
        let reinforcement = match &voice.cloned {
            Some(traits) => format!(
                "Maintain exact {} accent and {} vocal characteristics.",
                traits.accent, traits.age
            ),
            None => String::new(),
        };
        let speaker = SpeakerSpec::Solo(voice.with_style_suffix(&reinforcement));

        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Speech, "Generating synced voiceover...");
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
                self.preview.set_audio(Some(Arc::clone(&audio)));
                self.audio = Some(Arc::clone(&audio));
                self.workflow.succeed("Voiceover ready");
                Ok(Some(audio))
            }
            Err(e) => Err(self.workflow.fail(ticket, e, "Audio generation failed. Please try a different script.")),
        }
    }

    /// Скорость видео для текущих длительностей
    pub fn sync_rate(&self) -> Result<f64> {
        self.preview.current_rate()
    }

    pub fn toggle_preview(&mut self) -> Result<PlaybackState> {
        self.preview.toggle()
    }

    /// Записать видео, подогнанное под озвучку
    pub async fn export(&mut self) -> Result<ExportedFile> {
        let audio = self
            .audio
            .clone()
            .ok_or_else(|| StudioError::InvalidState("nothing to export, generate the voiceover first".into()))?;
        let video = self
            .video
            .clone()
            .ok_or_else(|| StudioError::InvalidState("upload a video first".into()))?;

        let request = ExportRequest::new(
            audio,
            VisualAsset::Video(video),
            self.studio.config.default_lipsync_name.clone(),
        )
        .with_policy(self.preview.policy())
        .timestamped();
        let ticket = self.workflow.begin();
        self.workflow.report(ProcessStep::Export, "Recording synced video...");
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
