//! Транскрипция речи из загруженного видео.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Result, StudioError};
use crate::pipeline::{Notice, Studio, Workflow};
use crate::progress::ProcessStep;

/// Текст, когда речь не найдена
pub const NO_SPEECH: &str = "No speech detected.";

/// Сценарий транскрипции
pub struct TranscriptionSession {
    studio: Arc<Studio>,
    workflow: Workflow,
    transcript: Option<String>,
}

impl TranscriptionSession {
    pub fn new(studio: Arc<Studio>) -> Self {
        Self {
            workflow: Workflow::new(Arc::clone(&studio.progress)),
            studio,
            transcript: None,
        }
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.workflow.notice()
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    /// Транскрибировать файл. Пустой файл ничего не делает.
    pub async fn transcribe(&mut self, bytes: &[u8], mime: &str) -> Result<Option<String>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let ticket = self.workflow.begin();

        let limit = self.studio.config.max_upload_bytes;
        if bytes.len() as u64 > limit {
            let message = format!("Please keep video files under {}MB.", limit / (1024 * 1024));
            let err = StudioError::InvalidState(format!("upload of {} bytes exceeds {} bytes", bytes.len(), limit));
            return Err(self.workflow.fail(ticket, err, &message));
        }

        self.workflow.report(ProcessStep::Script, "Transcribing...");
        let encoded = STANDARD.encode(bytes);
        let result = self
            .studio
            .backend
            .transcribe(&encoded, mime)
            .await
            .and_then(|text| self.workflow.ensure_current(ticket).map(|_| text));

        match result {
            Ok(text) => {
                let text = match text.trim() {
                    "" => NO_SPEECH.to_string(),
                    trimmed => trimmed.to_string(),
                };
                self.transcript = Some(text.clone());
                self.workflow.succeed("Transcription ready");
                Ok(Some(text))
            }
            Err(e) => Err(self.workflow.fail(
                ticket,
                e,
                "Transcription failed. Please try a shorter video or check your connection.",
            )),
        }
    }
}
