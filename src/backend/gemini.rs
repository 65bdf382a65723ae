//! Клиент Gemini REST API: generateContent, predict и predictLongRunning.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::backend::{GenerativeBackend, SeoMetadata};
use crate::config::StudioConfig;
use crate::error::{Result, StudioError};
use crate::media::AspectRatio;
use crate::voice::prompt::{self, SpeechRequest, VoiceSelection};
use crate::voice::{PodcastPair, ScriptKind, ScriptLanguage, SpeakerSpec, SpeakingStyle, VoiceAnalysis};

// Ответ generateContent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

// Ответ predict (изображения)
#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

// Длительная операция (видео)
#[derive(Debug, Deserialize)]
pub(crate) struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    uri: String,
}

fn parts(response: &GenerateContentResponse) -> impl Iterator<Item = &Part> {
    response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
}

fn joined_text(response: &GenerateContentResponse) -> String {
    parts(response)
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string()
}

/// Текст ответа; пустой ответ - ошибка
pub(crate) fn extract_text(raw: &Value) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_value(raw.clone())?;
    if let Some(reason) = response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_ref()) {
        return Err(StudioError::Backend(format!("request was blocked: {}", reason)));
    }
    let text = joined_text(&response);
    if text.is_empty() {
        return Err(StudioError::Backend("empty text response".into()));
    }
    Ok(text)
}

/// Аудио ответа в base64. Текст вместо аудио считается отказом.
pub(crate) fn extract_audio(raw: &Value) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_value(raw.clone())?;
    if let Some(data) = parts(&response).find_map(|p| p.inline_data.as_ref()) {
        if !data.data.is_empty() {
            return Ok(data.data.clone());
        }
    }
    let text = joined_text(&response);
    if !text.is_empty() {
        return Err(StudioError::Backend(format!("speech synthesis was refused: {}", text)));
    }
    Err(StudioError::Backend("No audio data returned from Gemini.".into()))
}

pub(crate) fn extract_image(raw: &Value) -> Result<String> {
    let response: PredictResponse = serde_json::from_value(raw.clone())?;
    response
        .predictions
        .into_iter()
        .find_map(|p| p.bytes_base64_encoded)
        .ok_or_else(|| StudioError::Backend("no image returned".into()))
}

/// Адрес готового видео, если операция завершена
pub(crate) fn video_uri(operation: &Operation) -> Result<Option<String>> {
    if let Some(err) = &operation.error {
        return Err(StudioError::Backend(format!("video generation failed: {}", err.message)));
    }
    if !operation.done {
        return Ok(None);
    }
    operation
        .response
        .as_ref()
        .and_then(|r| r.generate_video_response.as_ref())
        .and_then(|r| r.generated_samples.iter().find_map(|s| s.video.as_ref()))
        .map(|v| Some(v.uri.clone()))
        .ok_or_else(|| StudioError::Backend("video generation finished without a video".into()))
}

/// JSON из текстового ответа, возможно обёрнутый в блок кода
pub(crate) fn parse_json_text<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim())
        .map_err(|e| StudioError::Backend(format!("malformed structured response: {}", e)))
}

fn speech_config(voices: &VoiceSelection) -> Value {
    match voices {
        VoiceSelection::Single(voice) => json!({
            "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
        }),
        VoiceSelection::Multi(speakers) => json!({
            "multiSpeakerVoiceConfig": {
                "speakerVoiceConfigs": speakers
                    .iter()
                    .map(|(speaker, voice)| json!({
                        "speaker": speaker,
                        "voiceConfig": { "prebuiltVoiceConfig": { "voiceName": voice } }
                    }))
                    .collect::<Vec<_>>()
            }
        }),
    }
}

/// Клиент для работы с Gemini API
pub struct GeminiBackend {
    client: Client,
    config: StudioConfig,
}

impl GeminiBackend {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.api_base_url, model, method)
    }

    fn ensure_key(&self) -> Result<()> {
        if self.config.has_credentials() {
            Ok(())
        } else {
            Err(StudioError::Backend("API key is not configured".into()))
        }
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        self.ensure_key()?;
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn get(&self, url: &str) -> Result<Value> {
        self.ensure_key()?;
        let response = self
            .client
            .get(url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error: HTTP {}, body: {}", status, body);
            return Err(StudioError::Backend(format!("HTTP {}: {}", status, body)));
        }
        Ok(response.json().await?)
    }

    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let raw = self.post(&self.model_url(&self.config.text_model, "generateContent"), &body).await?;
        extract_text(&raw)
    }

    async fn generate_json<T: DeserializeOwned>(&self, parts: Value) -> Result<T> {
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": { "responseMimeType": "application/json" }
        });
        let raw = self.post(&self.model_url(&self.config.text_model, "generateContent"), &body).await?;
        parse_json_text(&extract_text(&raw)?)
    }

    async fn download(&self, uri: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(uri)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(StudioError::Backend(format!(
                "video download failed: HTTP {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn synthesize_speech(&self, text: &str, speaker: &SpeakerSpec, style: SpeakingStyle) -> Result<String> {
        let request = SpeechRequest::build(text, speaker, style);
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": speech_config(&request.voices)
            }
        });
        info!("Synthesizing speech ({} chars, {:?})", text.len(), style);
        let raw = self.post(&self.model_url(&self.config.speech_model, "generateContent"), &body).await?;
        extract_audio(&raw)
    }

    async fn transcribe(&self, media_base64: &str, mime: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [
                { "inlineData": { "mimeType": mime, "data": media_base64 } },
                { "text": prompt::TRANSCRIBE_PROMPT }
            ] }]
        });
        let raw = self.post(&self.model_url(&self.config.text_model, "generateContent"), &body).await?;
        extract_text(&raw)
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        self.generate_text(&prompt::translation_prompt(text, target_language)).await
    }

    async fn improve_script(&self, text: &str, style: &str) -> Result<String> {
        self.generate_text(&prompt::improve_script_prompt(text, style)).await
    }

    async fn optimize_for_speech(&self, text: &str) -> Result<String> {
        self.generate_text(&prompt::optimize_prompt(text)).await
    }

    async fn generate_dialogue_script(
        &self,
        text: &str,
        kind: ScriptKind,
        pair: &PodcastPair,
        language: ScriptLanguage,
    ) -> Result<String> {
        self.generate_text(&prompt::dialogue_script_prompt(text, kind, &pair.first, &pair.second, language))
            .await
    }

    async fn analyze_voice_sample(&self, media_base64: &str, mime: &str) -> Result<VoiceAnalysis> {
        self.generate_json(json!([
            { "inlineData": { "mimeType": mime, "data": media_base64 } },
            { "text": prompt::ANALYZE_VOICE_PROMPT }
        ]))
        .await
    }

    async fn synthesize_image(&self, prompt: &str, aspect: AspectRatio) -> Result<String> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "sampleCount": 1, "aspectRatio": aspect.as_str() }
        });
        let raw = self.post(&self.model_url(&self.config.image_model, "predict"), &body).await?;
        extract_image(&raw)
    }

    async fn generate_visual_prompt(&self, script: &str) -> Result<String> {
        self.generate_text(&prompt::visual_prompt_request(script)).await
    }

    async fn synthesize_video(&self, prompt: &str) -> Result<Bytes> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": { "aspectRatio": AspectRatio::Landscape.as_str() }
        });
        let raw = self
            .post(&self.model_url(&self.config.video_model, "predictLongRunning"), &body)
            .await?;
        let mut operation: Operation = serde_json::from_value(raw)?;
        info!("Video generation started: {}", operation.name);

        let interval = Duration::from_secs(self.config.video_poll_interval_secs);
        let uri = loop {
            if let Some(uri) = video_uri(&operation)? {
                break uri;
            }
            tokio::time::sleep(interval).await;
            let url = format!("{}/{}", self.config.api_base_url, operation.name);
            operation = serde_json::from_value(self.get(&url).await?)?;
            debug!("Video operation {} done: {}", operation.name, operation.done);
        };

        let video = self.download(&uri).await?;
        info!("Downloaded generated video ({} bytes)", video.len());
        Ok(video)
    }

    async fn generate_title(&self, text: &str) -> Result<String> {
        let title = self.generate_text(&prompt::title_prompt(text)).await?;
        Ok(title.trim_matches(|c| c == '"' || c == '*').trim().to_string())
    }

    async fn generate_seo_metadata(&self, text: &str) -> Result<SeoMetadata> {
        self.generate_json(json!([{ "text": prompt::seo_prompt(text) }])).await
    }
}
