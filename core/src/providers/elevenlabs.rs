use crate::config::VoiceConfig;
use crate::error::ServiceError;
use crate::providers::openai::http_client;
use crate::traits::{AudioStream, Speech};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

const SERVICE: &str = "speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
    style: f64,
    use_speaker_boost: bool,
}

/// ElevenLabs text-to-speech over the streaming endpoint.
pub struct ElevenLabsVoice {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    config: VoiceConfig,
}

impl ElevenLabsVoice {
    pub fn new(api_key: impl Into<String>, config: VoiceConfig) -> Self {
        Self {
            client: http_client(Duration::from_secs(120)),
            api_key: api_key.into(),
            base_url: "https://api.elevenlabs.io".to_string(),
            config,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.config.voice_id = voice_id.into();
        self
    }
}

#[async_trait]
impl Speech for ElevenLabsVoice {
    async fn synthesize_stream(&self, text: &str) -> anyhow::Result<AudioStream> {
        let request = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: VoiceSettings {
                stability: self.config.stability,
                similarity_boost: self.config.similarity_boost,
                style: self.config.style,
                use_speaker_boost: self.config.use_speaker_boost,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/text-to-speech/{}/stream",
                self.base_url, self.config.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status, error_text).into());
        }

        let chunk_size = self.config.chunk_size.max(1);
        let (tx, rx) = tokio::sync::mpsc::channel::<anyhow::Result<Vec<u8>>>(64);

        tokio::spawn(async move {
            use futures_util::StreamExt as _;
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::with_capacity(chunk_size * 2);

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        buffer.extend_from_slice(&chunk);
                        while buffer.len() >= chunk_size {
                            let rest = buffer.split_off(chunk_size);
                            let full = std::mem::replace(&mut buffer, rest);
                            if tx.send(Ok(full)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx
                            .send(Err(ServiceError::from_reqwest(SERVICE, e).into()))
                            .await;
                        return;
                    }
                }
            }

            if !buffer.is_empty() {
                let _ = tx.send(Ok(buffer)).await;
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}
