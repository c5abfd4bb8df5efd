use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

pub type AudioStream = BoxStream<'static, anyhow::Result<Vec<u8>>>;

/// Text-to-speech synthesis.
#[async_trait]
pub trait Speech: Send + Sync {
    /// Audio chunks in arrival order, suitable for progressive playback.
    async fn synthesize_stream(&self, text: &str) -> anyhow::Result<AudioStream>;

    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let mut stream = self.synthesize_stream(text).await?;
        let mut audio = Vec::new();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }
        Ok(audio)
    }
}
