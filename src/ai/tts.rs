use async_trait::async_trait;
use reqwest::Client;

use crate::config::AppConfig;

const ELEVENLABS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    #[error("synthesis failed ({status}): {body}")]
    Provider { status: u16, body: String },
    #[error("provider returned empty audio")]
    EmptyAudio,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Text-to-speech provider.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text`, returning encoded audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;

    /// File extension of the audio this synthesizer produces.
    fn extension(&self) -> &'static str {
        "mp3"
    }
}

pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.tts_timeout).build()?;
        Ok(Self {
            client,
            api_key: config.elevenlabs_api_key.clone(),
            voice_id: config.elevenlabs_voice_id.clone(),
            model_id: config.elevenlabs_model_id.clone(),
        })
    }
}

#[async_trait]
impl Synthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let resp = self
            .client
            .post(format!(
                "{}/{}?output_format=mp3_44100_128",
                ELEVENLABS_URL, self.voice_id
            ))
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": self.model_id,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TtsError::Provider { status, body });
        }

        let audio = resp.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(TtsError::EmptyAudio);
        }
        Ok(audio)
    }
}
