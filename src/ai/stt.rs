use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::poll::{PollError, PollPolicy, PollStatus};
use crate::config::AppConfig;

const ASSEMBLYAI_URL: &str = "https://api.assemblyai.com/v2";

#[derive(Debug, thiserror::Error)]
pub enum SttError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("transcription failed: {0}")]
    Provider(String),
    #[error("transcription timed out after {attempts} status checks")]
    TimedOut { attempts: u32 },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<PollError> for SttError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::Failed(reason) => Self::Provider(reason),
            PollError::TimedOut { attempts } => Self::TimedOut { attempts },
            PollError::Check(e) => Self::Provider(e.to_string()),
        }
    }
}

/// Speech-to-text provider.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, SttError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptJob {
    id: String,
    status: String,
    text: Option<String>,
    error: Option<String>,
}

/// AssemblyAI: upload, submit a transcript job, then poll it.
pub struct AssemblyAiClient {
    client: Client,
    api_key: String,
    poll: PollPolicy,
}

impl AssemblyAiClient {
    pub fn new(api_key: &str, poll: PollPolicy, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            poll,
        })
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::new(
            &config.assemblyai_api_key,
            PollPolicy::new(config.stt_poll_attempts, config.stt_poll_interval),
            config.stt_timeout,
        )
    }

    async fn upload(&self, audio: Vec<u8>) -> Result<String, SttError> {
        let resp = self
            .client
            .post(format!("{}/upload", ASSEMBLYAI_URL))
            .header("authorization", &self.api_key)
            .body(audio)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SttError::Upload(format!("{}: {}", status, body)));
        }

        let upload: UploadResponse = resp.json().await?;
        Ok(upload.upload_url)
    }

    async fn submit(&self, audio_url: &str) -> Result<TranscriptJob, SttError> {
        let resp = self
            .client
            .post(format!("{}/transcript", ASSEMBLYAI_URL))
            .header("authorization", &self.api_key)
            .json(&serde_json::json!({
                "audio_url": audio_url,
                "language_detection": true,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SttError::Provider(format!("{}: {}", status, body)));
        }

        Ok(resp.json().await?)
    }

    async fn status(&self, job_id: &str) -> anyhow::Result<PollStatus<String>> {
        let job: TranscriptJob = self
            .client
            .get(format!("{}/transcript/{}", ASSEMBLYAI_URL, job_id))
            .header("authorization", &self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(job_status(job))
    }
}

fn job_status(job: TranscriptJob) -> PollStatus<String> {
    match job.status.as_str() {
        "completed" => PollStatus::Done(job.text.unwrap_or_default().trim().to_string()),
        "error" => PollStatus::Failed(job.error.unwrap_or_else(|| "unknown error".to_string())),
        _ => PollStatus::Pending,
    }
}

#[async_trait]
impl Transcriber for AssemblyAiClient {
    async fn transcribe(&self, audio: Vec<u8>) -> Result<String, SttError> {
        let audio_url = self.upload(audio).await?;
        let job = self.submit(&audio_url).await?;
        tracing::info!("Transcript job {} submitted", job.id);

        let job_id = job.id.clone();
        match job_status(job) {
            PollStatus::Done(text) => return Ok(text),
            PollStatus::Failed(reason) => return Err(SttError::Provider(reason)),
            PollStatus::Pending => {}
        }

        let text = self.poll.run(|| self.status(&job_id)).await?;
        Ok(text)
    }
}
