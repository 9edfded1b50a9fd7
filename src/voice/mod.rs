pub mod telegram;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::{Builder, NamedTempFile};

use crate::ai::stt::{SttError, Transcriber};
use crate::ai::tts::{Synthesizer, TtsError};
use crate::chat::ChatPipeline;
use crate::config::AppConfig;
use crate::lang::Language;

/// Where the voice attachment comes from and where the spoken reply goes.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Download the attachment into `dest`.
    async fn fetch(&self, dest: &Path) -> anyhow::Result<()>;
    /// Send the audio file at `audio` back as a voice message.
    async fn deliver(&self, audio: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStage {
    Downloaded,
    Transcribed,
    Responded,
    Synthesized,
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceErrorKind {
    Download,
    Stt,
    Response,
    Tts,
    Delivery,
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("download failed: {0}")]
    Download(anyhow::Error),
    #[error("downloaded audio is only {bytes} bytes")]
    AudioTooSmall { bytes: u64 },
    #[error(transparent)]
    Transcription(#[from] SttError),
    #[error("transcript was empty")]
    EmptyTranscript,
    /// Generation failed; carries the user-facing message.
    #[error("response failed: {0}")]
    Response(String),
    #[error(transparent)]
    Synthesis(#[from] TtsError),
    #[error("delivery failed: {0}")]
    Delivery(anyhow::Error),
}

impl VoiceError {
    pub fn kind(&self) -> VoiceErrorKind {
        match self {
            Self::Download(_) => VoiceErrorKind::Download,
            Self::AudioTooSmall { .. } | Self::Transcription(_) | Self::EmptyTranscript => {
                VoiceErrorKind::Stt
            }
            Self::Response(_) => VoiceErrorKind::Response,
            Self::Synthesis(_) => VoiceErrorKind::Tts,
            Self::Delivery(_) => VoiceErrorKind::Delivery,
        }
    }

    pub fn user_message(&self, lang: Language) -> String {
        if let Self::Response(message) = self {
            return message.clone();
        }
        let text = match (self.kind(), lang) {
            (VoiceErrorKind::Download, Language::Turkish) => "❌ Ses dosyası indirilemedi.",
            (VoiceErrorKind::Download, Language::English) => "❌ Could not download the voice message.",
            (VoiceErrorKind::Download, Language::German) => "❌ Die Sprachnachricht konnte nicht geladen werden.",
            (VoiceErrorKind::Stt, Language::Turkish) => "🤔 Sesli mesajını anlayamadım, tekrar dener misin?",
            (VoiceErrorKind::Stt, Language::English) => "🤔 I couldn't understand that voice message, could you try again?",
            (VoiceErrorKind::Stt, Language::German) => "🤔 Ich konnte die Sprachnachricht nicht verstehen, versuchst du es nochmal?",
            (VoiceErrorKind::Tts, Language::Turkish) => "❌ Sesli yanıt oluşturulamadı.",
            (VoiceErrorKind::Tts, Language::English) => "❌ Could not create the voice reply.",
            (VoiceErrorKind::Tts, Language::German) => "❌ Die Sprachantwort konnte nicht erstellt werden.",
            (_, Language::Turkish) => "❌ Sesli yanıt gönderilemedi.",
            (_, Language::English) => "❌ Could not send the voice reply.",
            (_, Language::German) => "❌ Die Sprachantwort konnte nicht gesendet werden.",
        };
        text.to_string()
    }
}

/// Result of a completed voice exchange.
#[derive(Debug, Clone)]
pub struct VoiceOutcome {
    pub transcript: String,
    pub reply: String,
    pub language: Language,
}

/// Voice message → transcript → reply → speech → voice message.
/// Scratch files live only for the duration of [`run`](Self::run).
pub struct VoiceBridge {
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
    scratch_dir: PathBuf,
    min_audio_bytes: u64,
}

impl VoiceBridge {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        scratch_dir: PathBuf,
        min_audio_bytes: u64,
    ) -> Self {
        Self {
            transcriber,
            synthesizer,
            scratch_dir,
            min_audio_bytes,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self::new(
            transcriber,
            synthesizer,
            config.scratch_dir.clone(),
            config.min_voice_bytes,
        )
    }

    fn scratch(&self, prefix: &str, extension: &str) -> Result<NamedTempFile, std::io::Error> {
        Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.scratch_dir)
    }

    pub async fn run(
        &self,
        pipeline: &ChatPipeline,
        transport: &dyn VoiceTransport,
        user_id: i64,
    ) -> Result<VoiceOutcome, VoiceError> {
        let input = self
            .scratch("ziya-in-", "ogg")
            .map_err(|e| VoiceError::Download(e.into()))?;
        transport
            .fetch(input.path())
            .await
            .map_err(VoiceError::Download)?;

        let bytes = tokio::fs::read(input.path())
            .await
            .map_err(|e| VoiceError::Download(e.into()))?;
        let size = bytes.len() as u64;
        if size < self.min_audio_bytes {
            tracing::warn!("Voice from user {} is only {} bytes, rejecting", user_id, size);
            return Err(VoiceError::AudioTooSmall { bytes: size });
        }
        self.stage(user_id, VoiceStage::Downloaded);

        let transcript = self.transcriber.transcribe(bytes).await?;
        if transcript.trim().is_empty() {
            return Err(VoiceError::EmptyTranscript);
        }
        tracing::info!("Transcribed voice from user {}: {}", user_id, transcript);
        self.stage(user_id, VoiceStage::Transcribed);

        let reply = pipeline.respond(user_id, &transcript).await;
        if !reply.generated {
            return Err(VoiceError::Response(reply.text));
        }
        self.stage(user_id, VoiceStage::Responded);

        let audio = self.synthesizer.synthesize(&reply.text).await?;
        let output = self
            .scratch("ziya-out-", self.synthesizer.extension())
            .map_err(|e| VoiceError::Delivery(e.into()))?;
        tokio::fs::write(output.path(), &audio)
            .await
            .map_err(|e| VoiceError::Delivery(e.into()))?;
        self.stage(user_id, VoiceStage::Synthesized);

        transport
            .deliver(output.path())
            .await
            .map_err(VoiceError::Delivery)?;
        self.stage(user_id, VoiceStage::Delivered);

        Ok(VoiceOutcome {
            transcript,
            reply: reply.text,
            language: reply.language,
        })
    }

    fn stage(&self, user_id: i64, stage: VoiceStage) {
        tracing::debug!("Voice pipeline for user {}: {:?}", user_id, stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::tests::{pipeline, Recorder};
    use std::sync::Mutex;

    struct FakeTransport {
        payload: Vec<u8>,
        delivered: Mutex<Vec<Vec<u8>>>,
        seen_paths: Mutex<Vec<PathBuf>>,
    }

    impl FakeTransport {
        fn new(payload: Vec<u8>) -> Self {
            Self {
                payload,
                delivered: Mutex::new(Vec::new()),
                seen_paths: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VoiceTransport for FakeTransport {
        async fn fetch(&self, dest: &Path) -> anyhow::Result<()> {
            self.seen_paths.lock().unwrap().push(dest.to_path_buf());
            tokio::fs::write(dest, &self.payload).await?;
            Ok(())
        }

        async fn deliver(&self, audio: &Path) -> anyhow::Result<()> {
            self.seen_paths.lock().unwrap().push(audio.to_path_buf());
            let bytes = tokio::fs::read(audio).await?;
            self.delivered.lock().unwrap().push(bytes);
            Ok(())
        }
    }

    struct FixedTranscript(Result<&'static str, ()>);

    #[async_trait]
    impl Transcriber for FixedTranscript {
        async fn transcribe(&self, _audio: Vec<u8>) -> Result<String, SttError> {
            self.0
                .map(String::from)
                .map_err(|_| SttError::TimedOut { attempts: 30 })
        }
    }

    struct FakeSpeech {
        fail: bool,
    }

    #[async_trait]
    impl Synthesizer for FakeSpeech {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
            if self.fail {
                Err(TtsError::EmptyAudio)
            } else {
                Ok(format!("AUDIO:{text}").into_bytes())
            }
        }
    }

    fn bridge(dir: &Path, transcript: Result<&'static str, ()>, tts_fails: bool) -> VoiceBridge {
        VoiceBridge::new(
            Arc::new(FixedTranscript(transcript)),
            Arc::new(FakeSpeech { fail: tts_fails }),
            dir.to_path_buf(),
            1024,
        )
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn tiny_download_is_an_stt_error_and_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Language::English, Arc::new(Recorder::default())).await;
        let transport = FakeTransport::new(vec![0u8; 100]);

        let err = bridge(dir.path(), Ok("hello"), false)
            .run(&pipeline, &transport, 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VoiceErrorKind::Stt);
        assert!(matches!(err, VoiceError::AudioTooSmall { bytes: 100 }));
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn full_exchange_delivers_speech_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::German, recorder.clone()).await;
        let transport = FakeTransport::new(vec![1u8; 4096]);

        let outcome = bridge(dir.path(), Ok("merhaba naber"), false)
            .run(&pipeline, &transport, 42)
            .await
            .unwrap();

        assert_eq!(outcome.language, Language::Turkish);
        assert_eq!(outcome.reply, "reply #1");
        assert_eq!(
            transport.delivered.lock().unwrap().as_slice(),
            &[b"AUDIO:reply #1".to_vec()]
        );
        assert_eq!(pipeline.db.recent(42, 5).await.unwrap().len(), 1);
        for path in transport.seen_paths.lock().unwrap().iter() {
            assert!(!path.exists());
        }
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn transcription_failure_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Language::English, Arc::new(Recorder::default())).await;
        let transport = FakeTransport::new(vec![1u8; 2048]);

        let err = bridge(dir.path(), Err(()), false)
            .run(&pipeline, &transport, 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VoiceErrorKind::Stt);
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn empty_transcript_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::English, recorder.clone()).await;
        let transport = FakeTransport::new(vec![1u8; 2048]);

        let err = bridge(dir.path(), Ok("   "), false)
            .run(&pipeline, &transport, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, VoiceError::EmptyTranscript));
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn synthesis_failure_is_tts_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(Language::English, Arc::new(Recorder::default())).await;
        let transport = FakeTransport::new(vec![1u8; 2048]);

        let err = bridge(dir.path(), Ok("how are you today"), true)
            .run(&pipeline, &transport, 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VoiceErrorKind::Tts);
        assert!(err.user_message(Language::English).contains("voice reply"));
        assert!(transport.delivered.lock().unwrap().is_empty());
        assert!(scratch_is_empty(dir.path()));
    }

    #[tokio::test]
    async fn generation_failure_surfaces_its_message() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline(Language::English, recorder).await;
        let transport = FakeTransport::new(vec![1u8; 2048]);

        let err = bridge(dir.path(), Ok("how are you today"), false)
            .run(&pipeline, &transport, 1)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), VoiceErrorKind::Response);
        assert!(err.user_message(Language::English).contains("Timeout"));
        assert!(scratch_is_empty(dir.path()));
    }
}
