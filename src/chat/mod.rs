pub mod moderation;

use crate::ai::llm::ResponseGenerator;
use crate::db::Database;
use crate::lang::detector::LanguageDetector;
use crate::lang::Language;
use moderation::ProfanityFilter;

/// Answer to one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub language: Language,
    /// False when `text` is a warning or error message rather than a model reply
    pub generated: bool,
}

/// Text path shared by typed and transcribed messages:
/// detect language, load history, generate, record.
pub struct ChatPipeline {
    pub detector: LanguageDetector,
    pub generator: ResponseGenerator,
    pub db: Database,
    pub filter: ProfanityFilter,
    pub history_limit: i64,
}

impl ChatPipeline {
    pub async fn respond(&self, user_id: i64, text: &str) -> Reply {
        let detection = self.detector.detect(text);
        let language = detection.language;

        if self.filter.is_profane(text) {
            tracing::info!("Blocked profane message from user {}", user_id);
            return Reply {
                text: self.filter.warning(language).to_string(),
                language,
                generated: false,
            };
        }

        let history = self.db.history(user_id, self.history_limit).await;
        let history = (!history.is_empty()).then_some(history.as_str());

        match self.generator.generate(text, language, history).await {
            Ok(response) => {
                tracing::info!(
                    "User {} [{}] normalized={:?} -> {} chars",
                    user_id,
                    language,
                    detection.normalized,
                    response.len()
                );
                self.db.record(user_id, text, &response, language).await;
                Reply {
                    text: response,
                    language,
                    generated: true,
                }
            }
            Err(e) => {
                tracing::error!("Response generation failed for user {}: {}", user_id, e);
                Reply {
                    text: e.user_message(language),
                    language,
                    generated: false,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::llm::{ChatBackend, ChatError, ChatMessage};
    use crate::ai::poll::RetryPolicy;
    use crate::lang::detector::{DetectionError, LanguageSpan, SpanDetector};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Attributes every message entirely to one language.
    pub struct Attribute(pub Language);

    impl SpanDetector for Attribute {
        fn spans(&self, text: &str) -> Result<Vec<LanguageSpan>, DetectionError> {
            Ok(vec![LanguageSpan {
                language: self.0,
                len: text.chars().count(),
            }])
        }
    }

    /// Echoes a fixed reply, or fails with a server error, recording requests.
    #[derive(Default)]
    pub struct Recorder {
        pub fail: bool,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatBackend for Arc<Recorder> {
        async fn complete(&self, _model: &str, messages: &[ChatMessage]) -> Result<String, ChatError> {
            self.requests.lock().unwrap().push(messages.to_vec());
            if self.fail {
                Err(ChatError::Timeout)
            } else {
                Ok(format!("reply #{}", self.requests.lock().unwrap().len()))
            }
        }
    }

    pub async fn pipeline(backend_lang: Language, recorder: Arc<Recorder>) -> ChatPipeline {
        let db = Database::in_memory().await.unwrap();
        db.run_migrations().await.unwrap();
        ChatPipeline {
            detector: LanguageDetector::new(Box::new(Attribute(backend_lang))),
            generator: ResponseGenerator::new(
                Box::new(recorder),
                "test/model",
                RetryPolicy::new(0, Duration::ZERO),
            ),
            db,
            filter: ProfanityFilter,
            history_limit: 5,
        }
    }

    fn system_prompt_of(recorder: &Recorder, index: usize) -> String {
        recorder.requests.lock().unwrap()[index][0].content.clone()
    }

    #[tokio::test]
    async fn turkish_greeting_reaches_generator_as_turkish() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::German, recorder.clone()).await;

        let reply = pipeline.respond(1, "merhaba naber").await;
        assert_eq!(reply.language, Language::Turkish);
        assert!(reply.generated);
        assert!(system_prompt_of(&recorder, 0).contains("Reply language: Turkish"));
    }

    #[tokio::test]
    async fn english_question_is_answered_in_english() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::English, recorder.clone()).await;

        let reply = pipeline.respond(1, "how are you today").await;
        assert_eq!(reply.language, Language::English);
        assert!(system_prompt_of(&recorder, 0).contains("Reply language: English"));
    }

    #[tokio::test]
    async fn successful_exchanges_feed_later_prompts() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::English, recorder.clone()).await;

        pipeline.respond(9, "tell me about hobbies please").await;
        pipeline.respond(9, "and what about music then").await;

        let second = system_prompt_of(&recorder, 1);
        assert!(second.contains("User: tell me about hobbies please\nZiya: reply #1"));
        assert_eq!(pipeline.db.recent(9, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn profanity_skips_model_and_log() {
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(Language::English, recorder.clone()).await;

        let reply = pipeline.respond(1, "shit, what a day you know").await;
        assert!(!reply.generated);
        assert!(recorder.requests.lock().unwrap().is_empty());
        assert!(pipeline.db.recent(1, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_generation_is_not_recorded() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline(Language::English, recorder).await;

        let reply = pipeline.respond(1, "tell me something nice").await;
        assert!(!reply.generated);
        assert!(reply.text.starts_with("❌"));
        assert!(pipeline.db.recent(1, 5).await.unwrap().is_empty());
    }
}
