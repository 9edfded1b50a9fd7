use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::lang::detector::ShortTextPrecedence;

/// How the bot receives updates from Telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployMode {
    Polling,
    /// Public base URL; Telegram posts updates to `{base}/webhook`.
    Webhook { base_url: String, port: u16 },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub assemblyai_api_key: String,
    pub elevenlabs_api_key: String,
    pub elevenlabs_voice_id: String,
    pub elevenlabs_model_id: String,
    pub database_url: String,
    pub mode: DeployMode,

    /// Number of past exchanges fed back to the model
    pub history_limit: i64,

    /// Which trigger word wins in short mixed-language messages
    pub short_text_precedence: ShortTextPrecedence,

    pub llm_timeout: Duration,
    /// Retries after an HTTP 429, on top of the first attempt
    pub llm_max_retries: u32,

    pub stt_poll_attempts: u32,
    pub stt_poll_interval: Duration,
    /// Per-request timeout for AssemblyAI calls
    pub stt_timeout: Duration,
    pub tts_timeout: Duration,

    /// Downloads smaller than this are treated as corrupt
    pub min_voice_bytes: u64,
    pub scratch_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Missing required environment variable {}", key))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let mode = match lookup("WEBHOOK_URL").or_else(|| lookup("RAILWAY_STATIC_URL")) {
            Some(url) if !url.trim().is_empty() => DeployMode::Webhook {
                base_url: with_scheme(url.trim().trim_end_matches('/')),
                port,
            },
            _ => DeployMode::Polling,
        };

        Ok(Self {
            telegram_bot_token: required("TELEGRAM_BOT_TOKEN")?,
            openrouter_api_key: required("OPENROUTER_API_KEY")?,
            openrouter_model: or_default("OPENROUTER_MODEL", "qwen/qwen3-235b-a22b-2507"),
            assemblyai_api_key: required("ASSEMBLYAI_API_KEY")?,
            elevenlabs_api_key: required("ELEVENLABS_API_KEY")?,
            elevenlabs_voice_id: or_default("ELEVENLABS_VOICE_ID", "21m00Tcm4TlvDq8N1MKh"),
            elevenlabs_model_id: or_default("ELEVENLABS_MODEL_ID", "eleven_multilingual_v2"),
            database_url: or_default("DATABASE_URL", "sqlite://ziya.db"),
            mode,
            history_limit: parse_or(&lookup, "HISTORY_LIMIT", 5)?,
            short_text_precedence: parse_or(
                &lookup,
                "SHORT_TEXT_PRECEDENCE",
                ShortTextPrecedence::LastMatch,
            )?,
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 60)?),
            llm_max_retries: parse_or(&lookup, "LLM_MAX_RETRIES", 3)?,
            stt_poll_attempts: parse_or(&lookup, "STT_POLL_ATTEMPTS", 30)?,
            stt_poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "STT_POLL_INTERVAL_MS",
                1000,
            )?),
            stt_timeout: Duration::from_secs(parse_or(&lookup, "STT_TIMEOUT_SECS", 60)?),
            tts_timeout: Duration::from_secs(parse_or(&lookup, "TTS_TIMEOUT_SECS", 60)?),
            min_voice_bytes: parse_or(&lookup, "MIN_VOICE_BYTES", 1024)?,
            scratch_dir: lookup("SCRATCH_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
        })
    }
}

/// Railway exposes a bare domain; Telegram needs an absolute https URL.
fn with_scheme(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, raw, e)),
        None => Ok(default),
    }
}
