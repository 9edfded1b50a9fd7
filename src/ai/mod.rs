pub mod llm;
pub mod poll;
pub mod stt;
pub mod tts;
