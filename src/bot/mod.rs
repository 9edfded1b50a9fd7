pub mod commands;
pub mod handlers;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::chat::ChatPipeline;
use crate::config::AppConfig;
use crate::voice::VoiceBridge;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state, accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub chat: ChatPipeline,
    pub voice: VoiceBridge,
}

/// Plain chat text. Unknown `/commands` fall through the command branch and
/// must not reach the model.
pub fn is_chat_text(text: &str) -> bool {
    !text.trim_start().starts_with('/')
}

/// Build the teloxide update handler tree.
pub fn build_handler() -> UpdateHandler<HandlerError> {
    let command_handler = Update::filter_message()
        .filter_command::<commands::BotCommand>()
        .endpoint(commands::handle_command);

    let voice_handler = Update::filter_message()
        .filter(|msg: Message| msg.voice().is_some())
        .endpoint(handlers::handle_voice);

    let text_handler = Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(is_chat_text))
        .endpoint(handlers::handle_text);

    dptree::entry()
        .branch(command_handler)
        .branch(voice_handler)
        .branch(text_handler)
}
