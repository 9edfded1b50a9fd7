use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ChatAction;

use crate::bot::commands::user_language;
use crate::bot::{AppState, HandlerError};
use crate::voice::telegram::TelegramVoice;

/// Plain text: detect, answer, log.
pub async fn handle_text(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> Result<(), HandlerError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);

    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await?;

    let reply = state.chat.respond(user_id, text).await;
    tracing::info!(
        "User {} [{}]: {} -> {}",
        user_id,
        reply.language,
        text,
        reply.text
    );

    bot.send_message(msg.chat.id, reply.text).await?;
    Ok(())
}

/// Voice: transcribe, answer, speak the answer back.
pub async fn handle_voice(
    bot: Bot,
    msg: Message,
    state: Arc<AppState>,
) -> Result<(), HandlerError> {
    let Some(voice) = msg.voice() else {
        return Ok(());
    };
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);

    bot.send_chat_action(msg.chat.id, ChatAction::RecordVoice)
        .await?;

    let transport = TelegramVoice::new(bot.clone(), msg.chat.id, voice.clone());
    match state.voice.run(&state.chat, &transport, user_id).await {
        Ok(outcome) => {
            tracing::info!(
                "Voice exchange for user {} [{}]: {} -> {}",
                user_id,
                outcome.language,
                outcome.transcript,
                outcome.reply
            );
        }
        Err(e) => {
            tracing::error!("Voice pipeline failed for user {}: {}", user_id, e);
            bot.send_message(msg.chat.id, e.user_message(user_language(&msg)))
                .await?;
        }
    }

    Ok(())
}
