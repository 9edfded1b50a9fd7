use std::sync::Arc;
use teloxide::macros::BotCommands;
use teloxide::utils::command::BotCommands as _;
use teloxide::prelude::*;

use crate::bot::{AppState, HandlerError};
use crate::db::models::ConversationRecord;
use crate::lang::Language;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum BotCommand {
    #[command(description = "Start / restart the bot")]
    Start,
    #[command(description = "Show your recent conversation")]
    History,
    #[command(description = "Show help")]
    Help,
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: BotCommand,
    state: Arc<AppState>,
) -> Result<(), HandlerError> {
    let user_id = msg.from.as_ref().map(|u| u.id.0 as i64).unwrap_or(0);
    let lang = user_language(&msg);

    match cmd {
        BotCommand::Start => {
            bot.send_message(msg.chat.id, greeting(lang)).await?;
        }

        BotCommand::History => {
            let records = state
                .chat
                .db
                .recent(user_id, state.config.history_limit)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("History lookup failed for user {}: {}", user_id, e);
                    Vec::new()
                });
            bot.send_message(msg.chat.id, history_recap(&records, lang))
                .await?;
        }

        BotCommand::Help => {
            bot.send_message(msg.chat.id, BotCommand::descriptions().to_string())
                .await?;
        }
    }

    Ok(())
}

/// Telegram client language, if it is one we answer in.
pub fn user_language(msg: &Message) -> Language {
    msg.from
        .as_ref()
        .and_then(|u| u.language_code.as_deref())
        .and_then(|code| Language::from_code(code.split('-').next().unwrap_or(code)))
        .unwrap_or_default()
}

fn greeting(lang: Language) -> &'static str {
    match lang {
        Language::Turkish => {
            "Merhaba! Ben Ziya, dijital ikizin. Yaz veya sesle konuş, sana bilimsel, \
             psikolojik ve arkadaşça yanıt vereyim! 😊 \
             Türkçe, İngilizce veya Almanca konuşabiliriz. 🌍"
        }
        Language::English => {
            "Hello! I'm Ziya, your digital twin. Write or talk to me and I'll answer \
             with science, psychology and a friendly tone! 😊 \
             We can speak Turkish, English or German. 🌍"
        }
        Language::German => {
            "Hallo! Ich bin Ziya, dein digitaler Zwilling. Schreib oder sprich mit mir, \
             ich antworte wissenschaftlich, psychologisch und freundlich! 😊 \
             Wir können Türkisch, Englisch oder Deutsch sprechen. 🌍"
        }
    }
}

fn history_recap(records: &[ConversationRecord], lang: Language) -> String {
    if records.is_empty() {
        return match lang {
            Language::Turkish => "Henüz bir sohbetimiz yok. Bir mesaj gönder!",
            Language::English => "No conversation yet. Send me a message!",
            Language::German => "Noch kein Gespräch. Schick mir eine Nachricht!",
        }
        .to_string();
    }

    let mut recap = String::from("📜\n\n");
    for record in records {
        let question: String = record.message.chars().take(100).collect();
        let answer: String = record.response.chars().take(100).collect();
        recap.push_str(&format!(
            "👤 {}\n🤖 {}\n🕒 {} [{}]\n\n",
            question,
            answer,
            record.created_at.format("%b %d, %H:%M"),
            record.language
        ));
    }
    recap.trim_end().to_string()
}
