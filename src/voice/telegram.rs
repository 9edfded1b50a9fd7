use std::path::Path;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, Voice};
use tokio::io::AsyncWriteExt;

use super::VoiceTransport;

/// A voice message in one Telegram chat.
pub struct TelegramVoice {
    bot: Bot,
    chat_id: ChatId,
    voice: Voice,
}

impl TelegramVoice {
    pub fn new(bot: Bot, chat_id: ChatId, voice: Voice) -> Self {
        Self { bot, chat_id, voice }
    }
}

#[async_trait]
impl VoiceTransport for TelegramVoice {
    async fn fetch(&self, dest: &Path) -> anyhow::Result<()> {
        let file = self.bot.get_file(&self.voice.file.id).await?;
        let mut dst = tokio::fs::File::create(dest).await?;
        self.bot.download_file(&file.path, &mut dst).await?;
        dst.flush().await?;
        Ok(())
    }

    async fn deliver(&self, audio: &Path) -> anyhow::Result<()> {
        self.bot
            .send_voice(self.chat_id, InputFile::file(audio))
            .await?;
        Ok(())
    }
}
