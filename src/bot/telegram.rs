//! Telegram API client using teloxide.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ReplyParameters};
use tracing::warn;

/// Thin wrapper over the teloxide `Bot` with the handful of calls the
/// engine makes. Errors come back as strings; callers decide whether a
/// failed send is worth more than a log line.
pub struct TelegramClient {
    bot: Bot,
}

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send a text message, optionally threaded. Returns the sent
    /// message's id so replies can be logged under it.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Send a message carrying a single inline button.
    pub async fn send_with_button(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
        button_label: &str,
        callback_data: &str,
    ) -> Result<i64, String> {
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            button_label.to_string(),
            callback_data.to_string(),
        )]]);

        let mut request = self
            .bot
            .send_message(ChatId(chat_id), text)
            .reply_markup(keyboard);

        if let Some(msg_id) = reply_to_message_id {
            request = request.reply_parameters(ReplyParameters::new(MessageId(msg_id as i32)));
        }

        request.await.map(|msg| msg.id.0 as i64).map_err(|e| {
            let msg = format!("Failed to send with button: {e}");
            warn!("{}", msg);
            msg
        })
    }

    /// Replace the text (and markup) of a previously sent message.
    pub async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), String> {
        self.bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text)
            .await
            .map(|_| ())
            .map_err(|e| {
                let msg = format!("Failed to edit message: {e}");
                warn!("{}", msg);
                msg
            })
    }

}
