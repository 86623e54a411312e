//! Incoming message types, decoupled from teloxide's `Message`.

/// Content quoted when replying to another message.
#[derive(Debug, Clone)]
pub struct ReplyTo {
    pub message_id: i64,
    /// Telegram username of the quoted author, when they have one.
    pub handle: Option<String>,
    pub display_name: String,
    pub text: String,
}

/// A chat message with the metadata the bot cares about.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    /// Sender's first name, the way it shows up in logged history.
    pub display_name: String,
    pub text: String,
    pub timestamp_millis: i64,
    pub reply_to: Option<ReplyTo>,
}
