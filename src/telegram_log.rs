//! tracing layer that mirrors operator logs into a Telegram chat.
//!
//! WARN and ERROR go out immediately; INFO lines are batched and flushed
//! on an interval so the operator chat doesn't get flooded.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_INTERVAL: Duration = Duration::from_secs(10);
const FLUSH_AT: usize = 25;
/// Telegram message size cap, with headroom.
const MAX_MESSAGE_CHARS: usize = 4000;

enum Entry {
    /// WARN/ERROR: sent as soon as it arrives.
    Urgent(String),
    /// INFO: buffered until the next flush.
    Buffered(String),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<Entry>,
}

impl TelegramLogLayer {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(pump(bot, chat_id, rx));
        Self { tx }
    }
}

async fn pump(bot: Bot, chat_id: ChatId, mut rx: mpsc::UnboundedReceiver<Entry>) {
    let mut buffer: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            entry = rx.recv() => {
                match entry {
                    Some(Entry::Urgent(text)) => deliver(&bot, chat_id, &text).await,
                    Some(Entry::Buffered(text)) => {
                        buffer.push(text);
                        if buffer.len() >= FLUSH_AT {
                            deliver(&bot, chat_id, &buffer.join("\n")).await;
                            buffer.clear();
                        }
                    }
                    None => {
                        if !buffer.is_empty() {
                            deliver(&bot, chat_id, &buffer.join("\n")).await;
                        }
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    deliver(&bot, chat_id, &buffer.join("\n")).await;
                    buffer.clear();
                }
            }
        }
    }
}

async fn deliver(bot: &Bot, chat_id: ChatId, text: &str) {
    let clipped: String = if text.chars().count() > MAX_MESSAGE_CHARS {
        text.chars().take(MAX_MESSAGE_CHARS).collect()
    } else {
        text.to_string()
    };
    if let Err(e) = bot.send_message(chat_id, clipped).await {
        eprintln!("Failed to mirror log to Telegram: {e}");
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            if !self.message.is_empty() {
                self.message.push_str(", ");
            }
            self.message.push_str(&format!("{}={:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let entry = match level {
            Level::ERROR => Entry::Urgent(format!("[HATA] {}", visitor.message)),
            Level::WARN => Entry::Urgent(format!("[UYARI] {}", visitor.message)),
            _ => Entry::Buffered(visitor.message),
        };

        // Channel only closes at shutdown; a dropped line is fine then
        let _ = self.tx.send(entry);
    }
}
