//! The glue: logging, trigger check, rate limiting, context assembly,
//! completion call, reply, re-log. Command handlers live here too; each
//! is a leaf that fetches once, formats, and replies.

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bot::commands::{self, Command};
use crate::bot::context::{self, PromptInput, ReplyContext};
use crate::bot::database::{LogLine, MessageLog, NewLine};
use crate::bot::fun::FunClient;
use crate::bot::market::{self, MarketClient, MarketError};
use crate::bot::message::ChatMessage;
use crate::bot::persona::{self, PersonaStore};
use crate::bot::ratelimit::{RateLimiter, Verdict};
use crate::bot::search::{self, SearchClient};
use crate::bot::telegram::TelegramClient;
use crate::bot::weather::{self, ResolveError, WeatherClient};
use crate::completion::{self, GenerationParams};
use crate::trigger;

const SUMMARY_LOOKBACK_HOURS: i64 = 24;
const SUMMARY_MAX_MESSAGES: usize = 50;
const SUMMARY_CHAR_BUDGET: usize = 8000;

const FORECAST_BUTTON_LABEL: &str = "5 günlük tahmin";

// One static sentence per failure path; the raw error goes to the log.
const REPLY_APOLOGY: &str = "Şu an kafam durdu, birazdan tekrar dene.";
const THROTTLE_NOTICE: &str = "Yavaş ol biraz, soluklan. Birazdan yine sorarsın.";
const NOTHING_TO_SUMMARIZE: &str = "Özetlenecek bir şey yok.";
const SUMMARY_FAILED: &str = "Özet çıkaramadım, sonra tekrar dene.";
const WEATHER_CITY_PROMPT: &str = "Hangi şehir? Örnek: /hava izmir";
const WEATHER_CITY_NOT_FOUND: &str = "Öyle bir şehir bulamadım.";
const WEATHER_FAILED: &str = "Hava durumunu alamadım, sonra tekrar dene.";
const PERSONA_USAGE: &str = "Kullanım: /kisilik <isim> [dakika]";
const FX_USAGE: &str = "Kur kodu üç harf olur. Örnek: /doviz usd eur";
const FX_FAILED: &str = "Kurları alamadım, sonra tekrar dene.";
const CRYPTO_FAILED: &str = "Fiyatları alamadım, sonra tekrar dene.";

/// Per-session settings the engine needs at runtime.
pub struct EngineConfig {
    /// Bot username resolved at startup; `None` when `get_me` failed,
    /// which silently disables mention and self-reply detection.
    pub handle: Option<String>,
    /// Author name used when re-logging the bot's own replies.
    pub display_name: String,
    pub context_window: usize,
    pub line_budget: usize,
    pub rate_limit_enabled: bool,
}

/// The session object: all previously-global state lives here.
pub struct ChatEngine {
    cfg: EngineConfig,
    log: MessageLog,
    completion: completion::Client,
    personas: PersonaStore,
    limiter: Mutex<RateLimiter>,
    telegram: TelegramClient,
    weather: WeatherClient,
    market: MarketClient,
    fun: FunClient,
    search: Option<SearchClient>,
}

impl ChatEngine {
    pub fn new(
        cfg: EngineConfig,
        log: MessageLog,
        completion: completion::Client,
        telegram: TelegramClient,
        limiter: RateLimiter,
        search: Option<SearchClient>,
    ) -> Self {
        Self {
            cfg,
            log,
            completion,
            personas: PersonaStore::new(),
            limiter: Mutex::new(limiter),
            telegram,
            weather: WeatherClient::new(),
            market: MarketClient::new(),
            fun: FunClient::new(),
            search,
        }
    }

    /// The main reply path for a non-command text message.
    pub async fn handle_message(&self, msg: &ChatMessage, is_private: bool) {
        // Log first; command lines never land in the log
        if !msg.text.starts_with('/') {
            self.log.append(&NewLine {
                message_id: msg.message_id,
                author: &msg.display_name,
                text: &msg.text,
                reply_to_id: msg.reply_to.as_ref().map(|r| r.message_id),
                timestamp_millis: msg.timestamp_millis,
            });
        }

        let triggered = trigger::should_reply(
            &trigger::Incoming {
                is_private,
                text: &msg.text,
                reply_author: msg.reply_to.as_ref().and_then(|r| r.handle.as_deref()),
            },
            self.cfg.handle.as_deref(),
        );
        if !triggered {
            return;
        }

        let preview: String = msg.text.chars().take(80).collect();
        info!("📨 {} ({}): \"{preview}\"", msg.display_name, msg.user_id);

        if self.cfg.rate_limit_enabled {
            let verdict = self
                .limiter
                .lock()
                .await
                .check(msg.user_id, msg.timestamp_millis);
            match verdict {
                Verdict::Allowed => {}
                Verdict::Notify => {
                    self.send_reply(msg, THROTTLE_NOTICE).await;
                    return;
                }
                Verdict::Silent => return,
            }
        }

        let query = trigger::clean_query(&msg.text, self.cfg.handle.as_deref());

        // Question-shaped queries get one search call as grounding;
        // a failed search degrades to an ungrounded prompt
        let grounding = match &self.search {
            Some(client) if search::is_question(&query) => match client.search(&query).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Search grounding failed: {e}");
                    None
                }
            },
            _ => None,
        };

        let history = self.log.recent(self.cfg.context_window);
        let reply = msg.reply_to.as_ref().map(|r| ReplyContext {
            author: &r.display_name,
            text: &r.text,
            from_bot: is_from_bot(r.handle.as_deref(), self.cfg.handle.as_deref()),
        });

        let prompt = context::build_prompt(&PromptInput {
            reply,
            history: &history,
            line_budget: self.cfg.line_budget,
            asker: &msg.display_name,
            query: &query,
            grounding: grounding.as_deref(),
        });

        let persona = self.personas.active().await;
        match self
            .completion
            .chat(persona.instruction, &prompt, &persona.params)
            .await
        {
            Ok(text) => {
                if let Ok(sent_id) = self
                    .telegram
                    .send_message(msg.chat_id, &text, Some(msg.message_id))
                    .await
                {
                    // Re-log under the bot's own name so future context
                    // windows include this reply
                    self.log.append(&NewLine {
                        message_id: sent_id,
                        author: &self.cfg.display_name,
                        text: &text,
                        reply_to_id: Some(msg.message_id),
                        timestamp_millis: now_millis(),
                    });
                }
            }
            Err(e) => {
                error!("Completion failed: {e}");
                self.send_reply(msg, REPLY_APOLOGY).await;
            }
        }
    }

    pub async fn handle_command(&self, command: Command, args: &[String], msg: &ChatMessage) {
        info!("Command {:?} from {}", command, msg.display_name);
        match command {
            Command::Ozet => self.cmd_summarize(msg).await,
            Command::Kisilik => self.cmd_persona(args, msg).await,
            Command::Hava => self.cmd_weather(args, msg).await,
            Command::Doviz => self.cmd_fx(args, msg).await,
            Command::Kripto => self.cmd_crypto(args, msg).await,
            Command::Fikra => {
                let joke = self.fun.joke().await;
                self.send_reply(msg, &joke).await;
            }
            Command::Soz => {
                let quote = self.fun.quote().await;
                self.send_reply(msg, &quote).await;
            }
            Command::Yardim => self.send_reply(msg, commands::help_text()).await,
        }
    }

    /// Forecast-button callbacks; anything else is ignored.
    pub async fn handle_callback(&self, data: &str, chat_id: i64, message_id: i64) {
        let Some(city) = weather::parse_callback(data) else {
            debug!("Ignoring unknown callback payload: {data}");
            return;
        };

        match self.weather.forecast(&city).await {
            Ok(text) => {
                let _ = self.telegram.edit_message(chat_id, message_id, &text).await;
            }
            Err(e) => {
                error!("Forecast fetch failed: {e}");
                let _ = self
                    .telegram
                    .edit_message(chat_id, message_id, WEATHER_FAILED)
                    .await;
            }
        }
    }

    async fn cmd_summarize(&self, msg: &ChatMessage) {
        let cutoff = now_millis() - SUMMARY_LOOKBACK_HOURS * 60 * 60 * 1000;
        let lines = self.log.since(cutoff, SUMMARY_MAX_MESSAGES);

        // An empty window means no completion call at all
        let Some(transcript) = summary_transcript(&lines) else {
            self.send_reply(msg, NOTHING_TO_SUMMARIZE).await;
            return;
        };

        let now_label = chrono::Utc::now()
            .with_timezone(&chrono_tz::Europe::Istanbul)
            .format("%d.%m.%Y %H:%M");
        let prompt = format!(
            "Şu an {now_label}. Aşağıdaki konuşmayı oku ve çok kısa özetle:\n\
             1. Gündem ne? Tek cümle.\n\
             2. Kim ne yapıyor? Kişi başı en fazla bir cümle.\n\n\
             Konuşmalar:\n{transcript}"
        );

        let persona = self.personas.active().await;
        match self
            .completion
            .chat(persona.instruction, &prompt, &GenerationParams::default())
            .await
        {
            Ok(text) => self.send_reply(msg, &text).await,
            Err(e) => {
                error!("Summary completion failed: {e}");
                self.send_reply(msg, SUMMARY_FAILED).await;
            }
        }
    }

    async fn cmd_persona(&self, args: &[String], msg: &ChatMessage) {
        let Some(name) = args.first() else {
            let active = self.personas.active().await;
            let reply = format!(
                "Şu anki kişilik: {}. Seçenekler: {}",
                active.name,
                persona::names()
            );
            self.send_reply(msg, &reply).await;
            return;
        };

        let minutes = match args.get(1) {
            Some(token) => match token.parse::<u64>() {
                Ok(m) => Some(m),
                Err(_) => {
                    self.send_reply(msg, PERSONA_USAGE).await;
                    return;
                }
            },
            None => None,
        };

        match self.personas.set(name, minutes).await {
            Ok(p) => {
                let reply = match minutes {
                    Some(m) => format!("Tamam, {m} dakikalığına '{}' oldum.", p.name),
                    None => format!("Tamam, artık '{}' benim.", p.name),
                };
                self.send_reply(msg, &reply).await;
            }
            Err(e) => self.send_reply(msg, &e.to_string()).await,
        }
    }

    async fn cmd_weather(&self, args: &[String], msg: &ChatMessage) {
        if args.is_empty() {
            self.send_reply(msg, WEATHER_CITY_PROMPT).await;
            return;
        }
        let name = args.join(" ");

        let city = match self.weather.resolve(&name).await {
            Ok(city) => city,
            Err(ResolveError::NotFound(_)) => {
                self.send_reply(msg, WEATHER_CITY_NOT_FOUND).await;
                return;
            }
            Err(ResolveError::Upstream(e)) => {
                error!("Geocoding failed: {e}");
                self.send_reply(msg, WEATHER_FAILED).await;
                return;
            }
        };

        match self.weather.current(&city).await {
            Ok(text) => {
                let payload = weather::callback_payload(&city);
                let _ = self
                    .telegram
                    .send_with_button(
                        msg.chat_id,
                        &text,
                        Some(msg.message_id),
                        FORECAST_BUTTON_LABEL,
                        &payload,
                    )
                    .await;
            }
            Err(e) => {
                error!("Weather fetch failed: {e}");
                self.send_reply(msg, WEATHER_FAILED).await;
            }
        }
    }

    async fn cmd_fx(&self, args: &[String], msg: &ChatMessage) {
        let codes: Vec<String> = if args.is_empty() {
            market::DEFAULT_FX_CODES.iter().map(|s| s.to_string()).collect()
        } else {
            let mut codes = Vec::with_capacity(args.len());
            for token in args {
                match market::normalize_code(token) {
                    Some(code) => codes.push(code),
                    None => {
                        self.send_reply(msg, FX_USAGE).await;
                        return;
                    }
                }
            }
            codes
        };

        match self.market.fx_rates(&codes).await {
            Ok(text) => self.send_reply(msg, &text).await,
            Err(MarketError::UnknownCurrency(code)) => {
                self.send_reply(msg, &format!("'{code}' diye bir kur tanımıyorum."))
                    .await;
            }
            Err(MarketError::Upstream(e)) => {
                error!("FX fetch failed: {e}");
                self.send_reply(msg, FX_FAILED).await;
            }
        }
    }

    async fn cmd_crypto(&self, args: &[String], msg: &ChatMessage) {
        let ids: Vec<String> = if args.is_empty() {
            market::DEFAULT_CRYPTO_IDS.iter().map(|s| s.to_string()).collect()
        } else {
            args.iter().map(|a| a.to_lowercase()).collect()
        };

        match self.market.crypto_prices(&ids).await {
            Ok(text) => self.send_reply(msg, &text).await,
            Err(e) => {
                error!("Crypto fetch failed: {e}");
                self.send_reply(msg, CRYPTO_FAILED).await;
            }
        }
    }

    async fn send_reply(&self, msg: &ChatMessage, text: &str) {
        let _ = self
            .telegram
            .send_message(msg.chat_id, text, Some(msg.message_id))
            .await;
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn is_from_bot(reply_handle: Option<&str>, bot_handle: Option<&str>) -> bool {
    match (reply_handle, bot_handle) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Join log lines into the summary transcript, `None` when the window
/// is empty. The transcript is clipped to a fixed character budget.
fn summary_transcript(lines: &[LogLine]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let joined = lines
        .iter()
        .map(|l| format!("{}: {}", l.author, l.text))
        .collect::<Vec<_>>()
        .join("\n");

    if joined.chars().count() > SUMMARY_CHAR_BUDGET {
        Some(joined.chars().take(SUMMARY_CHAR_BUDGET).collect())
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, author: &str, text: &str) -> LogLine {
        LogLine {
            id,
            message_id: id,
            author: author.to_string(),
            text: text.to_string(),
            reply_to_id: None,
            timestamp_millis: 1000 + id,
        }
    }

    #[test]
    fn test_empty_window_yields_no_transcript() {
        // This is what keeps /ozet from calling the completion API
        assert!(summary_transcript(&[]).is_none());
    }

    #[test]
    fn test_transcript_joins_chronologically() {
        let lines = vec![line(1, "alice", "önce"), line(2, "bob", "sonra")];
        let transcript = summary_transcript(&lines).unwrap();
        assert_eq!(transcript, "alice: önce\nbob: sonra");
    }

    #[test]
    fn test_transcript_clipped_to_budget() {
        let lines: Vec<LogLine> = (0..100)
            .map(|i| line(i, "alice", &"uzun mesaj ".repeat(20)))
            .collect();
        let transcript = summary_transcript(&lines).unwrap();
        assert_eq!(transcript.chars().count(), SUMMARY_CHAR_BUDGET);
    }

    #[test]
    fn test_is_from_bot_requires_resolved_handle() {
        assert!(is_from_bot(Some("geveze_bot"), Some("geveze_bot")));
        assert!(!is_from_bot(Some("alice"), Some("geveze_bot")));
        assert!(!is_from_bot(Some("geveze_bot"), None));
        assert!(!is_from_bot(None, Some("geveze_bot")));
    }
}
