mod bot;
mod completion;
mod config;
mod telegram_log;
mod trigger;

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatKind;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use bot::commands;
use bot::database::MessageLog;
use bot::ratelimit::RateLimiter;
use bot::search::SearchClient;
use bot::{ChatEngine, ChatMessage, EngineConfig, ReplyTo, TelegramClient};
use config::Config;

struct BotState {
    engine: ChatEngine,
    /// Bot username, also held by the engine; kept here for command parsing.
    handle: Option<String>,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "geveze.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("geveze: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("geveze.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id);
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting geveze...");
    info!("Loaded config from {config_path}");

    // Resolve the bot's own handle once; mention detection stays off if
    // this fails
    let handle = match bot.get_me().await {
        Ok(me) => {
            info!("Bot username: @{}", me.username());
            Some(me.username().to_string())
        }
        Err(e) => {
            warn!("Failed to get bot info: {e}");
            None
        }
    };

    let display_name = handle.clone().unwrap_or_else(|| "geveze".to_string());
    let log = MessageLog::open(&config.data_dir.join("geveze.db"));
    let completion = completion::Client::new(
        config.deepseek_api_key.clone(),
        config.llm_base_url.clone(),
    );
    let limiter = RateLimiter::new(
        Duration::from_secs(config.rate_limit_cooldown_secs),
        config.rate_limit_violations,
    );
    let search = config.tavily_api_key.clone().map(SearchClient::new);
    if search.is_none() {
        info!("No tavily_api_key, web-search grounding disabled");
    }

    let engine = ChatEngine::new(
        EngineConfig {
            handle: handle.clone(),
            display_name,
            context_window: config.context_window,
            line_budget: config.history_line_chars,
            rate_limit_enabled: config.rate_limit_enabled,
        },
        log,
        completion,
        TelegramClient::new(bot.clone()),
        limiter,
        search,
    );

    let state = Arc::new(BotState { engine, handle });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_new_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback_query));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_new_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let is_private = matches!(msg.chat.kind, ChatKind::Private(_));
    let is_group = matches!(msg.chat.kind, ChatKind::Public(_));
    if !is_private && !is_group {
        return Ok(());
    }

    if msg.from.is_none() {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let chat_msg = telegram_to_chat_message(&msg);

    if let Some((command, args)) = commands::parse(text, state.handle.as_deref()) {
        state.engine.handle_command(command, &args, &chat_msg).await;
    } else {
        state.engine.handle_message(&chat_msg, is_private).await;
    }

    Ok(())
}

async fn handle_callback_query(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    // Stop the button spinner whatever the payload turns out to be
    bot.answer_callback_query(q.id.clone()).await.ok();

    let Some(data) = q.data else {
        return Ok(());
    };
    let Some(message) = q.message else {
        return Ok(());
    };

    state
        .engine
        .handle_callback(&data, message.chat().id.0, message.id().0 as i64)
        .await;

    Ok(())
}

fn telegram_to_chat_message(msg: &Message) -> ChatMessage {
    let user = msg.from.as_ref();
    let user_id = user.map(|u| u.id.0 as i64).unwrap_or(0);
    let display_name = user
        .map(|u| u.first_name.clone())
        .unwrap_or_else(|| "Biri".to_string());

    let reply_to = msg.reply_to_message().map(|reply| {
        let reply_user = reply.from.as_ref();
        ReplyTo {
            message_id: reply.id.0 as i64,
            handle: reply_user.and_then(|u| u.username.clone()),
            display_name: reply_user
                .map(|u| u.first_name.clone())
                .unwrap_or_else(|| "Biri".to_string()),
            text: reply.text().unwrap_or("").to_string(),
        }
    });

    ChatMessage {
        message_id: msg.id.0 as i64,
        chat_id: msg.chat.id.0,
        user_id,
        display_name,
        text: msg.text().unwrap_or("").to_string(),
        timestamp_millis: msg.date.timestamp_millis(),
        reply_to,
    }
}
