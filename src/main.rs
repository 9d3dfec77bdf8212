use anyhow::Result;
use chrono::NaiveDate;
use log::{error, info};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, InputFile, KeyboardButton, KeyboardMarkup, KeyboardRemove};

mod config;
mod date_utils;
mod error;
mod export;
mod google_auth;
mod guard;
mod messages;
mod phone;
mod registry;
mod report_engine;
mod report_service;
mod scheduler;
mod sheets;
mod user_store;

use config::Config;
use error::ReportError;
use export::{LiveWorkbookExporter, WorkbookExporter};
use google_auth::SheetsAuth;
use messages::Lang;
use report_service::{ReportOutput, ReportService};
use scheduler::DailyBroadcastScheduler;
use sheets::{GoogleSheetsClient, SheetsApi};
use user_store::{RegisteredUser, UserStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Load configuration
    let config = Arc::new(Config::from_env()?);
    info!("Configuration loaded successfully");

    // Initialize bot
    let bot = Bot::new(&config.bot_token);
    info!("Telegram bot initialized");

    // Wire up Google Sheets access and the report pipeline
    let auth = SheetsAuth::from_config(&config)?;
    let sheets: Arc<dyn SheetsApi> = Arc::new(GoogleSheetsClient::new(&config, auth.clone())?);
    let exporter: Arc<dyn WorkbookExporter> = Arc::new(LiveWorkbookExporter::new(&config, auth)?);
    let store = Arc::new(UserStore::new(&config.database_path)?);
    let service = Arc::new(ReportService::new(
        &config,
        sheets,
        exporter,
        store.clone(),
    ));

    // Create output directory
    std::fs::create_dir_all(&config.artifacts_dir)?;

    // Start the daily broadcast in the background
    let scheduler = DailyBroadcastScheduler::new(
        bot.clone(),
        config.clone(),
        service.clone(),
        store.clone(),
    );
    tokio::spawn(async move {
        scheduler.start().await;
    });

    // Create dispatcher with command and contact handlers
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::filter(|msg: Message| msg.contact().is_some()).endpoint(handle_contact));

    let config_clone = config.clone();
    let service_clone = service.clone();
    let store_clone = store.clone();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![config_clone, service_clone, store_clone])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

#[derive(teloxide::macros::BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Mavjud buyruqlar:")]
enum Command {
    #[command(description = "Botni ishga tushirish")]
    Start,
    #[command(description = "Yordam")]
    Help,
    #[command(description = "Bugungi hisobot")]
    Report,
    #[command(description = "Davr uchun hisobot: /period 2026-08-01 2026-08-15")]
    Period(String),
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    config: Arc<Config>,
    service: Arc<ReportService>,
    store: Arc<UserStore>,
) -> ResponseResult<()> {
    let telegram_id = msg.from().map(|u| u.id.0 as i64).unwrap_or(msg.chat.id.0);
    let registered = store.find(telegram_id).unwrap_or_else(|e| {
        error!("User lookup failed for {}: {}", telegram_id, e);
        None
    });
    let lang = match &registered {
        Some(user) => Lang::from_code(Some(&user.language_code)),
        None => Lang::from_code(msg.from().and_then(|u| u.language_code.as_deref())),
    };

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, messages::welcome(lang, &config.schedule_time))
                .await?;
            if registered.is_none() {
                send_contact_keyboard(&bot, msg.chat.id, lang).await?;
            }
        }
        Command::Help => {
            bot.send_message(msg.chat.id, messages::help(lang, &config.schedule_time))
                .await?;
        }
        Command::Report => {
            let today = date_utils::today_in_tz(config.report_timezone);
            request_report(&bot, &msg, registered, today, today, lang, service).await?;
        }
        Command::Period(args) => {
            let parts: Vec<&str> = args.split_whitespace().collect();
            if parts.len() != 2 {
                bot.send_message(msg.chat.id, messages::period_usage(lang))
                    .await?;
                return Ok(());
            }
            match date_utils::parse_range(parts[0], parts[1]) {
                Ok((from, to)) => {
                    request_report(&bot, &msg, registered, from, to, lang, service).await?;
                }
                Err(date_utils::RangeError::BadDate) => {
                    bot.send_message(msg.chat.id, messages::invalid_date(lang))
                        .await?;
                }
                Err(date_utils::RangeError::Inverted) => {
                    bot.send_message(msg.chat.id, messages::invalid_range(lang))
                        .await?;
                }
            }
        }
    }

    Ok(())
}

async fn request_report(
    bot: &Bot,
    msg: &Message,
    registered: Option<RegisteredUser>,
    from: NaiveDate,
    to: NaiveDate,
    lang: Lang,
    service: Arc<ReportService>,
) -> ResponseResult<()> {
    let user = match registered {
        Some(user) => user,
        None => {
            bot.send_message(msg.chat.id, messages::not_registered(lang))
                .await?;
            send_contact_keyboard(bot, msg.chat.id, lang).await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, messages::generating(lang))
        .await?;

    let outcome = service
        .generate(
            &user.phone_number,
            Some(&user.display_name),
            from,
            to,
            lang,
        )
        .await;
    match outcome {
        Ok(ReportOutput::Artifact(artifact)) => {
            let delivery = bot
                .send_document(msg.chat.id, InputFile::file(artifact.path.clone()))
                .caption(messages::report_caption(lang))
                .await;
            artifact.cleanup();
            delivery?;
            bot.send_message(msg.chat.id, messages::report_sent(lang))
                .await?;
        }
        Ok(ReportOutput::NoData) => {
            bot.send_message(msg.chat.id, messages::no_data(lang))
                .await?;
        }
        Err(e) => {
            if e.is_credential() {
                error!("Credential failure during report generation: {}", e);
            } else {
                error!("Report generation failed for {}: {}", user.phone_number, e);
            }
            bot.send_message(msg.chat.id, error_reply(&e, lang)).await?;
        }
    }

    Ok(())
}

fn error_reply(err: &ReportError, lang: Lang) -> &'static str {
    match err {
        ReportError::AlreadyProcessing => messages::already_processing(lang),
        ReportError::NotRegistered => messages::not_registered(lang),
        ReportError::InvalidPhone => messages::invalid_phone(lang),
        _ => messages::error_generating(lang),
    }
}

async fn handle_contact(
    bot: Bot,
    msg: Message,
    config: Arc<Config>,
    service: Arc<ReportService>,
) -> ResponseResult<()> {
    let contact = match msg.contact() {
        Some(contact) => contact,
        None => return Ok(()),
    };
    let sender = match msg.from() {
        Some(sender) => sender,
        None => return Ok(()),
    };
    let lang = Lang::from_code(sender.language_code.as_deref());

    // Only the sender's own contact counts as proof of the phone number.
    if contact.user_id != Some(sender.id) {
        bot.send_message(msg.chat.id, messages::own_contact_only(lang))
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, messages::checking_phone(lang))
        .await?;

    match service
        .register_contact(
            sender.id.0 as i64,
            &contact.phone_number,
            &sender.full_name(),
            sender.language_code.as_deref(),
        )
        .await
    {
        Ok(user) => {
            bot.send_message(
                msg.chat.id,
                messages::registration_success(lang, &user.phone_number, &config.schedule_time),
            )
            .reply_markup(KeyboardRemove::new())
            .await?;
        }
        Err(ReportError::InvalidPhone) => {
            bot.send_message(msg.chat.id, messages::invalid_phone(lang))
                .await?;
        }
        Err(ReportError::NotRegistered) => {
            bot.send_message(msg.chat.id, messages::not_registered(lang))
                .await?;
        }
        Err(e) => {
            error!("Contact registration failed: {}", e);
            bot.send_message(msg.chat.id, messages::general_error(lang))
                .await?;
        }
    }

    Ok(())
}

async fn send_contact_keyboard(bot: &Bot, chat_id: ChatId, lang: Lang) -> ResponseResult<()> {
    let button =
        KeyboardButton::new(messages::share_contact_button(lang)).request(ButtonRequest::Contact);
    let keyboard = KeyboardMarkup::new(vec![vec![button]])
        .resize_keyboard(true)
        .one_time_keyboard(true);

    bot.send_message(chat_id, messages::share_contact_prompt(lang))
        .reply_markup(keyboard)
        .await?;
    Ok(())
}
