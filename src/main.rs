mod config;
mod destination;
mod quiz;

use std::sync::Arc;

use config::Config;
use destination::Destination;
use dotenv::dotenv;
use log::{debug, info};
use quiz::{parser, publisher, QuizRecord};
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    net::Download,
    prelude::*,
    types::Document,
    utils::command::BotCommands,
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Per-chat session. A parsed batch waits in `AwaitingDestination` until the
/// owner says where to post it; it is dropped as soon as posting starts.
#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    ReceiveQuizzes,
    AwaitingDestination {
        quizzes: Vec<QuizRecord>,
    },
}

type PendingQuizStorage = Arc<ErasedStorage<State>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
enum Command {
    #[command(description = "show the supported quiz format")]
    Start,
    #[command(description = "show the supported quiz format")]
    Help,
    #[command(description = "forget the quizzes waiting to be posted")]
    Cancel,
}

#[tokio::main]
async fn main() -> HandlerResult {
    // A missing .env is fine, the variables may come from the environment itself
    dotenv().ok();
    pretty_env_logger::init();

    let config = Arc::new(Config::from_env()?);
    info!("Starting quiz bot...");

    let bot = Bot::new(config.bot_token.clone());

    debug!("Opening the quiz session store at {}", config.db_path);
    let storage: PendingQuizStorage = SqliteStorage::open(&config.db_path, Json).await?.erase();

    let handler = Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(dptree::entry().filter_command::<Command>().endpoint(command))
        .branch(
            dptree::filter(is_owner)
                .branch(dptree::case![State::ReceiveQuizzes].endpoint(receive_quizzes))
                .branch(
                    dptree::case![State::AwaitingDestination { quizzes }]
                        .endpoint(receive_destination),
                ),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![storage, config])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}

fn is_owner(msg: Message, config: Arc<Config>) -> bool {
    msg.from().is_some_and(|user| user.id == config.owner_id)
}

const NOT_AUTHORIZED_TEXT: &str = "❌ You are not authorized.";
const USAGE_TEXT: &str = "📘 Send your quiz text or .txt file.\n\n\
    👉 Format examples supported:\n\
    1. Question...\n\
    a) Option 1\n\
    b) Option 2 ✅\n\
    c) Option 3\n\
    (d) Option 4\n\
    Ex: Explanation (optional)\n\n\
    After sending, reply with group ID, @username or type /here to post here.";
const DESTINATION_PROMPT: &str = "Send group ID or @username, or type /here to post here.";

async fn command(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    cmd: Command,
    config: Arc<Config>,
) -> HandlerResult {
    let owner = is_owner(msg.clone(), config);
    match cmd {
        Command::Start | Command::Help if !owner => {
            bot.send_message(msg.chat.id, NOT_AUTHORIZED_TEXT).await?;
        }
        Command::Start | Command::Help => {
            bot.send_message(
                msg.chat.id,
                format!("{}\n\n{}", USAGE_TEXT, Command::descriptions()),
            )
            .await?;
        }
        Command::Cancel if owner => {
            dialogue.reset().await?;
            bot.send_message(msg.chat.id, "🗑 Pending quizzes discarded.")
                .await?;
        }
        Command::Cancel => {}
    }
    Ok(())
}

async fn receive_quizzes(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
    config: Arc<Config>,
) -> HandlerResult {
    load_quizzes(&bot, &dialogue, &msg, &config).await
}

async fn receive_destination(
    bot: Bot,
    dialogue: QuizDialogue,
    quizzes: Vec<QuizRecord>,
    msg: Message,
    config: Arc<Config>,
) -> HandlerResult {
    // A new file replaces the batch instead of naming a destination
    if msg.document().is_some() {
        return load_quizzes(&bot, &dialogue, &msg, &config).await;
    }

    let Some(destination) = msg.text().and_then(Destination::parse) else {
        bot.send_message(msg.chat.id, DESTINATION_PROMPT).await?;
        return Ok(());
    };

    dialogue.reset().await?;

    bot.send_message(
        msg.chat.id,
        format!("📤 Posting {} quizzes {}...", quizzes.len(), destination.describe()),
    )
    .await?;

    let recipient = destination.recipient(msg.chat.id);
    let report = publisher::publish_batch(&bot, &recipient, &quizzes, config.poll_spacing).await;

    for failure in &report.failures {
        bot.send_message(
            msg.chat.id,
            format!("❌ Quiz {}: {}", failure.index + 1, failure.error),
        )
        .await?;
    }
    bot.send_message(msg.chat.id, report.summary()).await?;
    Ok(())
}

/// Parses the message text or uploaded file and keeps the result as the pending batch.
async fn load_quizzes(
    bot: &Bot,
    dialogue: &QuizDialogue,
    msg: &Message,
    config: &Config,
) -> HandlerResult {
    let from_file = msg.document().is_some();
    let text = match (msg.document(), msg.text()) {
        (Some(document), _) => match download_text(bot, document, config.max_file_bytes).await {
            Ok(text) => text,
            Err(err) => {
                bot.send_message(msg.chat.id, format!("❌ Error reading file: {}", err))
                    .await?;
                return Ok(());
            }
        },
        (None, Some(text)) => text.to_string(),
        (None, None) => {
            bot.send_message(msg.chat.id, "Please send the quizzes as text or as a .txt file.")
                .await?;
            return Ok(());
        }
    };

    let quizzes = parser::parse(text.as_str());
    if quizzes.is_empty() {
        let reply = if from_file {
            "❌ No valid quizzes found in file."
        } else {
            "❌ No valid quizzes found. Make sure you send question + 2-10 options; \
             mark correct option with ✅ and optional Ex: line."
        };
        bot.send_message(msg.chat.id, reply).await?;
        return Ok(());
    }

    info!("Parsed {} quizzes in chat {}", quizzes.len(), msg.chat.id.0);
    let reply = format!(
        "✅ {} quizzes {}.\n{}",
        quizzes.len(),
        if from_file { "loaded" } else { "parsed" },
        DESTINATION_PROMPT
    );
    dialogue
        .update(State::AwaitingDestination { quizzes })
        .await?;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn download_text(
    bot: &Bot,
    document: &Document,
    max_bytes: u32,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    if document.file.size > max_bytes {
        return Err(format!("file is larger than {} bytes", max_bytes).into());
    }

    let file = bot.get_file(document.file.id.clone()).await?;
    let mut contents = Vec::with_capacity(document.file.size as usize);
    bot.download_file(&file.path, &mut contents).await?;

    let text = String::from_utf8(contents)?;
    // Windows editors like to start UTF-8 files with a BOM
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
