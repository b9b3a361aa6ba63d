//! datachat - ask questions about your databases from the terminal.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use datachat_cli::{config, logging, render};
use datachat_core::{
    ChatWorkspace, HttpChatService, MemoryTranscriptStore, SqliteTranscriptStore,
    TranscriptStore, TurnOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;

use config::Config;
use logging::{LogConfig, LogFormat, Verbosity};

/// datachat - natural-language questions against connected databases.
#[derive(Parser, Debug)]
#[command(name = "datachat")]
#[command(about = "Chat with your databases through the datachat query service")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the service URL from config
    #[arg(long, value_name = "URL", global = true)]
    api_url: Option<String>,

    /// Keep transcripts in memory only for this run
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Log turn and workspace activity
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log everything datachat does
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log everything, including HTTP client internals
    #[arg(long, global = true)]
    trace: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "turn=debug" or "store=trace").
    /// Can be specified multiple times. Targets are prefixed with "datachat::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show local transcript storage usage
    Stats,
    #[command(flatten)]
    Chat(ChatCommand),
}

/// Commands that talk to the query service.
#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// List chats, newest first
    Chats,
    /// List active databases
    Databases,
    /// Create a chat bound to a database
    New {
        title: String,
        #[arg(long)]
        database: Option<String>,
    },
    /// Delete a chat and its local transcript
    Delete { chat_id: String },
    /// Print a chat transcript
    Show {
        #[arg(long)]
        chat: Option<String>,
        /// Re-fetch the transcript from the server first
        #[arg(long)]
        refresh: bool,
    },
    /// Ask a question in a chat
    Ask {
        prompt: String,
        #[arg(long)]
        chat: Option<String>,
        #[arg(long)]
        database: Option<String>,
    },
    /// Forget a chat's local transcript
    Clear {
        #[arg(long)]
        chat: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.verbose, cli.debug, cli.trace, cli.quiet);
    let log_config = LogConfig::new(verbosity, &cli.log_overrides, cli.log_format)?;
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load()?,
    };
    config.apply_env();
    if let Some(url) = cli.api_url.clone() {
        config.api_url = url;
    }
    tracing::info!(target: "datachat::startup", "Using query service at {}", config.api_url);

    let sqlite = if cli.ephemeral {
        None
    } else {
        let store = SqliteTranscriptStore::open(&config.db_path, config.codec())
            .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
        tracing::info!(target: "datachat::startup", "Transcripts stored in {}", config.db_path.display());
        Some(Arc::new(store))
    };

    let command = match cli.command {
        Command::Stats => return print_stats(sqlite.as_deref()),
        Command::Chat(command) => command,
    };

    let store: Arc<dyn TranscriptStore> = match &sqlite {
        Some(store) => store.clone(),
        None => Arc::new(MemoryTranscriptStore::new(config.codec())),
    };
    let service = Arc::new(HttpChatService::new(config.service_config())?);
    let workspace = ChatWorkspace::new(service, store, config.workspace_config());
    workspace.load().await.context("Failed to load chats")?;
    tracing::debug!(target: "datachat::startup", "Workspace loaded");

    run(&workspace, command).await
}

async fn run(ws: &ChatWorkspace, command: ChatCommand) -> Result<()> {
    match command {
        ChatCommand::Chats => {
            let active = ws.registry().active_id();
            print!("{}", render::render_chat_list(&ws.registry().list(), active.as_deref()));
        }
        ChatCommand::Databases => {
            let selected = ws.selected_database().map(|d| d.database_id);
            print!("{}", render::render_databases(&ws.databases(), selected.as_deref()));
        }
        ChatCommand::New { title, database } => {
            if let Some(db) = database {
                ws.select_database(&db)?;
            }
            match ws.create_chat(&title).await? {
                Some(chat) => println!("{}", chat.chat_id),
                None => bail!("Chat title must not be empty"),
            }
        }
        ChatCommand::Delete { chat_id } => {
            ws.delete_chat(&chat_id).await?;
            println!("Deleted {}", chat_id);
        }
        ChatCommand::Show { chat, refresh } => {
            let chat_id = focus_chat(ws, chat.as_deref()).await?;
            if refresh {
                ws.sync_messages(&chat_id).await?;
            }
            print!("{}", render::render_transcript(&ws.messages(&chat_id), |r| ws.interpret(r)));
        }
        ChatCommand::Ask {
            prompt,
            chat,
            database,
        } => {
            focus_chat(ws, chat.as_deref()).await?;
            if let Some(db) = database {
                ws.select_database(&db)?;
            }
            match ws.handle_send(&prompt).await {
                TurnOutcome::Resolved(message) => {
                    print!("{}", render::render_message(&message, &ws.interpret(&message.response)));
                }
                TurnOutcome::Failed(message) => bail!("{}", message.response),
                TurnOutcome::Dropped(reason) => bail!("Nothing sent: {:?}", reason),
                TurnOutcome::Busy => bail!("A question is already pending in this chat"),
            }
        }
        ChatCommand::Clear { chat } => {
            let chat_id = focus_chat(ws, chat.as_deref()).await?;
            ws.clear_messages(&chat_id);
            println!("Cleared local transcript for {}", chat_id);
        }
    }
    Ok(())
}

/// Select `chat` if given and return the active chat id.
async fn focus_chat(ws: &ChatWorkspace, chat: Option<&str>) -> Result<String> {
    if let Some(id) = chat {
        ws.select_chat(id).await?;
    }
    match ws.registry().active_id() {
        Some(id) => Ok(id),
        None => bail!("No chats yet; create one with `datachat new <TITLE>`"),
    }
}

fn print_stats(store: Option<&SqliteTranscriptStore>) -> Result<()> {
    let Some(store) = store else {
        println!("Ephemeral run: nothing stored.");
        return Ok(());
    };
    let stats = store.stats()?;
    println!("Chats stored:     {}", stats.record_count);
    println!("Transcript bytes: {}", stats.total_original_size);
    println!("Stored bytes:     {}", stats.total_compressed_size);
    println!("Ratio:            {:.2}", stats.compression_ratio());
    Ok(())
}
