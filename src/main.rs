use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lawassist::console;
use lawassist::db;
use lawassist::llm::LlmClient;
use lawassist::llm::config::api_key_var;
use lawassist::services::completion::{Completer, CompletionService};
use lawassist::services::laws::{self, LawCatalog, LawRecord, NewLaw};
use lawassist::session::SessionCoordinator;
use lawassist::transcription::CommandRecognizer;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no law with id {0}")]
    LawNotFound(i64),
}

#[derive(Parser, Debug)]
#[command(name = "lawassist", about = "AI assistant for Indian laws, government schemes and services")]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = db::DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Shell command that records speech and prints the transcript.
    #[arg(long, env = "LAWASSIST_STT_COMMAND")]
    stt_command: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat (default).
    Chat,
    Laws(LawsCommand),
}

#[derive(Args, Debug)]
struct LawsCommand {
    /// Print records as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: LawsSubcommand,
}

#[derive(Subcommand, Debug)]
enum LawsSubcommand {
    List,
    Search { query: String },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        link: Option<String>,
        /// Replace the record with this id instead of creating a new one.
        #[arg(long)]
        id: Option<i64>,
    },
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let pool = db::init_pool(&cli.database_url).await?;
    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(pool, cli.stt_command).await,
        Command::Laws(cmd) => run_laws(&pool, cmd).await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_completer() -> Arc<dyn Completer> {
    match LlmClient::from_env() {
        Ok(client) => {
            info!(model = client.model(), "llm configured");
            Arc::new(CompletionService::new(Arc::new(client)))
        }
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "llm unavailable; replies will describe the problem");
            Arc::new(CompletionService::unconfigured(api_key_var()))
        }
    }
}

async fn run_chat(pool: sqlx::SqlitePool, stt_command: Option<String>) -> Result<(), CliError> {
    let session = SessionCoordinator::new(build_completer(), Arc::new(LawCatalog::new(pool)));
    match stt_command.filter(|c| !c.trim().is_empty()) {
        Some(command) => session.attach_voice(Arc::new(CommandRecognizer::new(command))),
        None => info!("voice input disabled; set LAWASSIST_STT_COMMAND to enable"),
    }
    console::run(session).await?;
    Ok(())
}

async fn run_laws(pool: &sqlx::SqlitePool, cmd: LawsCommand) -> Result<(), CliError> {
    match cmd.command {
        LawsSubcommand::List => {
            let records = laws::list_laws(pool).await?;
            print_laws(&records, cmd.json)
        }
        LawsSubcommand::Search { query } => {
            let records = laws::search_laws(pool, &query).await?;
            print_laws(&records, cmd.json)
        }
        LawsSubcommand::Add { title, category, description, link, id } => {
            let law = NewLaw { id, title, category, description, reference_link: link };
            let id = laws::insert_law(pool, &law).await?;
            if cmd.json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("saved law #{id}");
            }
            Ok(())
        }
        LawsSubcommand::Delete { id } => {
            if laws::delete_law(pool, id).await? == 0 {
                return Err(CliError::LawNotFound(id));
            }
            if !cmd.json {
                println!("deleted law #{id}");
            }
            Ok(())
        }
    }
}

fn print_laws(records: &[LawRecord], json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("{}", console::render::NO_LAWS);
    }
    for law in records {
        println!("{}", console::render::render_law(law));
    }
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
