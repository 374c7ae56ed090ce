//! RagDesk CLI — serve the chat endpoint, or talk to one from the terminal.

mod ui;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::*;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ragdesk_core::chat::ChatService;
use ragdesk_core::config::{RagDeskConfig, ENV_API_KEY, ENV_VECTOR_STORE_ID};
use ragdesk_core::locale::Locale;
use ragdesk_core::session::SessionStore;
use ragdesk_hub::api::{start_server, ApiState};
use ragdesk_hub::client::{ChatController, FileStorage, HttpTransport, SubmitOutcome};
use ragdesk_hub::providers::OpenAiProvider;

// ─── CLI Definition ────────────────────────────────────────

/// RagDesk — retrieval-augmented chat for your knowledge base
#[derive(Parser)]
#[command(name = "ragdesk", version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat HTTP endpoint
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Completion service API key
        #[arg(short = 'k', long, env = ENV_API_KEY, hide_env_values = true)]
        api_key: Option<String>,

        /// Vector store searched by the retrieval tool
        #[arg(long, env = ENV_VECTOR_STORE_ID)]
        vector_store: Option<String>,
    },

    /// Interactive chat against a running endpoint
    Chat {
        /// Chat endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Display language (en, es)
        #[arg(short, long)]
        locale: Option<Locale>,
    },

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,

        /// Chat endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Write a default config file
    Init,
}

// ─── Logging ───────────────────────────────────────────────

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ragdesk_core=debug,ragdesk_hub=debug"))
}

/// Server logs go to stdout.
fn init_stdout_logging() {
    tracing_subscriber::fmt().with_env_filter(default_filter()).init();
}

/// Interactive commands log to a daily file so the terminal stays readable.
fn init_file_logging() -> WorkerGuard {
    let log_dir = RagDeskConfig::data_dir().join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ragdesk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    guard
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<(RagDeskConfig, PathBuf)> {
    let path = path.cloned().unwrap_or_else(RagDeskConfig::default_path);
    let mut config = RagDeskConfig::load(&path)?;
    config.apply_env();
    Ok((config, path))
}

// ─── Main ──────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (mut config, config_path) = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            model,
            api_key,
            vector_store,
        } => {
            init_stdout_logging();
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(model) = model {
                config.provider.model = model;
            }
            if api_key.is_some() {
                config.provider.api_key = api_key;
            }
            if vector_store.is_some() {
                config.retrieval.vector_store_id = vector_store;
            }
            run_serve(config).await?;
        }

        Commands::Chat { endpoint, locale } => {
            let _guard = init_file_logging();
            if let Some(endpoint) = endpoint {
                config.client.endpoint = endpoint;
            }
            if let Some(locale) = locale {
                config.client.locale = Some(locale);
            }
            run_chat(&config).await?;
        }

        Commands::Ask {
            message,
            endpoint,
            session,
        } => {
            let _guard = init_file_logging();
            let endpoint = endpoint.unwrap_or(config.client.endpoint.clone());
            run_ask(&endpoint, &message, session.as_deref()).await?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => run_config_show(&config, &config_path),
            ConfigAction::Path => println!("{}", config_path.display()),
            ConfigAction::Init => {
                if config_path.exists() {
                    println!("{} {}", "Config already exists:".yellow(), config_path.display());
                } else {
                    RagDeskConfig::default().save(&config_path)?;
                    println!("{} {}", "Wrote".green(), config_path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────

async fn run_serve(config: RagDeskConfig) -> anyhow::Result<()> {
    let chat_config = config.chat_config();
    let store = Arc::new(SessionStore::with_max_turns(config.chat.max_turns));
    let provider = Arc::new(OpenAiProvider::new(config.provider.clone()));

    ui::print_banner();
    println!("  {} {}", "Model:".dimmed(), config.provider.model.cyan());
    println!(
        "  {} {}",
        "API key:".dimmed(),
        if config.provider.api_key.is_some() {
            "configured".green()
        } else {
            format!("not set ({})", ENV_API_KEY).red()
        }
    );
    println!(
        "  {} {}",
        "Retrieval:".dimmed(),
        match &chat_config.vector_store_id {
            Some(id) => format!("file_search on {}", id).green(),
            None => "disabled (no vector store)".yellow(),
        }
    );
    println!(
        "  {} {}",
        "Endpoint:".dimmed(),
        format!(
            "http://{}:{}/api/chat",
            config.server.host, config.server.port
        )
        .green()
        .bold()
    );
    println!();

    let state = ApiState {
        chat: ChatService::new(store, provider, chat_config),
    };

    start_server(state, &config.server.host, config.server.port).await
}

// ─── Chat ──────────────────────────────────────────────────

async fn run_chat(config: &RagDeskConfig) -> anyhow::Result<()> {
    let locale = config.client_locale();
    let storage = FileStorage::new(&RagDeskConfig::data_dir().join("client.json"));
    let controller = ChatController::new(
        HttpTransport::new(&config.client.endpoint),
        storage,
        locale,
    );
    controller.open();
    info!(
        "Chat client started against {} (session: {:?})",
        config.client.endpoint,
        controller.session_id()
    );

    let skin = ui::make_mad_skin();

    ui::print_banner();
    println!("  {} {}", locale.text("chatbot.title").bold(), config.client.endpoint.dimmed());
    if let Some(id) = controller.session_id() {
        println!("  {} {}", "Resuming session:".dimmed(), id.cyan());
    }
    println!("  {} {}", "Commands:".dimmed(), "/clear /session /history /help /quit".dimmed());
    println!();
    println!("{} {}", "AI ›".cyan().bold(), locale.text("chatbot.welcome"));
    println!();

    loop {
        print!("{} ", "You ›".green().bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" | "/q" => break,
            "/clear" => {
                controller.clear();
                println!("{}", locale.text("chatbot.clear").yellow());
                continue;
            }
            "/session" => {
                match controller.session_id() {
                    Some(id) => println!("  {}", id.cyan()),
                    None => println!("  {}", "(no session yet)".dimmed()),
                }
                continue;
            }
            "/history" => {
                for message in controller.transcript() {
                    ui::print_message(&skin, &message);
                }
                continue;
            }
            "/help" => {
                println!("\n{}", "Commands:".bold());
                println!("  /clear    — Forget this conversation and its session");
                println!("  /session  — Show the current session id");
                println!("  /history  — Reprint the conversation");
                println!("  /quit     — Exit");
                println!();
                continue;
            }
            _ => {}
        }

        controller.set_draft(input);
        let spinner = ui::typing_spinner(locale.text("chatbot.typing"));
        let outcome = controller.submit_draft().await;
        spinner.finish_and_clear();

        match outcome {
            SubmitOutcome::Replied(message) => ui::print_message(&skin, &message),
            SubmitOutcome::Failed(message) => {
                println!("\n{} {}\n", "AI ›".red().bold(), message.content);
            }
            SubmitOutcome::Ignored => {}
        }
    }

    Ok(())
}

// ─── Ask ───────────────────────────────────────────────────

async fn run_ask(endpoint: &str, message: &str, session: Option<&str>) -> anyhow::Result<()> {
    use ragdesk_hub::client::ChatTransport;

    let transport = HttpTransport::new(endpoint);
    let reply = transport
        .send(message, session)
        .await
        .map_err(|e| anyhow::anyhow!("Chat request to {} failed: {}", endpoint, e))?;

    info!(session = %reply.session_id, "Ask answered");
    println!("{}", reply.message);
    eprintln!("{} {}", "session:".dimmed(), reply.session_id);
    Ok(())
}

// ─── Config ────────────────────────────────────────────────

fn run_config_show(config: &RagDeskConfig, path: &std::path::Path) {
    println!(
        "  {} {} {}",
        "Config:".dimmed(),
        path.display(),
        if path.exists() { "(found)".green() } else { "(defaults)".yellow() }
    );
    println!("  {} {}", "Data dir:".dimmed(), RagDeskConfig::data_dir().display());
    println!();
    println!("  {} {}", "Provider:".dimmed(), config.provider.provider.green());
    println!("  {} {}", "Model:".dimmed(), config.provider.model.green());
    println!(
        "  {} {}",
        "API key:".dimmed(),
        if config.provider.api_key.is_some() {
            "configured".green()
        } else {
            "not set".red()
        }
    );
    println!(
        "  {} {}",
        "Vector store:".dimmed(),
        config
            .retrieval
            .vector_store_id
            .as_deref()
            .unwrap_or("(none)")
            .cyan()
    );
    println!("  {} {}", "Max turns:".dimmed(), config.chat.max_turns);
    println!(
        "  {} {}:{}",
        "Server:".dimmed(),
        config.server.host,
        config.server.port
    );
    println!("  {} {}", "Client endpoint:".dimmed(), config.client.endpoint);
    println!(
        "  {} {}{}",
        "Locale:".dimmed(),
        config.client_locale(),
        if config.client.locale.is_none() { " (detected)" } else { "" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ask_fails_when_endpoint_is_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}/api/chat", listener.local_addr().unwrap());
        drop(listener);

        let err = run_ask(&endpoint, "hello", None).await.unwrap_err();
        assert!(err.to_string().contains(&endpoint), "{}", err);
    }
}
