//! CLI command execution.
//!
//! Each invocation is one interaction cycle: open the session (restoring the
//! active selection from its sidecar file), run the action, persist the
//! selection again.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::collab::{
    ChatCompletionClient, Collaborators, CompletionOptions, DuckDuckGoSearch, PdfTextExtractor,
};
use crate::config::{Config, Overrides};
use crate::models::{created_at, Conversation, Conversations};
use crate::server::{self, ServerState};
use crate::session::{active_path, read_active, write_active, Session};
use crate::store::JsonFileStore;

use super::args::{Cli, Commands};
use super::chat::{parse_chat_line, ChatInput, HELP};

/// Open the session described by `config`.
fn open_session(config: &Config, active_file: &Path) -> Result<Session> {
    let completion = ChatCompletionClient::new(CompletionOptions {
        url: config.api_url.clone(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        temperature: config.temperature,
        timeout: config.timeout,
    })
    .context("Failed to build completion client")?;
    tracing::debug!(model = completion.model(), "completion client ready");

    let collab = Collaborators {
        completion: Arc::new(completion),
        search: Arc::new(
            DuckDuckGoSearch::new(config.timeout).context("Failed to build search client")?,
        ),
        extractor: Arc::new(PdfTextExtractor),
    };

    let store = Arc::new(JsonFileStore::new(&config.db_path));
    tracing::debug!(path = %store.path().display(), "opening store");
    let active = read_active(active_file)?;

    Session::open(store, collab, config.context, active)
        .with_context(|| format!("Failed to open store {}", config.db_path.display()))
}

/// Resolve a full id or a unique id prefix.
fn resolve_id(conversations: &Conversations, query: &str) -> Result<String> {
    if conversations.contains_key(query) {
        return Ok(query.to_string());
    }

    let matches: Vec<&String> = conversations
        .keys()
        .filter(|id| id.starts_with(query))
        .collect();

    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => bail!("No conversation matches '{query}'"),
        _ => bail!("'{query}' matches {} conversations; use more characters", matches.len()),
    }
}

/// Resolve an optional id argument, falling back to the active conversation.
fn target_id(session: &Session, id: Option<&str>) -> Result<String> {
    match id {
        Some(id) => resolve_id(&session.conversations()?, id),
        None => session
            .active()
            .map(str::to_string)
            .context("No active conversation; pass an ID or run `thinkr new`"),
    }
}

/// Start-of-cycle step for actions that need a conversation.
fn ensure_active(session: &mut Session, active_file: &Path) -> Result<String> {
    let id = session.ensure_active()?;
    write_active(active_file, Some(&id))?;
    Ok(id)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn format_created(id: &str) -> String {
    created_at(id).map_or_else(
        || "-".to_string(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn print_conversation(id: &str, conv: &Conversation) {
    println!("# {} ({id})", conv.title);
    for msg in conv.display_messages() {
        println!();
        println!("[{}]", msg.role);
        println!("{}", msg.content);
    }
}

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::from_env(Overrides {
        db: cli.db,
        model: cli.model,
    })?;
    let active_file = active_path(&config.db_path);
    let mut session = open_session(&config, &active_file)?;

    match cli.command {
        Commands::New => {
            let id = session.new_conversation()?;
            println!("Started conversation {id}");
        }

        Commands::List => {
            let conversations = session.conversations()?;
            if conversations.is_empty() {
                println!("No conversations yet. Run `thinkr new` or `thinkr ask`.");
            }
            for (id, conv) in &conversations {
                let marker = if session.active() == Some(id.as_str()) { "*" } else { " " };
                println!(
                    "{marker} {id}  {}  {} ({} messages)",
                    format_created(id),
                    conv.title,
                    conv.display_messages().len()
                );
            }
        }

        Commands::Select { id } => {
            let id = resolve_id(&session.conversations()?, &id)?;
            session.select(&id)?;
            println!("Active conversation: {id}");
        }

        Commands::Rename { id, title } => {
            let id = target_id(&session, id.as_deref())?;
            let title = title.join(" ");
            if session.rename(&id, &title)? {
                println!("Renamed {id} to '{}'", title.trim());
            } else {
                println!("Title unchanged");
            }
        }

        Commands::Delete { id } => {
            let id = target_id(&session, id.as_deref())?;
            let active = session.delete(&id)?;
            println!("Deleted {id}");
            match active {
                Some(active) => println!("Active conversation: {active}"),
                None => println!("No conversations left"),
            }
        }

        Commands::Show { id } => {
            let id = target_id(&session, id.as_deref())?;
            let conv = session.conversation(&id)?;
            print_conversation(&id, &conv);
        }

        Commands::Ask { message } => {
            ensure_active(&mut session, &active_file)?;
            let reply = session.submit(&message.join(" ")).await?;
            println!("{reply}");
        }

        Commands::Pdf { path } => {
            let bytes = read_file(&path)?;
            ensure_active(&mut session, &active_file)?;
            let chars = session.attach_pdf(bytes).await?;
            println!("Attached {chars} characters from {}", path.display());
        }

        Commands::Image { path } => {
            let bytes = read_file(&path)?;
            ensure_active(&mut session, &active_file)?;
            session.attach_image(&path.to_string_lossy(), &bytes)?;
            println!("Accepted image {}", path.display());
        }

        Commands::Search { query } => {
            ensure_active(&mut session, &active_file)?;
            let count = session.attach_search(&query.join(" ")).await?;
            println!("Attached {count} web results");
        }

        Commands::Chat => chat_loop(&mut session, &active_file).await?,

        Commands::Serve { port } => {
            let file = active_file.clone();
            let state = ServerState::new(session).on_select(move |id| {
                if let Err(e) = write_active(&file, id) {
                    tracing::warn!(error = %e, "failed to persist active conversation");
                }
            });
            return server::start_server(port, state).await;
        }
    }

    write_active(&active_file, session.active())
}

/// Interactive loop: each line is one interaction cycle. A failed action is
/// reported and the loop continues.
async fn chat_loop(session: &mut Session, active_file: &Path) -> Result<()> {
    let id = ensure_active(session, active_file)?;
    let conv = session.conversation(&id)?;
    print_conversation(&id, &conv);
    println!();
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        let outcome = match parse_chat_line(&line) {
            ChatInput::Quit => break,
            ChatInput::Empty => continue,
            ChatInput::Help => {
                println!("{HELP}");
                continue;
            }
            ChatInput::Invalid(line) => {
                println!("Unrecognized command: {line} (try /help)");
                continue;
            }
            input => run_chat_input(session, active_file, input).await,
        };

        if let Err(e) = outcome {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

async fn run_chat_input(session: &mut Session, active_file: &Path, input: ChatInput) -> Result<()> {
    ensure_active(session, active_file)?;

    match input {
        ChatInput::Prompt(prompt) => {
            let reply = session.submit(&prompt).await?;
            println!("{reply}");
        }
        ChatInput::Pdf(path) => {
            let bytes = read_file(&path)?;
            let chars = session.attach_pdf(bytes).await?;
            println!("Attached {chars} characters from {}", path.display());
        }
        ChatInput::Image(path) => {
            let bytes = read_file(&path)?;
            session.attach_image(&path.to_string_lossy(), &bytes)?;
            println!("Accepted image {}", path.display());
        }
        ChatInput::Web(query) => {
            let count = session.attach_search(&query).await?;
            println!("Attached {count} web results");
        }
        ChatInput::New => {
            let id = session.new_conversation()?;
            write_active(active_file, Some(&id))?;
            println!("Started conversation {id}");
        }
        ChatInput::Quit | ChatInput::Help | ChatInput::Empty | ChatInput::Invalid(_) => {}
    }

    Ok(())
}
