//! Line parsing for the interactive chat loop.

use std::path::PathBuf;

/// What a line typed into `thinkr chat` asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    /// Send to the model.
    Prompt(String),
    /// `/pdf <path>`
    Pdf(PathBuf),
    /// `/image <path>`
    Image(PathBuf),
    /// `/web <query>`
    Web(String),
    /// `/new`
    New,
    /// `/quit` or `/exit`
    Quit,
    /// `/help`
    Help,
    /// Blank line.
    Empty,
    /// A slash command that needs an argument it did not get, or is unknown.
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /pdf <path>     attach the text of a PDF
  /image <path>   attach an image
  /web <query>    attach web search results
  /new            start a new conversation
  /quit           leave
Anything else is sent to the model.";

/// Parse one input line.
pub fn parse_chat_line(line: &str) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Prompt(line.to_string());
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(n, a)| (n, a.trim()));

    match (name, arg) {
        ("quit" | "exit", _) => ChatInput::Quit,
        ("new", _) => ChatInput::New,
        ("help", _) => ChatInput::Help,
        ("pdf", path) if !path.is_empty() => ChatInput::Pdf(PathBuf::from(path)),
        ("image", path) if !path.is_empty() => ChatInput::Image(PathBuf::from(path)),
        ("web", query) if !query.is_empty() => ChatInput::Web(query.to_string()),
        _ => ChatInput::Invalid(line.to_string()),
    }
}
