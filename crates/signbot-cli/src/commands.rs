//! Slash commands for interactive mode

use signbot_core::Session;
use std::path::PathBuf;

use crate::utils::{check_extension, file_label};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the assistant)
    Message(String),
    /// Send this file with the next message
    Attach(PathBuf),
    /// Forget the pending file
    Detach,
    /// Drop history and remote thread
    NewConversation,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, session: &Session) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "attach" | "a" => attach(args),

        "detach" => CommandResult::Detach,

        "new" | "clear" | "c" => CommandResult::NewConversation,

        "thread" | "t" => CommandResult::Message(thread_summary(session)),

        "quit" | "exit" | "q" => CommandResult::Exit,

        _ => CommandResult::Unknown(command),
    })
}

fn attach(args: &str) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Message("Usage: /attach <path>".to_string());
    }
    let path = PathBuf::from(args);
    if let Err(msg) = check_extension(&path) {
        return CommandResult::Message(msg);
    }
    if !path.is_file() {
        return CommandResult::Message(format!("No such file: {}", path.display()));
    }
    CommandResult::Attach(path)
}

/// Describe the session's remote state
pub fn thread_summary(session: &Session) -> String {
    let mut lines = vec![format!("Session: {}", session.id())];
    match session.thread_id() {
        Some(id) => lines.push(format!("Thread: {}", id)),
        None => lines.push("Thread: none yet (opened with the first message)".to_string()),
    }
    if let Some(id) = session.vector_store_id() {
        lines.push(format!(
            "Index: {} (upload #{})",
            id,
            session.upload_generation()
        ));
    }
    lines.push(format!("Turns: {}", session.conversation().len()));
    lines.join("\n")
}

/// Text shown after a successful `/attach`
pub fn attached_message(path: &std::path::Path) -> String {
    format!(
        "Attached {}; it will be indexed with your next message.",
        file_label(path)
    )
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?        Show this help message
  /attach, /a <path>   Send a PDF, DOC, DOCX, TXT or MD file with the next message
  /detach              Drop the pending attachment
  /new, /clear, /c     Start a new conversation
  /thread, /t          Show the current thread and index
  /exit, /quit, /q     Exit

Keys:
  Enter                Send
  Esc, Ctrl+C          Stop the reply in progress (Ctrl+C quits when idle)
  Ctrl+L               New conversation
  Ctrl+X               Drop the pending attachment
  PgUp/PgDn            Scroll"#
        .to_string()
}
