//! signbot - chat with a hosted assistant from the terminal

mod commands;
mod config;
mod ui;
mod utils;

use anyhow::Context;
use clap::Parser;
use signbot_assistants::{AssistantPlatform, platform::openai::OpenAIAssistants};
use signbot_core::{
    Attachment, ChatConfig, ChatEngine, ChatEvent, ChatHandle, DEFAULT_RUN_TIMEOUT,
    tools::default_registry,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandResult, attached_message, execute_command};
use crate::config::Config;

/// signbot - chat with a hosted assistant
#[derive(Parser, Debug)]
#[command(name = "signbot")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Assistant id (or SIGNBOT_ASSISTANT_ID)
    #[arg(short, long)]
    assistant: Option<String>,

    /// API key (or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Platform base URL (or OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// File to index with the first message (pdf, doc, docx, txt, md)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Seconds to wait for one reply, tool calls included
    #[arg(long)]
    run_timeout: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Log file used in TUI mode
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

fn init_tracing(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("signbot=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    match log_file {
        // Keep log lines off the TUI screen
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = Config::load();

    let use_tui = args.command.is_none() && !args.no_tui && cfg.tui.unwrap_or(true);
    let log_file = use_tui.then(|| {
        args.log_file
            .clone()
            .or_else(|| cfg.log_file.as_ref().map(PathBuf::from))
            .unwrap_or_else(Config::default_log_path)
    });
    init_tracing(args.verbose, log_file.as_deref())?;

    let Some(api_key) = cfg.resolve_api_key(args.api_key) else {
        eprintln!("Error: No API key found");
        eprintln!();
        eprintln!("Set your API key with: export OPENAI_API_KEY=your-key");
        eprintln!("Or add it to config file: signbot --init-config");
        std::process::exit(1);
    };

    let Some(assistant_id) = cfg.resolve_assistant_id(args.assistant) else {
        eprintln!("Error: No assistant configured");
        eprintln!();
        eprintln!("Pass one with: signbot --assistant asst_...");
        eprintln!("Or set SIGNBOT_ASSISTANT_ID, or assistant_id in the config file");
        std::process::exit(1);
    };

    if let Some(ref path) = args.file {
        if let Err(msg) = utils::check_extension(path) {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
    }

    let mut platform = OpenAIAssistants::new(api_key);
    if let Some(base_url) = cfg.resolve_base_url(args.base_url) {
        platform = platform.with_base_url(base_url);
    }

    let assistant = match platform.retrieve_assistant(&assistant_id).await {
        Ok(assistant) => assistant,
        Err(e) => {
            eprintln!("Error: Could not load assistant {}: {}", assistant_id, e);
            if e.is_auth() {
                eprintln!("Check that OPENAI_API_KEY is valid.");
            }
            std::process::exit(1);
        }
    };
    let assistant_name = assistant.display_name().to_string();
    tracing::info!(assistant = %assistant.id, model = ?assistant.model, "assistant loaded");

    let run_timeout = args
        .run_timeout
        .or(cfg.run_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RUN_TIMEOUT);
    let config = ChatConfig::new(assistant.id).with_run_timeout(run_timeout);
    let registry = default_registry(cfg.location_endpoint());
    let mut engine = ChatEngine::new(config, Arc::new(platform), registry);
    tracing::debug!(tools = ?engine.tool_names(), "tools registered");

    // Non-interactive mode
    if let Some(command) = args.command {
        let attachment = match args.file {
            Some(path) => match Attachment::from_path(&path, cfg.max_upload_bytes()).await {
                Ok(attachment) => Some(attachment),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            None => None,
        };
        if run_command(&mut engine, &command, attachment).await.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    // TUI mode
    if use_tui {
        return ui::run_tui(&mut engine, &assistant_name, cfg.max_upload_bytes(), args.file).await;
    }

    // Interactive mode (simple stdin/stdout)
    run_interactive(&mut engine, &assistant_name, cfg.max_upload_bytes(), args.file).await
}

/// Print a turn's events as they arrive, until the turn ends
async fn print_events(mut receiver: mpsc::UnboundedReceiver<ChatEvent>) {
    let is_tty = std::io::IsTerminal::is_terminal(&io::stdout());
    let mut printed = 0;

    while let Some(event) = receiver.recv().await {
        let last = event.is_terminal();
        match event {
            ChatEvent::ReplyUpdate { text } => {
                // Use chars for proper Unicode handling
                let new_text: String = text.chars().skip(printed).collect();
                if !new_text.is_empty() {
                    print!("{}", new_text);
                    io::stdout().flush().ok();
                    printed += new_text.chars().count();
                }
            }
            ChatEvent::ReplyEnd { text, interrupted } => {
                let rest: String = text.chars().skip(printed).collect();
                println!("{}", rest);
                if interrupted {
                    println!("[reply interrupted]");
                }
                printed = 0;
            }
            ChatEvent::ToolCallStart { tool_name, .. } => {
                if is_tty {
                    print!("[{}...", tool_name);
                    io::stdout().flush().ok();
                }
            }
            ChatEvent::ToolCallEnd {
                output, is_error, ..
            } => {
                if is_tty {
                    let preview = utils::truncate_chars(&output, 60).replace('\n', " ");
                    if is_error {
                        println!(" error: {}]", preview);
                    } else {
                        println!(" {}]", preview);
                    }
                }
            }
            ChatEvent::FileIndexed { filename, .. } => {
                eprintln!("[indexed {}]", filename);
            }
            ChatEvent::Warning { message } => {
                eprintln!("Warning: {}", message);
            }
            ChatEvent::Error { message } => {
                eprintln!("\nError: {}", message);
            }
            ChatEvent::TurnStart { .. } | ChatEvent::TurnEnd => {}
        }
        if last {
            break;
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// The reply in progress was stopped
    Stopped,
    Quit,
}

/// Ctrl+C stops the reply in progress, or quits when there is none
fn interrupt(handle: &ChatHandle) -> Interrupt {
    if handle.is_running() {
        handle.abort();
        Interrupt::Stopped
    } else {
        Interrupt::Quit
    }
}

async fn run_command(
    engine: &mut ChatEngine,
    command: &str,
    attachment: Option<Attachment>,
) -> signbot_core::Result<String> {
    let printer = tokio::spawn(print_events(engine.subscribe()));
    let result = engine.submit(command, attachment).await;
    let _ = printer.await;
    result
}

async fn run_interactive(
    engine: &mut ChatEngine,
    assistant_name: &str,
    max_upload_bytes: u64,
    initial_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut pending_file = initial_file;

    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("signbot ({})  /help for commands, Ctrl+D to exit", assistant_name);
        if let Some(ref path) = pending_file {
            eprintln!("{}", attached_message(path));
        }
        eprintln!();
    }

    let handle = engine.handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt(&handle) == Interrupt::Quit {
                println!();
                std::process::exit(130);
            }
        }
    });

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(result) = execute_command(input, engine.session()) {
            match result {
                CommandResult::Message(msg) => println!("{}", msg),
                CommandResult::Attach(path) => {
                    println!("{}", attached_message(&path));
                    pending_file = Some(path);
                }
                CommandResult::Detach => match pending_file.take() {
                    Some(path) => println!("Dropped {}", utils::file_label(&path)),
                    None => println!("Nothing is attached."),
                },
                CommandResult::NewConversation => {
                    engine.new_conversation().await;
                    println!("Started a new conversation.");
                }
                CommandResult::Exit => break,
                CommandResult::Unknown(cmd) => {
                    println!("Unknown command: /{}", cmd);
                    println!("Type /help for available commands.");
                }
            }
            println!();
            continue;
        }

        let attachment = match pending_file.take() {
            Some(path) => match Attachment::from_path(&path, max_upload_bytes).await {
                Ok(attachment) => Some(attachment),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!("The message was not sent.");
                    continue;
                }
            },
            None => None,
        };

        println!();
        let _ = run_command(engine, input, attachment).await;
        println!();
    }

    Ok(())
}
