//! TUI implementation for signbot

use tokio::sync::mpsc;

use crossterm::event::{Event, EventStream, MouseEventKind};
use futures::StreamExt;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};
use signbot_core::{Attachment, ChatEngine, ChatEvent, ChatHandle};
use signbot_tui::{
    Theme,
    input::{Action, event_to_action},
    widgets::{EntryKind, InputBox, MessageList, Spinner, TranscriptEntry, transcript_height},
};
use std::path::PathBuf;
use std::time::Instant;

use crate::commands::{CommandResult, attached_message, execute_command};
use crate::utils::{file_label, truncate_chars};

const BUSY_STATUS: &str = "Still answering; wait for the reply or press Esc to stop it";

/// Messages sent from UI to the chat loop
#[derive(Debug)]
pub enum UiMessage {
    /// User submitted a question
    Submit(String),
    /// Slash command
    Command(String),
    /// Ctrl+L
    NewConversation,
    /// User requested quit
    Quit,
}

/// TUI application state
pub struct TuiState {
    entries: Vec<TranscriptEntry>,
    input: InputBox,
    /// First visible transcript line; `usize::MAX` follows the bottom
    scroll: usize,
    is_processing: bool,
    status: String,
    theme: Theme,
    /// Shown in the title bar
    assistant_name: String,
    /// File to send with the next question
    attachment: Option<PathBuf>,
    handle: ChatHandle,
    ui_tx: mpsc::Sender<UiMessage>,
    spinner_start: Instant,
}

impl TuiState {
    pub fn new(
        assistant_name: impl Into<String>,
        handle: ChatHandle,
        ui_tx: mpsc::Sender<UiMessage>,
    ) -> Self {
        let mut input = InputBox::new().with_placeholder("Type a message... (/help for commands)");
        input.set_focused(true);

        Self {
            entries: vec![],
            input,
            scroll: 0,
            is_processing: false,
            status: "Ready".to_string(),
            theme: Theme::dark(),
            assistant_name: assistant_name.into(),
            attachment: None,
            handle,
            ui_tx,
            spinner_start: Instant::now(),
        }
    }

    /// Show the question and a placeholder for the reply
    pub fn begin_turn(&mut self, query: &str, filename: Option<&str>) {
        let content = match filename {
            Some(name) => format!("{}\n📎 {}", query, name),
            None => query.to_string(),
        };
        self.entries.push(TranscriptEntry::user(content));
        self.entries.push(TranscriptEntry::assistant_streaming(""));
        self.is_processing = true;
        self.spinner_start = Instant::now();
        self.status = "Thinking...".to_string();
        self.scroll_to_bottom();
    }

    /// Handle chat events
    pub fn handle_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::TurnStart { .. } => {
                self.is_processing = true;
            }
            ChatEvent::Warning { message } => {
                self.push_before_reply(TranscriptEntry::warning(message));
            }
            ChatEvent::FileIndexed { filename, .. } => {
                self.status = format!("Indexed {}", filename);
                self.push_before_reply(TranscriptEntry::system(format!(
                    "Indexed {} for this conversation",
                    filename
                )));
            }
            ChatEvent::ReplyUpdate { text } => {
                match self.streaming_reply() {
                    Some(entry) => entry.content = text,
                    None => self.entries.push(TranscriptEntry::assistant_streaming(text)),
                }
                self.status = "Answering...".to_string();
                self.scroll_to_bottom();
            }
            ChatEvent::ToolCallStart { tool_name, .. } => {
                self.status = format!("Running {}...", tool_name);
            }
            ChatEvent::ToolCallEnd {
                tool_name,
                output,
                is_error,
                ..
            } => {
                self.push_before_reply(TranscriptEntry::tool(
                    tool_name,
                    truncate_chars(&output, 200),
                    is_error,
                ));
            }
            ChatEvent::ReplyEnd { text, interrupted } => {
                if self.streaming_reply().is_none() {
                    self.entries.push(TranscriptEntry::assistant_streaming(""));
                }
                if let Some(entry) = self.streaming_reply() {
                    entry.content = text;
                    entry.streaming = false;
                    entry.interrupted = interrupted;
                }
                self.scroll_to_bottom();
            }
            ChatEvent::Error { message } => {
                self.status = format!("Error: {}", truncate_chars(&message, 60));
                self.entries.push(TranscriptEntry::error(message));
                self.scroll_to_bottom();
            }
            ChatEvent::TurnEnd => {
                self.is_processing = false;
                // A turn that failed before the run started leaves its placeholder behind
                self.entries
                    .retain(|e| !(e.streaming && e.content.is_empty()));
                for entry in &mut self.entries {
                    entry.streaming = false;
                }
                if !self.status.starts_with("Error") {
                    self.status = "Ready".to_string();
                }
            }
        }
    }

    /// Apply every event already queued
    pub fn drain_chat_events(&mut self, chat_rx: &mut mpsc::UnboundedReceiver<ChatEvent>) {
        while let Ok(event) = chat_rx.try_recv() {
            self.handle_chat_event(event);
        }
    }

    fn streaming_reply(&mut self) -> Option<&mut TranscriptEntry> {
        self.entries
            .iter_mut()
            .rev()
            .find(|e| e.streaming && e.kind == EntryKind::Assistant)
    }

    /// Tool output and notices go above the reply they belong to
    fn push_before_reply(&mut self, entry: TranscriptEntry) {
        match self.entries.iter().rposition(|e| e.streaming) {
            Some(pos) => self.entries.insert(pos, entry),
            None => self.entries.push(entry),
        }
        self.scroll_to_bottom();
    }

    fn scroll_to_bottom(&mut self) {
        // Will be calculated during render based on content height
        self.scroll = usize::MAX;
    }

    fn scroll_mouse(&mut self, kind: MouseEventKind) {
        match kind {
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(3),
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(3),
            _ => {}
        }
    }

    /// Show a system message
    pub fn show_system_message(&mut self, content: &str) {
        self.entries.push(TranscriptEntry::system(content));
        self.scroll_to_bottom();
    }

    pub fn show_error(&mut self, content: &str) {
        self.entries.push(TranscriptEntry::error(content));
        self.scroll_to_bottom();
    }

    pub fn set_attachment(&mut self, path: Option<PathBuf>) {
        self.input
            .set_attachment(path.as_deref().map(file_label));
        self.attachment = path;
    }

    pub fn take_attachment(&mut self) -> Option<PathBuf> {
        self.input.set_attachment(None);
        self.attachment.take()
    }

    /// Forget the transcript after a new conversation was started
    pub fn reset_transcript(&mut self) {
        self.entries.clear();
        self.scroll = 0;
        self.status = "Ready".to_string();
    }

    fn abort(&mut self) {
        self.handle.abort();
        self.status = "Stopping...".to_string();
    }

    /// Handle keyboard action. Returns false when the app should exit.
    pub async fn handle_action(&mut self, action: Action, width: u16) -> bool {
        match action {
            Action::Submit => {
                if self.input.content().trim().is_empty() {
                    return true;
                }
                if self.is_processing {
                    self.status = BUSY_STATUS.to_string();
                    return true;
                }
                let content = self.input.take_submission();
                let msg = if content.trim_start().starts_with('/') {
                    UiMessage::Command(content)
                } else {
                    UiMessage::Submit(content)
                };
                let _ = self.ui_tx.send(msg).await;
                true
            }
            Action::Quit => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::Interrupt => {
                if self.is_processing {
                    self.abort();
                    true
                } else {
                    let _ = self.ui_tx.send(UiMessage::Quit).await;
                    false
                }
            }
            Action::Escape => {
                if self.is_processing {
                    self.abort();
                }
                true
            }
            Action::Eof if self.input.content().is_empty() && !self.is_processing => {
                let _ = self.ui_tx.send(UiMessage::Quit).await;
                false
            }
            Action::NewConversation => {
                if self.is_processing {
                    self.status = BUSY_STATUS.to_string();
                } else {
                    let _ = self.ui_tx.send(UiMessage::NewConversation).await;
                }
                true
            }
            Action::Detach => {
                if let Some(path) = self.take_attachment() {
                    self.status = format!("Dropped {}", file_label(&path));
                }
                true
            }
            Action::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                true
            }
            Action::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
                true
            }
            _ => {
                self.input.handle_action(&action, width);
                true
            }
        }
    }

    /// Render the UI
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        // Layout: transcript (flex), status bar (1), input (3)
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(size);

        self.render_transcript(frame, chunks[0]);
        self.render_status(frame, chunks[1]);
        self.input
            .render(chunks[2], frame.buffer_mut(), &self.theme);
    }

    fn render_transcript(&mut self, frame: &mut Frame, area: Rect) {
        let title = format!(" SignBot │ {} ", self.assistant_name);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title(title);

        let inner = block.inner(area);
        frame.render_widget(block, area);

        if inner.height == 0 || self.entries.is_empty() {
            let welcome = Paragraph::new(vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled("  SignBot", self.theme.accent_bold()),
                    Span::styled(
                        format!("  chatting with {}", self.assistant_name),
                        self.theme.dim_style(),
                    ),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    "  Ask a question, or /attach a PDF, DOC, DOCX, TXT or MD file to ask about it.",
                    self.theme.base_style(),
                )),
                Line::from(Span::styled(
                    "  /help lists commands. Esc stops a reply, Ctrl+C quits.",
                    self.theme.dim_style(),
                )),
            ]);
            frame.render_widget(welcome, inner);
            return;
        }

        let content_height = transcript_height(&self.entries, &self.theme, inner.width as usize);

        if self.scroll == usize::MAX {
            self.scroll = content_height.saturating_sub(inner.height as usize);
        } else {
            self.scroll = self
                .scroll
                .min(content_height.saturating_sub(inner.height as usize));
        }

        let list = MessageList::new(&self.entries, &self.theme).scroll(self.scroll);
        frame.render_widget(list, inner);

        if content_height > inner.height as usize {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"))
                .track_symbol(Some("│"))
                .thumb_symbol("█");

            let mut scrollbar_state = ScrollbarState::new(content_height)
                .position(self.scroll)
                .viewport_content_length(inner.height as usize);

            frame.render_stateful_widget(scrollbar, inner, &mut scrollbar_state);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        if self.is_processing {
            let spinner =
                Spinner::new(&self.status, &self.theme).with_start_time(self.spinner_start);
            frame.render_widget(spinner, area);
            return;
        }

        let left_content = format!("{} │ {}", self.assistant_name, self.status);
        let right_content = "/help │ Ctrl+L: new │ Ctrl+X: detach │ Ctrl+C: quit";

        let left_width = left_content.chars().count();
        let right_width = right_content.chars().count();
        let available = area.width as usize;

        let line = if left_width + right_width + 2 <= available {
            let spacing = available - left_width - right_width;
            Line::from(vec![
                Span::styled(&left_content, self.theme.dim_style()),
                Span::raw(" ".repeat(spacing)),
                Span::styled(right_content, Style::default().fg(Color::DarkGray)),
            ])
        } else {
            Line::from(Span::styled(&left_content, self.theme.dim_style()))
        };

        frame.render_widget(Paragraph::new(line), area);
    }
}

type Term = ratatui::Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>;

fn restore_terminal(terminal: &mut Term) -> std::io::Result<()> {
    use crossterm::{
        event::{DisableBracketedPaste, DisableMouseCapture},
        execute,
        terminal::{LeaveAlternateScreen, disable_raw_mode},
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()
}

/// Run the TUI application
pub async fn run_tui(
    engine: &mut ChatEngine,
    assistant_name: &str,
    max_upload_bytes: u64,
    initial_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    use crossterm::{
        event::{EnableBracketedPaste, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, enable_raw_mode},
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal: Term = ratatui::Terminal::new(backend)?;

    let (ui_tx, mut ui_rx) = mpsc::channel::<UiMessage>(32);
    let mut state = TuiState::new(assistant_name, engine.handle(), ui_tx);
    if let Some(path) = initial_file {
        state.show_system_message(&attached_message(&path));
        state.set_attachment(Some(path));
    }

    let mut chat_rx = engine.subscribe();
    let mut event_stream = EventStream::new();

    // Tick interval for animations (80ms for smooth spinner)
    let mut tick_interval = tokio::time::interval(std::time::Duration::from_millis(80));

    // Question waiting to be sent, picked up at the top of the loop
    let mut pending: Option<(String, Option<Attachment>)> = None;

    let result = loop {
        if let Some((content, attachment)) = pending.take() {
            state.begin_turn(
                &content,
                attachment.as_ref().map(|a| a.filename.as_str()),
            );

            let mut submit_future = std::pin::pin!(engine.submit(&content, attachment));

            // Poll the turn alongside input until it completes
            loop {
                terminal.draw(|frame| state.render(frame))?;
                let area_width = terminal.size()?.width;

                tokio::select! {
                    biased;

                    result = &mut submit_future => {
                        if let Err(e) = result {
                            tracing::debug!(interrupted = e.is_interrupted(), "turn ended with error: {}", e);
                        }
                        break;
                    }

                    Some(chat_event) = chat_rx.recv() => {
                        state.handle_chat_event(chat_event);
                        state.drain_chat_events(&mut chat_rx);
                    }

                    event = event_stream.next() => {
                        match event {
                            Some(Ok(Event::Mouse(mouse))) => state.scroll_mouse(mouse.kind),
                            Some(Ok(event)) => {
                                if let Some(action) = event_to_action(event) {
                                    if !state.handle_action(action, area_width).await {
                                        restore_terminal(&mut terminal)?;
                                        return Ok(());
                                    }
                                }
                            }
                            Some(Err(_)) | None => {
                                restore_terminal(&mut terminal)?;
                                return Ok(());
                            }
                        }
                    }

                    _ = tick_interval.tick() => {}
                }
            }

            // Drain any remaining events after the turn completes
            state.drain_chat_events(&mut chat_rx);

            terminal.draw(|frame| state.render(frame))?;
            continue;
        }

        terminal.draw(|frame| state.render(frame))?;
        let area_width = terminal.size()?.width;

        tokio::select! {
            biased;

            Some(chat_event) = chat_rx.recv() => {
                state.handle_chat_event(chat_event);
                state.drain_chat_events(&mut chat_rx);
            }

            event = event_stream.next() => {
                match event {
                    Some(Ok(Event::Mouse(mouse))) => state.scroll_mouse(mouse.kind),
                    Some(Ok(event)) => {
                        if let Some(action) = event_to_action(event) {
                            if !state.handle_action(action, area_width).await {
                                break Ok(());
                            }
                        }
                    }
                    Some(Err(e)) => {
                        break Err(anyhow::anyhow!("Event error: {}", e));
                    }
                    None => {
                        break Ok(());
                    }
                }
            }

            _ = tick_interval.tick() => {}

            msg = ui_rx.recv() => {
                match msg {
                    Some(UiMessage::Submit(content)) => {
                        let attachment = match state.take_attachment() {
                            Some(path) => match Attachment::from_path(&path, max_upload_bytes).await {
                                Ok(attachment) => Some(attachment),
                                Err(e) => {
                                    state.show_error(&format!("{}\nThe message was not sent.", e));
                                    continue;
                                }
                            },
                            None => None,
                        };
                        pending = Some((content, attachment));
                    }
                    Some(UiMessage::Command(cmd)) => {
                        match execute_command(&cmd, engine.session()) {
                            Some(CommandResult::Message(msg)) => {
                                state.show_system_message(&msg);
                            }
                            Some(CommandResult::Attach(path)) => {
                                state.show_system_message(&attached_message(&path));
                                state.set_attachment(Some(path));
                            }
                            Some(CommandResult::Detach) => {
                                match state.take_attachment() {
                                    Some(path) => state.show_system_message(&format!("Dropped {}", file_label(&path))),
                                    None => state.show_system_message("Nothing is attached."),
                                }
                            }
                            Some(CommandResult::NewConversation) => {
                                engine.new_conversation().await;
                                state.reset_transcript();
                                state.show_system_message("Started a new conversation.");
                            }
                            Some(CommandResult::Exit) => {
                                break Ok(());
                            }
                            Some(CommandResult::Unknown(cmd)) => {
                                state.show_system_message(&format!("Unknown command: /{}\nType /help for available commands.", cmd));
                            }
                            None => {}
                        }
                    }
                    Some(UiMessage::NewConversation) => {
                        engine.new_conversation().await;
                        state.reset_transcript();
                        state.show_system_message("Started a new conversation.");
                    }
                    Some(UiMessage::Quit) | None => {
                        break Ok(());
                    }
                }
            }
        }
    };

    restore_terminal(&mut terminal)?;

    result
}
