//! Transcript widget

use crate::theme::Theme;
use crate::widgets::markdown::render_markdown;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

const THINKING_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Who or what produced a transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    /// Local function call and its output
    Tool { name: String, is_error: bool },
    /// Shell notices (command output, help)
    System,
    /// Degraded but continuing, e.g. a file that could not be indexed
    Warning,
    Error,
}

/// One block of the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub content: String,
    /// Reply still arriving
    pub streaming: bool,
    /// Reply stopped before completion
    pub interrupted: bool,
}

impl TranscriptEntry {
    fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            streaming: false,
            interrupted: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(EntryKind::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Assistant, content)
    }

    /// Placeholder for a reply that is being streamed
    pub fn assistant_streaming(content: impl Into<String>) -> Self {
        Self {
            streaming: true,
            ..Self::new(EntryKind::Assistant, content)
        }
    }

    pub fn tool(name: impl Into<String>, content: impl Into<String>, is_error: bool) -> Self {
        Self::new(
            EntryKind::Tool {
                name: name.into(),
                is_error,
            },
            content,
        )
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(EntryKind::System, content)
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Warning, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(EntryKind::Error, content)
    }
}

/// Lay out one entry at the given width. The widget and
/// [`transcript_height`] both go through here so scrolling stays exact.
pub fn render_entry(entry: &TranscriptEntry, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let content_width = width.saturating_sub(2).max(1);

    let (label, style) = match &entry.kind {
        EntryKind::User => ("▶ You".to_string(), theme.accent_bold()),
        EntryKind::Assistant => ("◀ SignBot".to_string(), theme.assistant_bold()),
        EntryKind::Tool { name, is_error } => (
            format!("⚙ {}", name),
            if *is_error {
                theme.error_style()
            } else {
                theme.tool_style()
            },
        ),
        EntryKind::System => ("● System".to_string(), theme.dim_style()),
        EntryKind::Warning => ("▲ Warning".to_string(), theme.warning_style()),
        EntryKind::Error => ("✖ Error".to_string(), theme.error_style()),
    };

    let mut header = vec![Span::styled(label, style)];
    if entry.streaming {
        header.push(Span::styled(" ▌", style));
    }
    if entry.interrupted {
        header.push(Span::styled(
            " (interrupted)",
            theme.warning_style().add_modifier(Modifier::ITALIC),
        ));
    }
    lines.push(Line::from(header));

    let body: Vec<Line<'static>> = match entry.kind {
        EntryKind::Assistant if entry.content.is_empty() && entry.streaming => {
            let frame = thinking_frame();
            vec![Line::from(Span::styled(
                format!("{} thinking...", frame),
                theme.warning_style(),
            ))]
        }
        EntryKind::Assistant => render_markdown(&entry.content, theme, content_width),
        _ => {
            let body_style = match entry.kind {
                EntryKind::Error => theme.error_style(),
                EntryKind::Warning => theme.warning_style(),
                EntryKind::Tool { .. } | EntryKind::System => theme.dim_style(),
                _ => theme.base_style(),
            };
            textwrap::wrap(&entry.content, content_width)
                .into_iter()
                .map(|l| Line::from(Span::styled(l.into_owned(), body_style)))
                .collect()
        }
    };

    for line in body {
        let mut spans = vec![Span::raw("  ")];
        spans.extend(line.spans);
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines
}

fn thinking_frame() -> &'static str {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    THINKING_FRAMES[(millis / 80) as usize % THINKING_FRAMES.len()]
}

/// Total rendered height of the transcript at `width`
pub fn transcript_height(entries: &[TranscriptEntry], theme: &Theme, width: usize) -> usize {
    entries
        .iter()
        .map(|e| render_entry(e, theme, width).len())
        .sum()
}

/// Widget showing the transcript from a scroll offset
pub struct MessageList<'a> {
    entries: &'a [TranscriptEntry],
    theme: &'a Theme,
    scroll: usize,
}

impl<'a> MessageList<'a> {
    pub fn new(entries: &'a [TranscriptEntry], theme: &'a Theme) -> Self {
        Self {
            entries,
            theme,
            scroll: 0,
        }
    }

    /// First visible line
    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }
}

impl Widget for MessageList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let width = area.width as usize;
        let visible: Vec<Line> = self
            .entries
            .iter()
            .flat_map(|e| render_entry(e, self.theme, width))
            .skip(self.scroll)
            .take(area.height as usize)
            .collect();

        Paragraph::new(visible).render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_user_entry_layout() {
        let lines = render_entry(&TranscriptEntry::user("hello"), &Theme::dark(), 40);
        assert_eq!(text(&lines), vec!["▶ You", "  hello", ""]);
    }

    #[test]
    fn test_interrupted_marker() {
        let mut entry = TranscriptEntry::assistant("partial");
        entry.interrupted = true;
        let lines = text(&render_entry(&entry, &Theme::dark(), 40));
        assert!(lines[0].ends_with("(interrupted)"));
    }

    #[test]
    fn test_streaming_placeholder() {
        let lines = text(&render_entry(
            &TranscriptEntry::assistant_streaming(""),
            &Theme::dark(),
            40,
        ));
        assert!(lines[1].contains("thinking"));
    }

    #[test]
    fn test_height_matches_rendered_lines() {
        let theme = Theme::dark();
        let entries = vec![
            TranscriptEntry::user("a question that is long enough to need wrapping at this width"),
            TranscriptEntry::assistant("# Title\n\nSome **bold** text"),
            TranscriptEntry::warning("doc.pdf could not be indexed"),
        ];
        let expected: usize = entries
            .iter()
            .map(|e| render_entry(e, &theme, 24).len())
            .sum();
        assert_eq!(transcript_height(&entries, &theme, 24), expected);
        assert!(
            entries
                .iter()
                .flat_map(|e| render_entry(e, &theme, 24))
                .all(|l| l.width() <= 24)
        );
    }

    #[test]
    fn test_render_into_buffer() {
        let theme = Theme::dark();
        let entries = vec![TranscriptEntry::user("hi"), TranscriptEntry::assistant("there")];
        let area = Rect::new(0, 0, 20, 10);
        let mut buf = Buffer::empty(area);
        MessageList::new(&entries, &theme).scroll(3).render(area, &mut buf);

        let first_row: String = (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert!(first_row.starts_with("◀ SignBot"));
    }
}
