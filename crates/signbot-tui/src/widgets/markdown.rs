//! Markdown rendering for assistant replies

use crate::theme::Theme;
use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Convert markdown to styled lines no wider than `width` columns
pub fn render_markdown(text: &str, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![theme.base_style()];
    let mut in_code_block = false;
    let mut code_block = String::new();
    let mut list_depth: usize = 0;

    let flush = |current: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !current.is_empty() {
            lines.extend(wrap_line(Line::from(std::mem::take(current)), width));
        }
    };

    for event in Parser::new(text) {
        let style = style_stack.last().copied().unwrap_or_default();
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { level, .. } => {
                    flush(&mut current, &mut lines);
                    let heading = match level {
                        HeadingLevel::H1 => theme
                            .accent_style()
                            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                        HeadingLevel::H2 => theme.accent_bold(),
                        _ => theme.accent_style(),
                    };
                    style_stack.push(heading);
                }
                Tag::Paragraph => flush(&mut current, &mut lines),
                Tag::CodeBlock(_) => {
                    flush(&mut current, &mut lines);
                    in_code_block = true;
                    code_block.clear();
                }
                Tag::List(_) => list_depth += 1,
                Tag::Item => {
                    flush(&mut current, &mut lines);
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    current.push(Span::styled(format!("{}• ", indent), theme.dim_style()));
                }
                Tag::Emphasis => style_stack.push(style.add_modifier(Modifier::ITALIC)),
                Tag::Strong => style_stack.push(style.add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => style_stack.push(style.add_modifier(Modifier::CROSSED_OUT)),
                Tag::Link { .. } => style_stack.push(
                    Style::default()
                        .fg(theme.link)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                _ => {}
            },
            Event::End(tag_end) => match tag_end {
                TagEnd::Heading(_) => {
                    flush(&mut current, &mut lines);
                    pop_style(&mut style_stack);
                }
                TagEnd::Paragraph => {
                    flush(&mut current, &mut lines);
                    lines.push(Line::from(""));
                }
                TagEnd::CodeBlock => {
                    in_code_block = false;
                    let code_style = theme.code_style().add_modifier(Modifier::DIM);
                    for code_line in code_block.lines() {
                        let shown = truncate_to_width(code_line, width.saturating_sub(2));
                        lines.push(Line::from(Span::styled(format!("  {}", shown), code_style)));
                    }
                    lines.push(Line::from(""));
                }
                TagEnd::List(_) => {
                    list_depth = list_depth.saturating_sub(1);
                    if list_depth == 0 {
                        lines.push(Line::from(""));
                    }
                }
                TagEnd::Item => flush(&mut current, &mut lines),
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    pop_style(&mut style_stack);
                }
                _ => {}
            },
            Event::Text(text) => {
                if in_code_block {
                    code_block.push_str(&text);
                } else {
                    current.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => {
                current.push(Span::styled(
                    format!("`{}`", code),
                    theme.code_style().add_modifier(Modifier::BOLD),
                ));
            }
            Event::SoftBreak => current.push(Span::styled(" ", style)),
            Event::HardBreak => flush(&mut current, &mut lines),
            _ => {}
        }
    }

    flush(&mut current, &mut lines);

    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }

    lines
}

fn pop_style(stack: &mut Vec<Style>) {
    if stack.len() > 1 {
        stack.pop();
    }
}

/// Cut `text` to at most `width` columns, marking the cut with an ellipsis
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Word-wrap a styled line to `width` columns, keeping span styles.
/// Words longer than the width are split.
pub fn wrap_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line];
    }

    let mut out: Vec<Line<'static>> = Vec::new();
    let mut row: Vec<Span<'static>> = Vec::new();
    let mut used = 0;

    for span in line.spans {
        let style = span.style;
        for word in split_keep_spaces(&span.content) {
            let word_width = word.width();
            if used + word_width > width && used > 0 {
                out.push(Line::from(std::mem::take(&mut row)));
                used = 0;
                if word.trim().is_empty() {
                    continue;
                }
            }
            if word_width <= width {
                row.push(Span::styled(word.to_string(), style));
                used += word_width;
                continue;
            }
            // Hard-split an overlong word
            let mut chunk = String::new();
            for c in word.chars() {
                let w = c.width().unwrap_or(0);
                if used + w > width {
                    row.push(Span::styled(std::mem::take(&mut chunk), style));
                    out.push(Line::from(std::mem::take(&mut row)));
                    used = 0;
                }
                chunk.push(c);
                used += w;
            }
            if !chunk.is_empty() {
                row.push(Span::styled(chunk, style));
            }
        }
    }

    if !row.is_empty() {
        out.push(Line::from(row));
    }
    out
}

/// Split into alternating runs of non-space and space characters
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, c) in text.char_indices() {
        let is_space = c == ' ';
        if in_space.is_some_and(|s| s != is_space) {
            parts.push(&text[start..i]);
            start = i;
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        parts.push(&text[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_simple_text() {
        let lines = render_markdown("Hello, world!", &Theme::dark(), 80);
        assert_eq!(plain(&lines), vec!["Hello, world!"]);
    }

    #[test]
    fn test_list_and_code_block() {
        let md = "Steps:\n\n- one\n- two\n\n```\nlet x = 1;\n```";
        let lines = plain(&render_markdown(md, &Theme::dark(), 80));
        assert!(lines.contains(&"• one".to_string()));
        assert!(lines.contains(&"• two".to_string()));
        assert!(lines.contains(&"  let x = 1;".to_string()));
    }

    #[test]
    fn test_unterminated_code_fence_still_shown() {
        let lines = plain(&render_markdown("```\npartial", &Theme::dark(), 80));
        assert_eq!(lines, vec!["  partial"]);
    }

    #[test]
    fn test_lines_respect_width() {
        let md = "The quick brown fox jumps over the lazy dog and keeps running far away";
        let lines = render_markdown(md, &Theme::dark(), 20);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.width() <= 20));
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let line = Line::from("abcdefghijklmnopqrstuvwxyz");
        let wrapped = wrap_line(line, 10);
        assert_eq!(
            plain(&wrapped),
            vec!["abcdefghij", "klmnopqrst", "uvwxyz"]
        );
    }

    #[test]
    fn test_truncate_to_width_multibyte() {
        assert_eq!(truncate_to_width("héllo wörld", 6), "héllo…");
        assert_eq!(truncate_to_width("short", 10), "short");
    }
}
