//! Status line spinner

use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use std::time::{Duration, Instant};

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Animated spinner followed by a label and the elapsed time
pub struct Spinner<'a> {
    label: &'a str,
    theme: &'a Theme,
    started: Instant,
}

impl<'a> Spinner<'a> {
    pub fn new(label: &'a str, theme: &'a Theme) -> Self {
        Self {
            label,
            theme,
            started: Instant::now(),
        }
    }

    /// Animate relative to when the work began
    pub fn with_start_time(mut self, started: Instant) -> Self {
        self.started = started;
        self
    }

    fn frame_for(elapsed: Duration) -> &'static str {
        let index = (elapsed.as_millis() / FRAME_DURATION.as_millis()) as usize;
        FRAMES[index % FRAMES.len()]
    }
}

impl Widget for Spinner<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 3 || area.height == 0 {
            return;
        }
        let elapsed = self.started.elapsed();
        let line = Line::from(vec![
            Span::styled(
                format!("{} {}", Self::frame_for(elapsed), self.label),
                self.theme.accent_style(),
            ),
            Span::styled(
                format!("  {}s", elapsed.as_secs()),
                self.theme.dim_style(),
            ),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_cycle() {
        assert_eq!(Spinner::frame_for(Duration::ZERO), FRAMES[0]);
        assert_eq!(Spinner::frame_for(Duration::from_millis(85)), FRAMES[1]);
        assert_eq!(
            Spinner::frame_for(FRAME_DURATION * FRAMES.len() as u32),
            FRAMES[0]
        );
    }
}
