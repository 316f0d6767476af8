//! signbot-tui: terminal widgets for the chat shell
//!
//! Transcript rendering (with markdown for assistant replies), the input box,
//! a status spinner, key mapping and colors. Built on ratatui and crossterm.

pub mod input;
pub mod theme;
pub mod widgets;

pub use theme::Theme;
