use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::components::centered_rect;

const POPUP_WIDTH_PCT: u16 = 80;
const POPUP_HEIGHT_PCT: u16 = 80;

/// Focused full-text view of one task's output.
///
/// Single instance: opening while open replaces the content.
#[derive(Debug, Default)]
pub struct DetailOverlay {
    content: Option<String>,
    scroll: u16,
}

impl DetailOverlay {
    pub fn open(&mut self, text: &str) {
        self.content = Some(text.to_string());
        self.scroll = 0;
    }

    pub fn close(&mut self) {
        self.content = None;
        self.scroll = 0;
    }

    pub fn is_open(&self) -> bool {
        self.content.is_some()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn scroll(&self) -> u16 {
        self.scroll
    }

    /// Returns `true` when the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if !self.is_open() {
            return false;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => self.close(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(10),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::Char('g') => self.scroll = 0,
            _ => {}
        }
        true
    }

    /// Area the overlay occupies inside `screen`.
    pub fn popup_area(screen: Rect) -> Rect {
        centered_rect(POPUP_WIDTH_PCT, POPUP_HEIGHT_PCT, screen)
    }

    /// A click outside the content area closes the overlay. Returns `true`
    /// when the click was consumed.
    pub fn handle_click(&mut self, column: u16, row: u16, screen: Rect) -> bool {
        if !self.is_open() {
            return false;
        }
        let popup = Self::popup_area(screen);
        if !popup.contains(Position::new(column, row)) {
            self.close();
        }
        true
    }

    pub fn render(&self, frame: &mut Frame, screen: Rect) {
        let Some(content) = self.content.as_deref() else {
            return;
        };
        let popup = Self::popup_area(screen);
        frame.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Task Output ")
            .title_bottom(Line::from(" [Esc] close ").right_aligned())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let paragraph = Paragraph::new(content)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0));
        frame.render_widget(paragraph, popup);
    }
}
