use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::review::state::ReviewState;
use crate::ui::theme::Theme;

const QUESTION_PREVIEW: usize = 30;
const ANSWER_PREVIEW: usize = 50;

/// Shortens `text` to `max` chars, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max).collect();
        format!("{kept}...")
    }
}

/// The whole collection, one entry per card. The card under the review cursor
/// is marked, and `selected` is the row the sidebar's own cursor is on.
pub struct StackSidebar<'a> {
    state: &'a ReviewState,
    selected: usize,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> StackSidebar<'a> {
    pub fn new(state: &'a ReviewState, selected: usize, focused: bool, theme: &'a Theme) -> Self {
        Self {
            state,
            selected,
            focused,
            theme,
        }
    }
}

impl Widget for StackSidebar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let block = Block::bordered()
            .title(format!(" Flashcards ({}) ", self.state.len()))
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 {
            return;
        }
        if self.state.is_empty() {
            Paragraph::new(Span::styled(
                " Nothing here yet",
                Style::default().fg(colors.text_dim()),
            ))
            .render(inner, buf);
            return;
        }

        // Two rows per card; keep the selected row on screen.
        let per_page = (inner.height as usize / 2).max(1);
        let first = self.selected.saturating_sub(per_page - 1);
        let active = self.state.cursor();

        let mut lines = Vec::new();
        for (i, card) in self.state.cards().enumerate().skip(first).take(per_page) {
            let is_selected = self.focused && i == self.selected;
            let is_active = active == Some(i);
            let marker = if is_active { "▶ " } else { "  " };
            let row_style = if is_selected {
                Style::default().bg(colors.selected_bg())
            } else {
                Style::default()
            };
            let q_style = row_style
                .fg(if is_active { colors.accent() } else { colors.fg() })
                .add_modifier(Modifier::BOLD);
            lines.push(Line::from(vec![
                Span::styled(marker, row_style.fg(colors.accent())),
                Span::styled(truncate(card.question(), QUESTION_PREVIEW), q_style),
            ]));
            lines.push(Line::from(Span::styled(
                format!("  {}", truncate(card.answer(), ANSWER_PREVIEW)),
                row_style.fg(colors.text_dim()),
            )));
        }
        Paragraph::new(lines).render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::card::Flashcard;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate(&"x".repeat(31), 30), format!("{}...", "x".repeat(30)));
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_marks_active_card() {
        let mut state = ReviewState::new();
        state.load(vec![
            Flashcard::new(Some("a".into()), "first q", "first a"),
            Flashcard::new(Some("b".into()), "second q", "second a"),
        ]);
        state.next();

        let theme = Theme::default();
        let area = Rect::new(0, 0, 30, 8);
        let mut buf = Buffer::empty(area);
        StackSidebar::new(&state, 0, true, &theme).render(area, &mut buf);
        let rows: Vec<String> = (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol()).collect())
            .collect();

        assert!(rows[0].contains("Flashcards (2)"));
        let second = rows.iter().find(|r| r.contains("second q")).unwrap();
        assert!(second.contains('▶'));
        let first = rows.iter().find(|r| r.contains("first q")).unwrap();
        assert!(!first.contains('▶'));
    }
}
