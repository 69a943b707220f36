use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::review::card::Flashcard;
use crate::ui::layout::wrapped_line_count;
use crate::ui::theme::Theme;

/// The card under the cursor, showing its question or, once flipped, its answer.
pub struct CardView<'a> {
    card: Option<&'a Flashcard>,
    position: Option<usize>,
    total: usize,
    flipped: bool,
    theme: &'a Theme,
}

impl<'a> CardView<'a> {
    pub fn new(card: Option<&'a Flashcard>, flipped: bool, theme: &'a Theme) -> Self {
        Self {
            card,
            position: None,
            total: 0,
            flipped,
            theme,
        }
    }

    pub fn position(mut self, position: Option<usize>, total: usize) -> Self {
        self.position = position;
        self.total = total;
        self
    }
}

impl Widget for CardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let Some(card) = self.card else {
            let block = Block::bordered().border_style(Style::default().fg(colors.border()));
            let inner = block.inner(area);
            block.render(area, buf);
            let top = inner.y + inner.height.saturating_sub(1) / 2;
            let message = Paragraph::new(Line::from(Span::styled(
                "No flashcards yet. Press [a] to add one.",
                Style::default().fg(colors.text_dim()),
            )))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            let height = (inner.y + inner.height).saturating_sub(top);
            message.render(Rect::new(inner.x, top, inner.width, height), buf);
            return;
        };

        let (side, text, bg) = if self.flipped {
            ("Answer", card.answer(), colors.card_back_bg())
        } else {
            ("Question", card.question(), colors.card_front_bg())
        };
        let counter = match self.position {
            Some(p) => format!(" {}/{} ", p + 1, self.total),
            None => String::new(),
        };

        let block = Block::bordered()
            .title(Span::styled(
                format!(" {side} "),
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            ))
            .title_bottom(Line::from(counter).right_aligned())
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(bg));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width < 2 || inner.height == 0 {
            return;
        }

        // Vertically center the wrapped text.
        let text_width = inner.width.saturating_sub(2);
        let lines = wrapped_line_count(text, text_width as usize) as u16;
        let height = lines.min(inner.height);
        let top = inner.y + (inner.height - height) / 2;
        let text_area = Rect::new(inner.x + 1, top, text_width, height);

        Paragraph::new(text)
            .style(Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(text_area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
    }

    fn rendered(card: Option<&Flashcard>, flipped: bool) -> Vec<String> {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 30, 7);
        let mut buf = Buffer::empty(area);
        CardView::new(card, flipped, &theme)
            .position(Some(0), 1)
            .render(area, &mut buf);
        (0..area.height).map(|y| row(&buf, y)).collect()
    }

    #[test]
    fn test_front_and_back() {
        let card = Flashcard::new(Some("k".into()), "2+2", "4");
        let front = rendered(Some(&card), false);
        assert!(front[0].contains("Question"));
        assert!(front.iter().any(|l| l.contains("2+2")));

        let back = rendered(Some(&card), true);
        assert!(back[0].contains("Answer"));
        assert!(back.iter().any(|l| l.contains('4')));
        assert!(back[6].contains("1/1"));
    }

    #[test]
    fn test_empty_collection_hint() {
        let lines = rendered(None, false);
        assert!(lines.iter().any(|l| l.contains("No flashcards")));
    }
}
