use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DraftField {
    #[default]
    Question,
    Answer,
}

impl DraftField {
    pub fn toggle(self) -> Self {
        match self {
            DraftField::Question => DraftField::Answer,
            DraftField::Answer => DraftField::Question,
        }
    }
}

/// Popup for adding a card, or updating one when `editing` is set.
pub struct DraftForm<'a> {
    pub question: &'a LineInput,
    pub answer: &'a LineInput,
    pub focus: DraftField,
    pub editing: bool,
    pub theme: &'a Theme,
}

impl DraftForm<'_> {
    fn field(&self, label: &str, input: &LineInput, field: DraftField) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let focused = self.focus == field;
        let label_style = if focused {
            Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.text_dim())
        };
        let text_style = Style::default().fg(colors.fg());
        let (before, cursor, after) = input.render_parts();

        let mut spans = vec![Span::raw("  "), Span::styled(before.to_string(), text_style)];
        match (focused, cursor) {
            (true, ch) => spans.push(Span::styled(
                ch.unwrap_or(' ').to_string(),
                Style::default().fg(colors.bg()).bg(colors.fg()),
            )),
            (false, Some(ch)) => spans.push(Span::styled(ch.to_string(), text_style)),
            (false, None) => {}
        }
        spans.push(Span::styled(after.to_string(), text_style));

        vec![
            Line::from(Span::styled(format!(" {label}"), label_style)),
            Line::from(spans),
        ]
    }
}

impl Widget for DraftForm<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        Clear.render(area, buf);

        let title = if self.editing {
            " Edit Flashcard "
        } else {
            " New Flashcard "
        };
        let block = Block::bordered()
            .title(title)
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);

        Paragraph::new(self.field("Question", self.question, DraftField::Question))
            .render(layout[0], buf);
        Paragraph::new(self.field("Answer", self.answer, DraftField::Answer))
            .render(layout[1], buf);

        let action = if self.editing {
            "[Enter] Update Flashcard"
        } else {
            "[Enter] Add Flashcard"
        };
        Paragraph::new(Line::from(vec![
            Span::styled(
                action,
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   [Esc] Cancel", Style::default().fg(colors.text_dim())),
        ]))
        .alignment(Alignment::Center)
        .render(layout[2], buf);
    }
}
