use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::session::forms::Alert;
use crate::ui::theme::Theme;

/// Modal message box. Input is blocked until it is dismissed.
pub struct AlertDialog<'a> {
    pub alert: &'a Alert,
    pub theme: &'a Theme,
}

impl Widget for AlertDialog<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let (title, accent) = match self.alert {
            Alert::Info(_) => (" Notice ", colors.success()),
            Alert::Error(_) => (" Error ", colors.error()),
        };

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(Span::styled(
                title,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let lines = vec![
            Line::from(Span::styled(
                self.alert.message().to_string(),
                Style::default().fg(colors.fg()),
            )),
            Line::from(""),
            Line::from(Span::styled("[Enter] OK", Style::default().fg(colors.text_dim()))),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}
