use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::{Block, Widget};

use crate::ui::theme::Theme;

/// "N of M cards viewed" bar under the card pane.
pub struct ProgressBar<'a> {
    pub viewed: usize,
    pub total: usize,
    pub theme: &'a Theme,
}

impl<'a> ProgressBar<'a> {
    pub fn new(viewed: usize, total: usize, theme: &'a Theme) -> Self {
        Self {
            viewed: viewed.min(total),
            total,
            theme,
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.viewed as f64 / self.total as f64
        }
    }

    pub fn label(&self) -> String {
        format!("{} of {} cards viewed", self.viewed, self.total)
    }
}

impl Widget for ProgressBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Progress ")
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let filled_width = (self.ratio() * inner.width as f64) as u16;
        for x in inner.x..inner.x + inner.width {
            let style = if x < inner.x + filled_width {
                Style::default().bg(colors.bar_filled())
            } else {
                Style::default().bg(colors.bar_empty())
            };
            buf[(x, inner.y)].set_style(style);
        }

        let label = self.label();
        let label_x = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        buf.set_stringn(
            label_x,
            inner.y,
            &label,
            inner.width as usize,
            Style::default().fg(colors.fg()),
        );
    }
}
