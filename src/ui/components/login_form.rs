use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::session::forms::{CredentialForm, FormMode};
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoginField {
    #[default]
    Email,
    Password,
    RememberMe,
    ShowPassword,
}

impl LoginField {
    const ORDER: [LoginField; 4] = [
        LoginField::Email,
        LoginField::Password,
        LoginField::RememberMe,
        LoginField::ShowPassword,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    /// "Remember me" only exists on the login side.
    fn visible(self, mode: FormMode) -> bool {
        !(self == LoginField::RememberMe && mode == FormMode::SignUp)
    }

    pub fn next(self, mode: FormMode) -> Self {
        let mut i = self.index();
        loop {
            i = (i + 1) % Self::ORDER.len();
            if Self::ORDER[i].visible(mode) {
                return Self::ORDER[i];
            }
        }
    }

    pub fn prev(self, mode: FormMode) -> Self {
        let mut i = self.index();
        loop {
            i = (i + Self::ORDER.len() - 1) % Self::ORDER.len();
            if Self::ORDER[i].visible(mode) {
                return Self::ORDER[i];
            }
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, LoginField::Email | LoginField::Password)
    }
}

pub struct LoginForm<'a> {
    pub form: &'a CredentialForm,
    pub email: &'a LineInput,
    pub password: &'a LineInput,
    pub focus: LoginField,
    pub theme: &'a Theme,
}

impl LoginForm<'_> {
    fn text_field(&self, label: &str, field: LoginField) -> Vec<Line<'static>> {
        let colors = &self.theme.colors;
        let focused = self.focus == field;
        let label_style = if focused {
            Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.text_dim())
        };

        let (before, cursor, after) = match field {
            LoginField::Password if !self.form.show_password => self.password.masked_parts('•'),
            LoginField::Password => owned(self.password.render_parts()),
            _ => owned(self.email.render_parts()),
        };
        let text_style = Style::default().fg(colors.fg());
        let mut value = vec![Span::raw("  "), Span::styled(before, text_style)];
        if focused {
            let cursor_style = Style::default().fg(colors.bg()).bg(colors.fg());
            value.push(Span::styled(
                cursor.map(String::from).unwrap_or_else(|| " ".to_string()),
                cursor_style,
            ));
        } else if let Some(ch) = cursor {
            value.push(Span::styled(ch.to_string(), text_style));
        }
        value.push(Span::styled(after, text_style));

        vec![
            Line::from(Span::styled(format!(" {label}"), label_style)),
            Line::from(value),
        ]
    }

    fn checkbox(&self, label: &str, checked: bool, field: LoginField) -> Line<'static> {
        let colors = &self.theme.colors;
        let mark = if checked { "[x]" } else { "[ ]" };
        let style = if self.focus == field {
            Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        Line::from(Span::styled(format!(" {mark} {label}"), style))
    }
}

fn owned((before, cursor, after): (&str, Option<char>, &str)) -> (String, Option<char>, String) {
    (before.to_string(), cursor, after.to_string())
}

impl Widget for LoginForm<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let title = match self.form.mode {
            FormMode::Login => " Welcome Back ",
            FormMode::SignUp => " Create Account ",
        };
        let block = Block::bordered()
            .title(Line::from(Span::styled(
                title,
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            )).centered())
            .border_style(Style::default().fg(colors.border_focused()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(2),
                Constraint::Min(0),
            ])
            .split(inner);

        Paragraph::new(self.text_field("Email", LoginField::Email)).render(layout[1], buf);
        Paragraph::new(self.text_field("Password", LoginField::Password)).render(layout[2], buf);

        let mut boxes = Vec::new();
        if self.form.mode == FormMode::Login {
            boxes.push(self.checkbox("Remember me", self.form.remember_me, LoginField::RememberMe));
        }
        boxes.push(self.checkbox(
            "Show password",
            self.form.show_password,
            LoginField::ShowPassword,
        ));
        Paragraph::new(boxes).render(layout[3], buf);

        let (action, switch) = match self.form.mode {
            FormMode::Login => ("[Enter] Log In", "[Ctrl-t] Need an account? Sign Up"),
            FormMode::SignUp => ("[Enter] Sign Up", "[Ctrl-t] Already have an account? Log In"),
        };
        let mut hints = vec![
            Line::from(""),
            Line::from(Span::styled(
                action,
                Style::default().fg(colors.accent()).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(switch, Style::default().fg(colors.text_dim()))),
        ];
        if self.form.mode == FormMode::Login {
            hints.push(Line::from(Span::styled(
                "[Ctrl-r] Forgot Password?",
                Style::default().fg(colors.text_dim()),
            )));
        }
        Paragraph::new(hints)
            .alignment(Alignment::Center)
            .render(layout[4], buf);
    }
}
