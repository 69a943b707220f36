use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use flashy::app::{App, AppScreen};
use flashy::backend::{Backend, BackendHandle};
use flashy::config::{BackendKind, Config};
use flashy::event::{AppEvent, EventHandler};
use flashy::logging;
use flashy::ui::components::alert::AlertDialog;
use flashy::ui::components::card_view::CardView;
use flashy::ui::components::draft_form::{DraftField, DraftForm};
use flashy::ui::components::login_form::{LoginField, LoginForm};
use flashy::ui::components::progress_bar::ProgressBar;
use flashy::ui::components::stack_sidebar::StackSidebar;
use flashy::ui::layout::{AppLayout, centered_fixed, pack_hint_lines};
use flashy::ui::line_input::InputResult;

#[derive(Parser)]
#[command(name = "flashy", version, about = "Terminal flashcards with cloud or local sync")]
struct Cli {
    #[arg(short, long, value_enum, help = "Where accounts and cards live")]
    backend: Option<BackendKind>,

    #[arg(long, conflicts_with = "light", help = "Use the dark theme")]
    dark: bool,

    #[arg(long, help = "Use the light theme")]
    light: bool,

    #[arg(long, help = "Directory for local data and the log file")]
    data_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = Config::config_path();
    let mut config = Config::load_from(&config_path).unwrap_or_default();
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.dark {
        config.dark_mode = true;
    } else if cli.light {
        config.dark_mode = false;
    }

    let log_path = logging::init(&config.data_dir)?;
    tracing::info!(log = %log_path.display(), backend = ?config.backend, "starting flashy");

    let backend = Backend::from_config(&config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let events = EventHandler::new(Duration::from_millis(250));
    let handle = BackendHandle::spawn(backend, events.sender());
    let mut app = App::new(config, config_path, handle);

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = ?err, "exiting on error");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Backend(completion) => app.on_completion(completion),
            AppEvent::Tick | AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    // Alerts are modal.
    if app.alert.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_alert();
        }
        return;
    }

    match app.screen() {
        AppScreen::Loading => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                app.quit();
            }
        }
        AppScreen::Login => handle_login_key(app, key),
        AppScreen::Review => handle_review_key(app, key),
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    let mode = app.login.mode;
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('t') => {
                app.toggle_form_mode();
                return;
            }
            KeyCode::Char('r') => {
                app.request_password_reset();
                return;
            }
            _ => {}
        }
    }

    let result = match app.login_focus {
        LoginField::Email => app.email_input.handle(key),
        LoginField::Password => app.password_input.handle(key),
        LoginField::RememberMe | LoginField::ShowPassword => match key.code {
            KeyCode::Char(' ') => {
                if app.login_focus == LoginField::RememberMe {
                    app.login.toggle_remember_me();
                } else {
                    app.login.toggle_show_password();
                }
                InputResult::Continue
            }
            KeyCode::Enter => InputResult::Submit,
            KeyCode::Esc => InputResult::Cancel,
            KeyCode::Tab | KeyCode::Down => InputResult::NextField,
            KeyCode::BackTab | KeyCode::Up => InputResult::PrevField,
            _ => InputResult::Continue,
        },
    };

    match result {
        InputResult::Continue => app.sync_login_inputs(),
        InputResult::Submit => app.submit_credentials(),
        InputResult::Cancel => app.quit(),
        InputResult::NextField => app.login_focus = app.login_focus.next(mode),
        InputResult::PrevField => app.login_focus = app.login_focus.prev(mode),
    }
}

fn handle_review_key(app: &mut App, key: KeyEvent) {
    if app.draft_open {
        handle_draft_key(app, key);
        return;
    }
    if app.sidebar_open {
        handle_sidebar_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => app.flip(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('n') => app.next_card(),
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('p') => app.prev_card(),
        KeyCode::Char('s') => app.shuffle(),
        KeyCode::Char('a') => app.open_add_form(),
        KeyCode::Char('e') => app.edit_current(),
        KeyCode::Char('x') | KeyCode::Delete => app.delete_current(),
        KeyCode::Tab => app.toggle_sidebar(),
        KeyCode::Char('d') => app.toggle_dark_mode(),
        KeyCode::Char('o') => app.sign_out(),
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),
        _ => {}
    }
}

fn handle_sidebar_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.sidebar_up(),
        KeyCode::Down | KeyCode::Char('j') => app.sidebar_down(),
        KeyCode::Enter | KeyCode::Char(' ') => app.sidebar_activate(),
        KeyCode::Char('e') => app.open_edit_form(app.sidebar_selected),
        KeyCode::Char('x') | KeyCode::Delete => app.delete_at(app.sidebar_selected),
        KeyCode::Char('a') => app.open_add_form(),
        KeyCode::Char('d') => app.toggle_dark_mode(),
        KeyCode::Tab | KeyCode::Esc => app.toggle_sidebar(),
        KeyCode::Char('q') => app.quit(),
        _ => {}
    }
}

fn handle_draft_key(app: &mut App, key: KeyEvent) {
    let result = match app.draft_focus {
        DraftField::Question => app.question_input.handle(key),
        DraftField::Answer => app.answer_input.handle(key),
    };
    match result {
        InputResult::Continue => {}
        InputResult::Submit => match app.draft_focus {
            DraftField::Question => app.draft_focus = DraftField::Answer,
            DraftField::Answer => app.submit_draft(),
        },
        InputResult::Cancel => app.cancel_draft(),
        InputResult::NextField | InputResult::PrevField => {
            app.draft_focus = app.draft_focus.toggle();
        }
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()).fg(colors.fg()));
    frame.render_widget(bg, area);

    match app.screen() {
        AppScreen::Loading => render_loading(frame, app),
        AppScreen::Login => render_login(frame, app),
        AppScreen::Review => render_review(frame, app),
    }

    if let Some(alert) = &app.alert {
        let popup = centered_fixed(56, 7, area);
        frame.render_widget(
            AlertDialog {
                alert,
                theme: &app.theme,
            },
            popup,
        );
    }
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: Rect, info: &str) {
    let colors = &app.theme.colors;
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " flashy ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            info.to_string(),
            Style::default().fg(colors.header_fg()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);
}

fn render_loading(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let message = Paragraph::new(Line::from(Span::styled(
        "Loading...",
        Style::default().fg(app.theme.colors.text_dim()),
    )))
    .alignment(Alignment::Center);
    let line = Rect::new(area.x, area.y + area.height / 2, area.width, 1.min(area.height));
    frame.render_widget(message, line);
}

fn render_login(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, app, layout[0], "| Study smarter, one card at a time");

    let form_area = centered_fixed(56, 17, layout[1]);
    frame.render_widget(
        LoginForm {
            form: &app.login,
            email: &app.email_input,
            password: &app.password_input,
            focus: app.login_focus,
            theme: &app.theme,
        },
        form_area,
    );

    let footer = Paragraph::new(Line::from(Span::styled(
        " [Tab] Next field  [Space] Toggle box  [Esc] Quit ",
        Style::default().fg(colors.text_dim()),
    )));
    frame.render_widget(footer, layout[2]);
}

fn render_review(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();
    let colors = &app.theme.colors;
    let Some(engine) = app.review.as_ref() else {
        return;
    };
    let state = engine.state();

    let hints: &[&str] = if app.draft_open {
        &["[Tab] Switch field", "[Enter] Save", "[Esc] Cancel"]
    } else if app.sidebar_open {
        &[
            "[j/k] Move",
            "[Enter] Show",
            "[e] Edit",
            "[x] Delete",
            "[a] Add",
            "[Tab] Close list",
        ]
    } else {
        &[
            "[Space] Flip",
            "[←/→] Prev/Next",
            "[s] Shuffle",
            "[a] Add",
            "[e] Edit",
            "[x] Delete",
            "[Tab] Card list",
            "[d] Dark mode",
            "[o] Sign out",
            "[q] Quit",
        ]
    };
    let hint_lines = pack_hint_lines(hints, area.width as usize);
    let layout = AppLayout::new(area, app.sidebar_open, hint_lines.len().max(1) as u16);

    let mode = if app.config.dark_mode { "dark" } else { "light" };
    render_header(
        frame,
        app,
        layout.header,
        &format!("| {} cards | {mode} ", state.len()),
    );

    if let Some(main) = layout.main {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(main);

        if app.cards_loaded {
            let card = CardView::new(state.current(), state.is_flipped(), &app.theme)
                .position(state.cursor(), state.len());
            frame.render_widget(card, rows[0]);
        } else {
            let waiting = Paragraph::new(Line::from(Span::styled(
                "Loading flashcards...",
                Style::default().fg(colors.text_dim()),
            )))
            .alignment(Alignment::Center)
            .block(Block::bordered().border_style(Style::default().fg(colors.border())));
            frame.render_widget(waiting, rows[0]);
        }

        let (viewed, total) = state.progress();
        frame.render_widget(ProgressBar::new(viewed, total, &app.theme), rows[1]);
    }

    if let Some(sidebar) = layout.sidebar {
        frame.render_widget(
            StackSidebar::new(state, app.sidebar_selected, !app.draft_open, &app.theme),
            sidebar,
        );
    }

    let footer_lines: Vec<Line> = hint_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(colors.text_dim()))))
        .collect();
    frame.render_widget(Paragraph::new(footer_lines), layout.footer);

    if app.draft_open {
        let popup = centered_fixed(60, 10, area);
        frame.render_widget(
            DraftForm {
                question: &app.question_input,
                answer: &app.answer_input,
                focus: app.draft_focus,
                editing: engine.draft().is_editing(),
                theme: &app.theme,
            },
            popup,
        );
    }
}
