use std::path::PathBuf;

use crate::auth::UserId;
use crate::backend::{BackendHandle, Completion, Request};
use crate::config::Config;
use crate::review::engine::{ReviewEngine, StoreCommand};
use crate::session::controller::{AuthStatus, SessionController, SessionTransition};
use crate::session::forms::{Alert, CredentialForm, FormMode};
use crate::ui::components::draft_form::DraftField;
use crate::ui::components::login_form::LoginField;
use crate::ui::line_input::LineInput;
use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppScreen {
    /// Waiting for the identity provider's first answer.
    Loading,
    Login,
    Review,
}

pub struct App {
    pub config: Config,
    config_path: PathBuf,
    pub theme: Theme,
    pub session: SessionController,

    pub login: CredentialForm,
    pub email_input: LineInput,
    pub password_input: LineInput,
    pub login_focus: LoginField,

    pub review: Option<ReviewEngine>,
    pub cards_loaded: bool,
    epoch: u64,
    pub draft_open: bool,
    pub question_input: LineInput,
    pub answer_input: LineInput,
    pub draft_focus: DraftField,
    pub sidebar_open: bool,
    pub sidebar_selected: usize,

    pub alert: Option<Alert>,
    pub should_quit: bool,
    backend: BackendHandle,
}

impl App {
    /// Builds the app and asks the backend to start reporting auth state.
    pub fn new(config: Config, config_path: PathBuf, backend: BackendHandle) -> Self {
        let theme = Theme::for_dark_mode(config.dark_mode);
        let login = CredentialForm::new(config.remembered_email());
        let email_input = LineInput::new(&login.email);

        let mut app = Self {
            config,
            config_path,
            theme,
            session: SessionController::new(),
            login,
            email_input,
            password_input: LineInput::default(),
            login_focus: LoginField::Email,
            review: None,
            cards_loaded: false,
            epoch: 0,
            draft_open: false,
            question_input: LineInput::default(),
            answer_input: LineInput::default(),
            draft_focus: DraftField::Question,
            sidebar_open: false,
            sidebar_selected: 0,
            alert: None,
            should_quit: false,
            backend,
        };
        if let Some(request) = app.session.subscribe() {
            app.backend.send(request);
        }
        app
    }

    pub fn screen(&self) -> AppScreen {
        match self.session.status() {
            AuthStatus::Unresolved => AppScreen::Loading,
            AuthStatus::Unauthenticated => AppScreen::Login,
            AuthStatus::Authenticated(_) => AppScreen::Review,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save_to(&self.config_path) {
            tracing::warn!(error = %e, path = %self.config_path.display(), "could not save config");
        }
    }

    pub fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::AuthChanged(user) => self.apply_auth(user),
            Completion::SignedIn(result) => {
                match self.login.on_sign_in(&result) {
                    Some(alert) => self.alert = Some(alert),
                    None => self.password_input.clear(),
                }
                if let Ok(user) = result {
                    self.apply_auth(Some(user));
                }
            }
            Completion::SignedUp(result) => {
                self.alert = Some(self.login.on_sign_up(&result));
                if result.is_ok() {
                    self.password_input.clear();
                    self.login_focus = LoginField::Email;
                }
            }
            Completion::SignedOut(result) => match result {
                Ok(()) => self.apply_auth(None),
                Err(e) => tracing::warn!(error = %e, "sign-out failed"),
            },
            Completion::ResetSent(result) => {
                self.alert = Some(self.login.on_password_reset(&result));
            }
            Completion::Fetched { epoch, result } => {
                let Some(engine) = self.live_engine(epoch) else {
                    tracing::debug!(epoch, "dropping cards fetched for an old session");
                    return;
                };
                match result {
                    Ok(cards) => engine.load(cards),
                    Err(e) => tracing::warn!(error = %e, "could not load flashcards"),
                }
                self.cards_loaded = true;
                self.sidebar_selected = 0;
            }
            Completion::Stored { epoch, outcome } => {
                let Some(engine) = self.live_engine(epoch) else {
                    tracing::debug!(epoch, "dropping store result for an old session");
                    return;
                };
                engine.complete(outcome);
                self.clamp_sidebar();
            }
        }
    }

    fn live_engine(&mut self, epoch: u64) -> Option<&mut ReviewEngine> {
        self.review.as_mut().filter(|engine| engine.epoch() == epoch)
    }

    fn apply_auth(&mut self, user: Option<UserId>) {
        match self.session.handle_auth_changed(user) {
            SessionTransition::SignedIn(user) => {
                self.epoch += 1;
                self.review = Some(ReviewEngine::new(self.epoch));
                self.reset_review_ui();
                self.backend.send(Request::Fetch {
                    epoch: self.epoch,
                    user,
                });
            }
            SessionTransition::SignedOut => {
                self.epoch += 1;
                self.review = None;
                self.reset_review_ui();
                self.login = CredentialForm::new(self.config.remembered_email());
                self.email_input = LineInput::new(&self.login.email);
                self.password_input.clear();
                self.login_focus = LoginField::Email;
            }
            SessionTransition::Unchanged => {}
        }
    }

    fn reset_review_ui(&mut self) {
        self.cards_loaded = false;
        self.draft_open = false;
        self.question_input.clear();
        self.answer_input.clear();
        self.draft_focus = DraftField::Question;
        self.sidebar_open = false;
        self.sidebar_selected = 0;
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn quit(&mut self) {
        if let Some(request) = self.session.teardown() {
            self.backend.send(request);
        }
        self.should_quit = true;
    }

    // --- credential form ---

    /// Copies the text inputs into the form model.
    pub fn sync_login_inputs(&mut self) {
        self.login.email = self.email_input.value().to_string();
        self.login.password = self.password_input.value().to_string();
    }

    pub fn submit_credentials(&mut self) {
        self.sync_login_inputs();
        let is_login = self.login.mode == FormMode::Login;
        if let Some(request) = self.login.submit(&mut self.config) {
            if is_login {
                self.save_config();
            }
            self.backend.send(request);
        }
    }

    pub fn request_password_reset(&mut self) {
        self.sync_login_inputs();
        match self.login.request_password_reset() {
            Ok(request) => self.backend.send(request),
            Err(alert) => self.alert = Some(alert),
        }
    }

    pub fn toggle_form_mode(&mut self) {
        self.login.toggle_mode();
        if self.login_focus == LoginField::RememberMe && self.login.mode == FormMode::SignUp {
            self.login_focus = LoginField::ShowPassword;
        }
    }

    // --- review ---

    fn dispatch(&self, command: StoreCommand) {
        let (Some(engine), Some(user)) = (&self.review, self.session.user()) else {
            return;
        };
        self.backend.send(Request::Store {
            epoch: engine.epoch(),
            user: user.clone(),
            command,
        });
    }

    pub fn flip(&mut self) {
        if let Some(engine) = self.review.as_mut() {
            engine.flip();
        }
    }

    pub fn next_card(&mut self) {
        if let Some(engine) = self.review.as_mut() {
            engine.next();
        }
    }

    pub fn prev_card(&mut self) {
        if let Some(engine) = self.review.as_mut() {
            engine.prev();
        }
    }

    pub fn shuffle(&mut self) {
        if let Some(engine) = self.review.as_mut() {
            engine.shuffle();
        }
    }

    fn current_position(&self) -> Option<usize> {
        self.review.as_ref().and_then(|engine| engine.state().cursor())
    }

    pub fn open_add_form(&mut self) {
        let Some(engine) = self.review.as_mut() else {
            return;
        };
        engine.cancel_edit();
        self.question_input.clear();
        self.answer_input.clear();
        self.draft_focus = DraftField::Question;
        self.draft_open = true;
    }

    pub fn open_edit_form(&mut self, position: usize) {
        let Some(engine) = self.review.as_mut() else {
            return;
        };
        engine.start_edit(position);
        if engine.draft().editing != Some(position) {
            return;
        }
        self.question_input.set_value(&engine.draft().question);
        self.answer_input.set_value(&engine.draft().answer);
        self.draft_focus = DraftField::Question;
        self.draft_open = true;
    }

    pub fn edit_current(&mut self) {
        if let Some(position) = self.current_position() {
            self.open_edit_form(position);
        }
    }

    pub fn cancel_draft(&mut self) {
        if let Some(engine) = self.review.as_mut() {
            engine.cancel_edit();
        }
        self.draft_open = false;
    }

    /// Copies the draft inputs into the engine's draft and submits it. An
    /// incomplete draft keeps the form open.
    pub fn submit_draft(&mut self) {
        let Some(engine) = self.review.as_mut() else {
            return;
        };
        let draft = engine.draft_mut();
        draft.question = self.question_input.value().to_string();
        draft.answer = self.answer_input.value().to_string();
        if !draft.is_complete() {
            return;
        }
        let command = engine.submit_draft();
        self.draft_open = false;
        self.question_input.clear();
        self.answer_input.clear();
        if let Some(command) = command {
            self.dispatch(command);
        }
    }

    pub fn delete_at(&mut self, position: usize) {
        let Some(engine) = self.review.as_mut() else {
            return;
        };
        if let Some(command) = engine.delete_at(position) {
            self.dispatch(command);
        }
    }

    pub fn delete_current(&mut self) {
        if let Some(position) = self.current_position() {
            self.delete_at(position);
        }
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_open = !self.sidebar_open;
        if self.sidebar_open {
            self.sidebar_selected = self.current_position().unwrap_or(0);
        }
    }

    fn card_count(&self) -> usize {
        self.review.as_ref().map_or(0, |engine| engine.state().len())
    }

    fn clamp_sidebar(&mut self) {
        self.sidebar_selected = self.sidebar_selected.min(self.card_count().saturating_sub(1));
    }

    pub fn sidebar_down(&mut self) {
        if self.sidebar_selected + 1 < self.card_count() {
            self.sidebar_selected += 1;
        }
    }

    pub fn sidebar_up(&mut self) {
        self.sidebar_selected = self.sidebar_selected.saturating_sub(1);
    }

    /// Shows the highlighted sidebar card in the review pane and closes the
    /// sidebar.
    pub fn sidebar_activate(&mut self) {
        let position = self.sidebar_selected;
        if let Some(engine) = self.review.as_mut() {
            engine.select(position);
        }
        self.sidebar_open = false;
    }

    // --- preferences ---

    pub fn toggle_dark_mode(&mut self) {
        self.config.dark_mode = !self.config.dark_mode;
        self.theme = Theme::for_dark_mode(self.config.dark_mode);
        self.save_config();
    }

    pub fn sign_out(&mut self) {
        self.backend.send(Request::SignOut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::auth::local::LocalIdentity;
    use crate::backend::Backend;
    use crate::event::AppEvent;
    use crate::store::json_store::JsonStore;
    use crate::store::local::LocalRecordStore;

    struct Harness {
        dir: TempDir,
        app: App,
        rx: mpsc::Receiver<AppEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let files = JsonStore::with_base_dir(dir.path().join("data")).unwrap();
            let (tx, rx) = mpsc::channel();
            let backend = BackendHandle::spawn(
                Backend::new(
                    Box::new(LocalIdentity::open(files.clone())),
                    Box::new(LocalRecordStore::open(files)),
                ),
                tx,
            );
            let app = App::new(Config::default(), dir.path().join("config.toml"), backend);
            Self { dir, app, rx }
        }

        fn next_completion(&self) -> Completion {
            loop {
                match self.rx.recv_timeout(Duration::from_secs(5)) {
                    Ok(AppEvent::Backend(completion)) => return completion,
                    Ok(_) => continue,
                    Err(e) => panic!("no completion from backend: {e}"),
                }
            }
        }

        /// Feeds completions to the app until `done` accepts one.
        fn pump_until(&mut self, done: impl Fn(&Completion) -> bool) {
            loop {
                let completion = self.next_completion();
                let stop = done(&completion);
                self.app.on_completion(completion);
                if stop {
                    return;
                }
            }
        }

        fn type_credentials(&mut self, email: &str, password: &str) {
            self.app.email_input.set_value(email);
            self.app.password_input.set_value(password);
        }

        /// Signs in without waiting for the card fetch to come back.
        fn sign_up_and_submit(&mut self) {
            self.pump_until(|c| matches!(c, Completion::AuthChanged(_)));
            self.app.toggle_form_mode();
            self.type_credentials("reader@example.com", "secret1");
            self.app.submit_credentials();
            self.pump_until(|c| matches!(c, Completion::SignedUp(_)));
            self.app.dismiss_alert();
            self.type_credentials("reader@example.com", "secret1");
            self.app.submit_credentials();
            self.pump_until(|c| matches!(c, Completion::SignedIn(_)));
        }

        fn sign_up_and_in(&mut self) {
            self.sign_up_and_submit();
            self.pump_until(|c| matches!(c, Completion::Fetched { .. }));
        }
    }

    #[test]
    fn test_starts_loading_then_shows_login() {
        let mut h = Harness::new();
        assert_eq!(h.app.screen(), AppScreen::Loading);
        h.pump_until(|c| matches!(c, Completion::AuthChanged(_)));
        assert_eq!(h.app.screen(), AppScreen::Login);
        assert!(h.app.review.is_none());
    }

    #[test]
    fn test_sign_up_then_sign_in_reaches_review() {
        let mut h = Harness::new();
        h.sign_up_and_in();
        assert_eq!(h.app.screen(), AppScreen::Review);
        assert_eq!(h.app.login.mode, FormMode::Login);
        assert!(h.app.cards_loaded);
        assert!(h.app.password_input.value().is_empty());
        let engine = h.app.review.as_ref().unwrap();
        assert_eq!(engine.epoch(), h.app.epoch());
        assert!(engine.state().is_empty());
    }

    #[test]
    fn test_wrong_password_raises_alert_and_stays_on_login() {
        let mut h = Harness::new();
        h.pump_until(|c| matches!(c, Completion::AuthChanged(_)));
        h.type_credentials("nobody@example.com", "whatever");
        h.app.submit_credentials();
        h.pump_until(|c| matches!(c, Completion::SignedIn(_)));
        assert_eq!(h.app.screen(), AppScreen::Login);
        assert_eq!(
            h.app.alert,
            Some(Alert::Error("No user found with this email.".into()))
        );
    }

    #[test]
    fn test_empty_reset_email_alerts_locally() {
        let mut h = Harness::new();
        h.app.email_input.clear();
        h.app.request_password_reset();
        assert_eq!(
            h.app.alert,
            Some(Alert::Info("Please enter your email address first.".into()))
        );
    }

    #[test]
    fn test_added_card_survives_and_gets_an_id() {
        let mut h = Harness::new();
        h.sign_up_and_in();
        h.app.open_add_form();
        h.app.question_input.set_value("2+2");
        h.app.answer_input.set_value("4");
        h.app.submit_draft();
        assert!(!h.app.draft_open);
        assert_eq!(h.app.review.as_ref().unwrap().state().len(), 1);

        h.pump_until(|c| matches!(c, Completion::Stored { .. }));
        let engine = h.app.review.as_ref().unwrap();
        assert!(engine.state().card(0).unwrap().id.is_some());
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_card_added_while_loading_survives_the_fetch() {
        let mut h = Harness::new();
        h.sign_up_and_submit();
        assert_eq!(h.app.screen(), AppScreen::Review);
        assert!(!h.app.cards_loaded);

        h.app.open_add_form();
        h.app.question_input.set_value("early");
        h.app.answer_input.set_value("bird");
        h.app.submit_draft();

        h.pump_until(|c| matches!(c, Completion::Stored { .. }));
        assert!(h.app.cards_loaded);
        let engine = h.app.review.as_ref().unwrap();
        assert_eq!(engine.state().len(), 1);
        let card = engine.state().card(0).unwrap();
        assert_eq!(card.question(), "early");
        assert!(card.id.is_some());
    }

    #[test]
    fn test_incomplete_draft_keeps_form_open() {
        let mut h = Harness::new();
        h.sign_up_and_in();
        h.app.open_add_form();
        h.app.question_input.set_value("   ");
        h.app.answer_input.set_value("4");
        h.app.submit_draft();
        assert!(h.app.draft_open);
        assert!(h.app.review.as_ref().unwrap().state().is_empty());
    }

    #[test]
    fn test_results_from_previous_session_are_dropped() {
        let mut h = Harness::new();
        h.sign_up_and_in();
        h.app.open_add_form();
        h.app.question_input.set_value("q");
        h.app.answer_input.set_value("a");
        h.app.submit_draft();
        let first_epoch = h.app.epoch();

        // Hold on to the store result while the user signs out.
        let stored = h.next_completion();
        assert!(matches!(stored, Completion::Stored { epoch, .. } if epoch == first_epoch));
        h.app.sign_out();
        h.pump_until(|c| matches!(c, Completion::SignedOut(_)));
        assert_eq!(h.app.screen(), AppScreen::Login);
        assert!(h.app.review.is_none());

        h.type_credentials("reader@example.com", "secret1");
        h.app.submit_credentials();
        h.pump_until(|c| matches!(c, Completion::Fetched { .. }));
        assert!(h.app.epoch() > first_epoch);
        let before = h.app.review.as_ref().unwrap().state().len();

        h.app.on_completion(stored);
        let engine = h.app.review.as_ref().unwrap();
        assert_eq!(engine.state().len(), before);
        assert_eq!(engine.pending_count(), 0);
    }

    #[test]
    fn test_remember_me_persists_email() {
        let mut h = Harness::new();
        h.pump_until(|c| matches!(c, Completion::AuthChanged(_)));
        h.app.login.remember_me = true;
        h.type_credentials("keep@example.com", "secret1");
        h.app.submit_credentials();

        let saved = Config::load_from(&h.dir.path().join("config.toml")).unwrap();
        assert_eq!(saved.remembered_email.as_deref(), Some("keep@example.com"));
    }

    #[test]
    fn test_toggle_dark_mode_saves_and_swaps_theme() {
        let mut h = Harness::new();
        assert_eq!(h.app.theme.name, "light");
        h.app.toggle_dark_mode();
        assert_eq!(h.app.theme.name, "dark");
        let saved = Config::load_from(&h.dir.path().join("config.toml")).unwrap();
        assert!(saved.dark_mode);
    }

    #[test]
    fn test_sidebar_selection_stays_in_bounds() {
        let mut h = Harness::new();
        h.sign_up_and_in();
        for (q, a) in [("q1", "a1"), ("q2", "a2")] {
            h.app.open_add_form();
            h.app.question_input.set_value(q);
            h.app.answer_input.set_value(a);
            h.app.submit_draft();
        }
        h.app.toggle_sidebar();
        assert!(h.app.sidebar_open);
        h.app.sidebar_down();
        h.app.sidebar_down();
        assert_eq!(h.app.sidebar_selected, 1);
        h.app.sidebar_activate();
        assert!(!h.app.sidebar_open);
        let engine = h.app.review.as_ref().unwrap();
        assert_eq!(engine.state().cursor(), Some(1));
        assert!(!engine.state().is_flipped());
    }
}
