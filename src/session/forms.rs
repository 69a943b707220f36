use crate::auth::{AuthError, Persistence, UserId};
use crate::backend::Request;
use crate::config::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Login,
    SignUp,
}

/// Message shown in a modal dialog until dismissed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Alert {
    Info(String),
    Error(String),
}

impl Alert {
    pub fn message(&self) -> &str {
        match self {
            Alert::Info(m) | Alert::Error(m) => m,
        }
    }
}

/// Email/password form shared by login and account creation.
#[derive(Clone, Debug)]
pub struct CredentialForm {
    pub mode: FormMode,
    pub email: String,
    pub password: String,
    pub remember_me: bool,
    pub show_password: bool,
}

impl CredentialForm {
    /// Prefills from a remembered email, which also pre-checks "remember me".
    pub fn new(remembered_email: Option<&str>) -> Self {
        Self {
            mode: FormMode::Login,
            email: remembered_email.unwrap_or_default().to_string(),
            password: String::new(),
            remember_me: remembered_email.is_some(),
            show_password: false,
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            FormMode::Login => FormMode::SignUp,
            FormMode::SignUp => FormMode::Login,
        };
    }

    pub fn toggle_remember_me(&mut self) {
        self.remember_me = !self.remember_me;
    }

    pub fn toggle_show_password(&mut self) {
        self.show_password = !self.show_password;
    }

    fn is_filled(&self) -> bool {
        !self.email.is_empty() && !self.password.is_empty()
    }

    pub fn submit(&mut self, config: &mut Config) -> Option<Request> {
        match self.mode {
            FormMode::Login => self.submit_login(config),
            FormMode::SignUp => self.submit_signup(),
        }
    }

    /// Builds the sign-in request and applies the "remember me" choice to
    /// `config`: the email is kept for next time only when it is checked.
    pub fn submit_login(&mut self, config: &mut Config) -> Option<Request> {
        if !self.is_filled() {
            return None;
        }
        let persistence = if self.remember_me {
            config.remembered_email = Some(self.email.clone());
            Persistence::Durable
        } else {
            config.remembered_email = None;
            Persistence::Session
        };
        Some(Request::SignIn {
            email: self.email.clone(),
            password: self.password.clone(),
            persistence,
        })
    }

    pub fn submit_signup(&mut self) -> Option<Request> {
        if !self.is_filled() {
            return None;
        }
        Some(Request::SignUp {
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }

    pub fn request_password_reset(&self) -> Result<Request, Alert> {
        if self.email.is_empty() {
            return Err(Alert::Info("Please enter your email address first.".to_string()));
        }
        Ok(Request::ResetPassword {
            email: self.email.clone(),
        })
    }

    /// On success the caller forwards the user to the session controller.
    pub fn on_sign_in(&mut self, result: &Result<UserId, AuthError>) -> Option<Alert> {
        match result {
            Ok(_) => {
                self.password.clear();
                None
            }
            Err(e) => Some(Alert::Error(login_error_message(e))),
        }
    }

    pub fn on_sign_up(&mut self, result: &Result<UserId, AuthError>) -> Alert {
        match result {
            Ok(_) => {
                self.mode = FormMode::Login;
                self.password.clear();
                Alert::Info("Account created successfully! You can now log in.".to_string())
            }
            Err(AuthError::EmailAlreadyInUse) => {
                Alert::Error(login_error_message(&AuthError::EmailAlreadyInUse))
            }
            Err(e) => {
                tracing::info!(error = %e, "sign-up failed");
                Alert::Error("Failed to create account. Please try again.".to_string())
            }
        }
    }

    pub fn on_password_reset(&self, result: &Result<(), AuthError>) -> Alert {
        match result {
            Ok(()) => Alert::Info("Password reset email sent! Check your inbox.".to_string()),
            Err(AuthError::UserNotFound) => {
                Alert::Error("No account found with this email address.".to_string())
            }
            Err(e) => Alert::Error(format!("Error sending reset email: {e}")),
        }
    }
}

pub fn login_error_message(error: &AuthError) -> String {
    match error {
        AuthError::InvalidEmail => "Invalid email format. Please enter a valid email.".to_string(),
        AuthError::UserNotFound => "No user found with this email.".to_string(),
        AuthError::WrongPassword => "Incorrect password. Please try again.".to_string(),
        AuthError::EmailAlreadyInUse => "This email is already registered. Please log in.".to_string(),
        AuthError::InvalidCredential => "Invalid email or password. Please try again.".to_string(),
        AuthError::Other(message) => format!("An error occurred: {message}"),
    }
}
