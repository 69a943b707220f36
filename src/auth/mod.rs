pub mod local;

#[cfg(feature = "network")]
pub mod firebase;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier issued by the identity provider for one account.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long a successful sign-in should survive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Persistence {
    /// Restored on the next launch.
    Durable,
    /// Forgotten when the process exits.
    #[default]
    Session,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("no user with this email")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("email already in use")]
    EmailAlreadyInUse,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("{0}")]
    Other(String),
}

pub type AuthListener = Box<dyn Fn(Option<UserId>) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Credential verification and session lifetime, provided by an external service.
pub trait IdentityGateway: Send {
    fn set_persistence(&mut self, mode: Persistence) -> Result<(), AuthError>;

    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserId, AuthError>;

    /// Creates the account without signing it in.
    fn sign_up(&mut self, email: &str, password: &str) -> Result<UserId, AuthError>;

    fn sign_out(&mut self) -> Result<(), AuthError>;

    fn send_password_reset(&mut self, email: &str) -> Result<(), AuthError>;

    fn current_user(&self) -> Option<UserId>;

    /// Registers `listener`, invoking it once right away with the current user
    /// and again on every sign-in or sign-out.
    fn on_auth_state_changed(&mut self, listener: AuthListener) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);
}

/// Listener bookkeeping shared by the gateway implementations.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, AuthListener)>,
}

impl Listeners {
    pub fn register(&mut self, listener: AuthListener, current: Option<UserId>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        listener(current);
        self.entries.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    pub fn notify(&self, user: Option<UserId>) {
        for (_, listener) in &self.entries {
            listener(user.clone());
        }
    }
}

/// Loose shape check applied before an email is sent to any provider.
pub fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_register_invokes_listener_immediately() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut listeners = Listeners::default();
        listeners.register(
            Box::new(move |user| sink.lock().unwrap().push(user)),
            Some(UserId::new("u1")),
        );
        assert_eq!(*seen.lock().unwrap(), vec![Some(UserId::new("u1"))]);
    }

    #[test]
    fn test_removed_listener_is_not_notified() {
        let seen = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&seen);
        let mut listeners = Listeners::default();
        let id = listeners.register(Box::new(move |_| *sink.lock().unwrap() += 1), None);
        listeners.notify(None);
        listeners.remove(id);
        listeners.notify(None);
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("ab.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@bco"));
        assert!(!looks_like_email("a b@c.de"));
    }
}
