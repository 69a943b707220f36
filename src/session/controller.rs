use crate::auth::UserId;
use crate::backend::Request;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum AuthStatus {
    /// No word from the identity provider yet.
    #[default]
    Unresolved,
    Authenticated(UserId),
    Unauthenticated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionTransition {
    SignedIn(UserId),
    SignedOut,
    Unchanged,
}

/// Gates the UI on the identity provider's view of who is signed in.
#[derive(Debug, Default)]
pub struct SessionController {
    status: AuthStatus,
    subscribed: bool,
    torn_down: bool,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn is_resolved(&self) -> bool {
        self.status != AuthStatus::Unresolved
    }

    pub fn user(&self) -> Option<&UserId> {
        match &self.status {
            AuthStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// The request that registers our listener, the first time only.
    pub fn subscribe(&mut self) -> Option<Request> {
        if self.subscribed || self.torn_down {
            return None;
        }
        self.subscribed = true;
        Some(Request::Subscribe)
    }

    /// Stops listening. Later notifications are ignored.
    pub fn teardown(&mut self) -> Option<Request> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.subscribed.then_some(Request::Unsubscribe)
    }

    /// Applies an identity callback. Reporting the state we are already in,
    /// as a login form does after its own successful sign-in, changes nothing.
    pub fn handle_auth_changed(&mut self, user: Option<UserId>) -> SessionTransition {
        if self.torn_down {
            return SessionTransition::Unchanged;
        }
        let next = match user {
            Some(user) => AuthStatus::Authenticated(user),
            None => AuthStatus::Unauthenticated,
        };
        if next == self.status {
            return SessionTransition::Unchanged;
        }

        let was_authenticated = matches!(self.status, AuthStatus::Authenticated(_));
        self.status = next;
        match &self.status {
            AuthStatus::Authenticated(user) => {
                tracing::info!(%user, "signed in");
                SessionTransition::SignedIn(user.clone())
            }
            _ if was_authenticated => {
                tracing::info!("signed out");
                SessionTransition::SignedOut
            }
            // Resolving to "nobody" from the initial state.
            _ => SessionTransition::Unchanged,
        }
    }
}
