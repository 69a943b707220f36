//! Firebase Authentication over its REST API.
//!
//! The id token obtained here is shared with [`crate::store::firebase`], which
//! needs it to authorize database requests.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::auth::{
    AuthError, AuthListener, IdentityGateway, ListenerId, Listeners, Persistence, UserId,
};
use crate::config::FirebaseConfig;
use crate::store::json_store::JsonStore;

const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts";
const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
const SESSION_FILE: &str = "firebase_session.json";

#[derive(Clone, Debug, Default)]
pub struct FirebaseSession {
    pub user: Option<UserId>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
}

pub type SharedSession = Arc<Mutex<FirebaseSession>>;

pub fn lock(session: &SharedSession) -> MutexGuard<'_, FirebaseSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    user: UserId,
    refresh_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

pub fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Maps an Identity Toolkit error message such as `"WEAK_PASSWORD : Password
/// should be at least 6 characters"` to an [`AuthError`].
pub fn map_error_code(message: &str) -> AuthError {
    let code = message.split_whitespace().next().unwrap_or_default();
    match code {
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
        "EMAIL_NOT_FOUND" | "USER_DISABLED" => AuthError::UserNotFound,
        "INVALID_PASSWORD" | "MISSING_PASSWORD" => AuthError::WrongPassword,
        "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => AuthError::InvalidCredential,
        _ => AuthError::Other(message.to_string()),
    }
}

fn error_from_body(body: &str) -> AuthError {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(map_error_code))
        .unwrap_or_else(|| AuthError::Other(body.to_string()))
}

/// Exchanges the session's refresh token for a new id token.
pub fn refresh_id_token(
    client: &Client,
    api_key: &str,
    session: &SharedSession,
) -> Result<(), AuthError> {
    let refresh_token = lock(session)
        .refresh_token
        .clone()
        .ok_or_else(|| AuthError::Other("no refresh token".to_string()))?;

    let response = client
        .post(format!("{TOKEN_URL}?key={api_key}"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .map_err(|e| AuthError::Other(e.to_string()))?;
    if !response.status().is_success() {
        let body = response.text().unwrap_or_default();
        return Err(error_from_body(&body));
    }
    let token: TokenResponse = response
        .json()
        .map_err(|e| AuthError::Other(e.to_string()))?;

    let mut guard = lock(session);
    guard.user = Some(UserId::new(token.user_id));
    guard.id_token = Some(token.id_token);
    guard.refresh_token = Some(token.refresh_token);
    Ok(())
}

pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
    session: SharedSession,
    files: JsonStore,
    persistence: Persistence,
    listeners: Listeners,
}

impl FirebaseIdentity {
    /// Restores a durable session if one was saved and its refresh token still works.
    pub fn open(config: &FirebaseConfig, files: JsonStore, session: SharedSession) -> Self {
        let identity = Self {
            client: http_client(),
            api_key: config.api_key.clone(),
            session,
            files,
            persistence: Persistence::default(),
            listeners: Listeners::default(),
        };

        if let Some(saved) = identity.files.load_opt::<PersistedSession>(SESSION_FILE) {
            {
                let mut guard = lock(&identity.session);
                guard.refresh_token = Some(saved.refresh_token);
            }
            match refresh_id_token(&identity.client, &identity.api_key, &identity.session) {
                Ok(()) => tracing::info!(user = %saved.user, "restored durable session"),
                Err(e) => {
                    tracing::warn!(error = %e, "saved session is no longer valid");
                    *lock(&identity.session) = FirebaseSession::default();
                    let _ = identity.files.remove(SESSION_FILE);
                }
            }
        }
        identity
    }

    fn call(&self, endpoint: &str, body: Value) -> Result<Value, AuthError> {
        let response = self
            .client
            .post(format!("{IDENTITY_URL}:{endpoint}?key={}", self.api_key))
            .json(&body)
            .send()
            .map_err(|e| AuthError::Other(e.to_string()))?;
        if response.status().is_success() {
            response.json().map_err(|e| AuthError::Other(e.to_string()))
        } else {
            let body = response.text().unwrap_or_default();
            Err(error_from_body(&body))
        }
    }

    fn persist(&self) {
        let guard = lock(&self.session);
        let result = match (self.persistence, &guard.user, &guard.refresh_token) {
            (Persistence::Durable, Some(user), Some(refresh_token)) => self.files.save(
                SESSION_FILE,
                &PersistedSession {
                    user: user.clone(),
                    refresh_token: refresh_token.clone(),
                },
            ),
            _ => self.files.remove(SESSION_FILE),
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not update saved session");
        }
    }
}

impl IdentityGateway for FirebaseIdentity {
    fn set_persistence(&mut self, mode: Persistence) -> Result<(), AuthError> {
        self.persistence = mode;
        Ok(())
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let body = self.call(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        let response: SignInResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Other(e.to_string()))?;
        let user = UserId::new(response.local_id);
        {
            let mut guard = lock(&self.session);
            guard.user = Some(user.clone());
            guard.id_token = Some(response.id_token);
            guard.refresh_token = Some(response.refresh_token);
        }
        self.persist();
        self.listeners.notify(Some(user.clone()));
        Ok(user)
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<UserId, AuthError> {
        let body = self.call(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )?;
        // The returned tokens are dropped: a new account still has to log in.
        let response: SignInResponse =
            serde_json::from_value(body).map_err(|e| AuthError::Other(e.to_string()))?;
        Ok(UserId::new(response.local_id))
    }

    fn sign_out(&mut self) -> Result<(), AuthError> {
        *lock(&self.session) = FirebaseSession::default();
        if let Err(e) = self.files.remove(SESSION_FILE) {
            tracing::warn!(error = %e, "could not remove saved session");
        }
        self.listeners.notify(None);
        Ok(())
    }

    fn send_password_reset(&mut self, email: &str) -> Result<(), AuthError> {
        self.call(
            "sendOobCode",
            json!({ "requestType": "PASSWORD_RESET", "email": email }),
        )?;
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        lock(&self.session).user.clone()
    }

    fn on_auth_state_changed(&mut self, listener: AuthListener) -> ListenerId {
        let current = self.current_user();
        self.listeners.register(listener, current)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
