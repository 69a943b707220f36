//! Offline identity provider backed by two JSON documents in the data dir.
//!
//! `accounts.json` maps a normalized email to its uid and salted password
//! hash. `session.json` only exists while a durable session is active.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::auth::{
    AuthError, AuthListener, IdentityGateway, ListenerId, Listeners, Persistence, UserId,
    looks_like_email,
};
use crate::store::json_store::JsonStore;

const ACCOUNTS_FILE: &str = "accounts.json";
const SESSION_FILE: &str = "session.json";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct AccountsData {
    accounts: BTreeMap<String, Account>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Account {
    uid: UserId,
    salt: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SessionData {
    uid: UserId,
    email: String,
}

pub struct LocalIdentity {
    files: JsonStore,
    persistence: Persistence,
    current: Option<UserId>,
    listeners: Listeners,
    rng: SmallRng,
}

impl LocalIdentity {
    /// Opens the account files, restoring a durable session if one was saved.
    pub fn open(files: JsonStore) -> Self {
        let restored = files.load_opt::<SessionData>(SESSION_FILE).and_then(|session| {
            let accounts = match files.try_load::<AccountsData>(ACCOUNTS_FILE) {
                Ok(accounts) => accounts.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(error = %e, "cannot read accounts, not restoring session");
                    return None;
                }
            };
            accounts
                .accounts
                .get(&normalize(&session.email))
                .filter(|account| account.uid == session.uid)
                .map(|account| account.uid.clone())
        });
        if let Some(ref uid) = restored {
            tracing::info!(%uid, "restored durable session");
        }
        Self {
            files,
            persistence: Persistence::default(),
            current: restored,
            listeners: Listeners::default(),
            rng: SmallRng::from_entropy(),
        }
    }

    fn accounts(&self) -> Result<AccountsData, AuthError> {
        self.files
            .try_load(ACCOUNTS_FILE)
            .map(Option::unwrap_or_default)
            .map_err(|e| AuthError::Other(format!("could not read account storage: {e}")))
    }

    fn set_current(&mut self, user: Option<UserId>) {
        if self.current != user {
            self.current = user.clone();
            self.listeners.notify(user);
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn io_error(e: anyhow::Error) -> AuthError {
    AuthError::Other(format!("could not access account storage: {e}"))
}

impl IdentityGateway for LocalIdentity {
    fn set_persistence(&mut self, mode: Persistence) -> Result<(), AuthError> {
        self.persistence = mode;
        Ok(())
    }

    fn sign_in(&mut self, email: &str, password: &str) -> Result<UserId, AuthError> {
        if !looks_like_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        let key = normalize(email);
        let accounts = self.accounts()?;
        let account = accounts.accounts.get(&key).ok_or(AuthError::UserNotFound)?;
        if hash_password(&account.salt, password) != account.password_hash {
            return Err(AuthError::WrongPassword);
        }
        let uid = account.uid.clone();

        match self.persistence {
            Persistence::Durable => self
                .files
                .save(
                    SESSION_FILE,
                    &SessionData {
                        uid: uid.clone(),
                        email: key,
                    },
                )
                .map_err(io_error)?,
            Persistence::Session => self.files.remove(SESSION_FILE).map_err(io_error)?,
        }

        self.set_current(Some(uid.clone()));
        Ok(uid)
    }

    fn sign_up(&mut self, email: &str, password: &str) -> Result<UserId, AuthError> {
        if !looks_like_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Other(format!(
                "Password should be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let key = normalize(email);
        let mut accounts = self.accounts()?;
        if accounts.accounts.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let uid: String = (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(28)
            .map(char::from)
            .collect();
        let salt = hex::encode(self.rng.r#gen::<[u8; 16]>());
        let account = Account {
            uid: UserId::new(uid),
            password_hash: hash_password(&salt, password),
            salt,
            created_at: Utc::now(),
        };
        let uid = account.uid.clone();
        accounts.accounts.insert(key, account);
        self.files.save(ACCOUNTS_FILE, &accounts).map_err(io_error)?;
        tracing::info!(%uid, "created local account");
        Ok(uid)
    }

    fn sign_out(&mut self) -> Result<(), AuthError> {
        self.files.remove(SESSION_FILE).map_err(io_error)?;
        self.set_current(None);
        Ok(())
    }

    fn send_password_reset(&mut self, email: &str) -> Result<(), AuthError> {
        if !looks_like_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if !self.accounts()?.accounts.contains_key(&normalize(email)) {
            return Err(AuthError::UserNotFound);
        }
        // Nothing to mail from an offline store; the request is only recorded.
        tracing::info!(email, "password reset requested for local account");
        Ok(())
    }

    fn current_user(&self) -> Option<UserId> {
        self.current.clone()
    }

    fn on_auth_state_changed(&mut self, listener: AuthListener) -> ListenerId {
        self.listeners.register(listener, self.current.clone())
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }
}
