//! The worker thread that owns the identity gateway and the record store.
//!
//! The UI thread never calls either service directly. It sends a [`Request`]
//! and later receives the matching [`Completion`] through the app event
//! channel, so a slow network never stalls drawing or input.

use std::fmt;
use std::sync::mpsc;
use std::thread;

use anyhow::Result;

use crate::auth::local::LocalIdentity;
use crate::auth::{AuthError, IdentityGateway, ListenerId, Persistence, UserId};
use crate::config::{BackendKind, Config};
use crate::event::AppEvent;
use crate::review::card::Flashcard;
use crate::review::engine::{StoreCommand, StoreOutcome};
use crate::review::fetcher;
use crate::store::json_store::JsonStore;
use crate::store::local::LocalRecordStore;
use crate::store::{RecordStore, StoreError};

pub enum Request {
    Subscribe,
    Unsubscribe,
    SignIn {
        email: String,
        password: String,
        persistence: Persistence,
    },
    SignUp {
        email: String,
        password: String,
    },
    SignOut,
    ResetPassword {
        email: String,
    },
    Fetch {
        epoch: u64,
        user: UserId,
    },
    Store {
        epoch: u64,
        user: UserId,
        command: StoreCommand,
    },
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Subscribe => f.write_str("Subscribe"),
            Request::Unsubscribe => f.write_str("Unsubscribe"),
            Request::SignIn {
                email, persistence, ..
            } => f
                .debug_struct("SignIn")
                .field("email", email)
                .field("persistence", persistence)
                .finish_non_exhaustive(),
            Request::SignUp { email, .. } => f
                .debug_struct("SignUp")
                .field("email", email)
                .finish_non_exhaustive(),
            Request::SignOut => f.write_str("SignOut"),
            Request::ResetPassword { email } => {
                f.debug_struct("ResetPassword").field("email", email).finish()
            }
            Request::Fetch { epoch, user } => f
                .debug_struct("Fetch")
                .field("epoch", epoch)
                .field("user", user)
                .finish(),
            Request::Store {
                epoch,
                user,
                command,
            } => f
                .debug_struct("Store")
                .field("epoch", epoch)
                .field("user", user)
                .field("command", command)
                .finish(),
        }
    }
}

#[derive(Debug)]
pub enum Completion {
    AuthChanged(Option<UserId>),
    SignedIn(Result<UserId, AuthError>),
    SignedUp(Result<UserId, AuthError>),
    SignedOut(Result<(), AuthError>),
    ResetSent(Result<(), AuthError>),
    Fetched {
        epoch: u64,
        result: Result<Vec<Flashcard>, StoreError>,
    },
    Stored {
        epoch: u64,
        outcome: StoreOutcome,
    },
}

pub struct Backend {
    identity: Box<dyn IdentityGateway>,
    store: Box<dyn RecordStore>,
    listener: Option<ListenerId>,
}

impl Backend {
    pub fn new(identity: Box<dyn IdentityGateway>, store: Box<dyn RecordStore>) -> Self {
        Self {
            identity,
            store,
            listener: None,
        }
    }

    /// Picks the services named by `config`. A Firebase backend that is not
    /// configured, or not compiled in, falls back to the local one.
    pub fn from_config(config: &Config) -> Result<Self> {
        let files = JsonStore::with_base_dir(config.data_dir.clone())?;
        match config.backend {
            BackendKind::Local => Ok(Self::local(files)),
            BackendKind::Firebase => Ok(Self::firebase(config, files)),
        }
    }

    pub fn local(files: JsonStore) -> Self {
        tracing::info!(dir = %files.base_dir().display(), "using local backend");
        Self::new(
            Box::new(LocalIdentity::open(files.clone())),
            Box::new(LocalRecordStore::open(files)),
        )
    }

    #[cfg(feature = "network")]
    fn firebase(config: &Config, files: JsonStore) -> Self {
        use crate::auth::firebase::{FirebaseIdentity, SharedSession};
        use crate::store::firebase::FirebaseStore;

        if !config.firebase.is_configured() {
            tracing::warn!("firebase backend selected but api_key/database_url are missing");
            return Self::local(files);
        }
        tracing::info!(database = %config.firebase.database_url, "using firebase backend");
        let session = SharedSession::default();
        Self::new(
            Box::new(FirebaseIdentity::open(&config.firebase, files, session.clone())),
            Box::new(FirebaseStore::new(&config.firebase, session)),
        )
    }

    #[cfg(not(feature = "network"))]
    fn firebase(_config: &Config, files: JsonStore) -> Self {
        tracing::warn!("built without the network feature, using local backend");
        Self::local(files)
    }

    /// Runs one request, reporting through `reply`. Auth listeners registered
    /// here forward every transition to `reply` as well.
    pub fn handle(&mut self, request: Request, reply: &mpsc::Sender<AppEvent>) {
        tracing::debug!(?request, "backend request");
        let completion = match request {
            Request::Subscribe => {
                if self.listener.is_none() {
                    let tx = reply.clone();
                    let id = self.identity.on_auth_state_changed(Box::new(move |user| {
                        let _ = tx.send(AppEvent::Backend(Completion::AuthChanged(user)));
                    }));
                    self.listener = Some(id);
                }
                return;
            }
            Request::Unsubscribe => {
                if let Some(id) = self.listener.take() {
                    self.identity.remove_listener(id);
                }
                return;
            }
            Request::SignIn {
                email,
                password,
                persistence,
            } => {
                let result = self
                    .identity
                    .set_persistence(persistence)
                    .and_then(|()| self.identity.sign_in(&email, &password));
                if let Err(ref e) = result {
                    tracing::info!(error = %e, "sign-in rejected");
                }
                Completion::SignedIn(result)
            }
            Request::SignUp { email, password } => {
                Completion::SignedUp(self.identity.sign_up(&email, &password))
            }
            Request::SignOut => Completion::SignedOut(self.identity.sign_out()),
            Request::ResetPassword { email } => {
                Completion::ResetSent(self.identity.send_password_reset(&email))
            }
            Request::Fetch { epoch, user } => {
                let result = fetcher::fetch(self.store.as_mut(), &user);
                if let Err(ref e) = result {
                    tracing::warn!(error = %e, "loading flashcards failed");
                }
                Completion::Fetched { epoch, result }
            }
            Request::Store {
                epoch,
                user,
                command,
            } => Completion::Stored {
                epoch,
                outcome: command.execute(self.store.as_mut(), &user),
            },
        };
        let _ = reply.send(AppEvent::Backend(completion));
    }
}

/// Sending half of the worker's request queue.
#[derive(Clone)]
pub struct BackendHandle {
    tx: mpsc::Sender<Request>,
}

impl BackendHandle {
    /// Moves `backend` onto its own thread. The thread exits once every
    /// handle is dropped.
    pub fn spawn(mut backend: Backend, reply: mpsc::Sender<AppEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        thread::spawn(move || {
            for request in rx {
                backend.handle(request, &reply);
            }
            tracing::debug!("backend worker stopped");
        });
        Self { tx }
    }

    pub fn send(&self, request: Request) {
        if self.tx.send(request).is_err() {
            tracing::error!("backend worker is gone, request dropped");
        }
    }
}
