//! Firebase Realtime Database over its REST API.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde_json::Value;

use crate::auth::firebase::{SharedSession, http_client, lock, refresh_id_token};
use crate::config::FirebaseConfig;
use crate::store::push_id::PushIdGenerator;
use crate::store::{RecordPath, RecordStore, StoreError};

pub struct FirebaseStore {
    client: Client,
    api_key: String,
    database_url: String,
    session: SharedSession,
    ids: PushIdGenerator,
}

impl FirebaseStore {
    pub fn new(config: &FirebaseConfig, session: SharedSession) -> Self {
        Self {
            client: http_client(),
            api_key: config.api_key.clone(),
            database_url: config.database_url.trim_end_matches('/').to_string(),
            session,
            ids: PushIdGenerator::new(),
        }
    }

    fn url(&self, path: &RecordPath) -> String {
        format!("{}/{}.json", self.database_url, path)
    }

    /// Sends a request built by `build`, refreshing the id token and retrying
    /// once if the database rejects it as expired.
    fn send(&self, build: impl Fn(&Client) -> RequestBuilder) -> Result<Response, StoreError> {
        let mut refreshed = false;
        loop {
            let token = lock(&self.session)
                .id_token
                .clone()
                .ok_or(StoreError::Unauthenticated)?;
            let response = build(&self.client)
                .query(&[("auth", token.as_str())])
                .send()
                .map_err(|e| StoreError::Remote(e.to_string()))?;

            if response.status() == StatusCode::UNAUTHORIZED && !refreshed {
                refreshed = true;
                refresh_id_token(&self.client, &self.api_key, &self.session)
                    .map_err(|e| StoreError::Remote(format!("token refresh failed: {e}")))?;
                continue;
            }
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().unwrap_or_default();
                return Err(StoreError::Remote(format!("{status}: {body}")));
            }
            return Ok(response);
        }
    }
}

impl RecordStore for FirebaseStore {
    fn create_child(&mut self, path: &RecordPath) -> Result<String, StoreError> {
        let id = self.ids.next_id();
        tracing::debug!(%path, %id, "reserved child key");
        Ok(id)
    }

    fn write(&mut self, path: &RecordPath, value: Value) -> Result<(), StoreError> {
        let url = self.url(path);
        self.send(|client| client.put(&url).json(&value))?;
        Ok(())
    }

    fn delete(&mut self, path: &RecordPath) -> Result<(), StoreError> {
        let url = self.url(path);
        self.send(|client| client.delete(&url))?;
        Ok(())
    }

    fn read_subtree(&mut self, path: &RecordPath) -> Result<Value, StoreError> {
        let url = self.url(path);
        let response = self.send(|client| client.get(&url))?;
        response
            .json::<Value>()
            .map_err(|e| StoreError::Remote(e.to_string()))
    }
}
