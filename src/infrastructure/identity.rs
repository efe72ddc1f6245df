//! Identity provider client: password sign-in, sign-out and auth-state notifications.

use crate::config::Settings;
use crate::core::traits::{AuthEvent, AuthProvider, AuthUser};
use crate::error::AuthError;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

const AUTH_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
struct AuthSession {
    access_token: String,
    user: AuthUser,
}

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
}

pub struct IdentityClient {
    auth_url: String,
    api_key: Option<String>,
    client: Client,
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<AuthEvent>,
}

#[injectable]
impl IdentityClient {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> IdentityClient {
        IdentityClient::new(&settings.auth_url, settings.api_key.clone())
    }
}

impl IdentityClient {
    pub fn new(auth_url: &str, api_key: Option<String>) -> Self {
        IdentityClient {
            auth_url: auth_url.trim_end_matches('/').to_owned(),
            api_key,
            client: Client::new(),
            session: RwLock::new(None),
            events: broadcast::channel(AUTH_EVENT_CAPACITY).0,
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let mut request = self
            .client
            .post(format!("{}/token", self.auth_url))
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if !status.is_success() {
            let reason = ["error_description", "msg", "error"]
                .iter()
                .find_map(|key| payload.get(*key).and_then(Value::as_str))
                .map(str::to_owned)
                .unwrap_or_else(|| status.to_string());
            return Err(AuthError::Rejected(reason));
        }

        let token: TokenResponse = serde_json::from_value(payload)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let user = AuthUser {
            id: token.user.id,
            email: token.user.email,
        };

        *self.session.write().await = Some(AuthSession {
            access_token: token.access_token,
            user: user.clone(),
        });
        info!("signed in as {}", user.id);
        self.publish(AuthEvent::SignedIn(user.clone()));

        Ok(user)
    }

    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
    }

    fn publish(&self, event: AuthEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthProvider for IdentityClient {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
        Ok(self
            .session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.clone()))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Drops the local session; the remote logout call is best-effort.
    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };

        let mut request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .bearer_auth(&session.access_token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        match request.send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("logout returned {}", response.status());
            }
            Ok(_) => {}
            Err(e) => warn!("logout request failed: {e}"),
        }

        info!("signed out {}", session.user.id);
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }
}
