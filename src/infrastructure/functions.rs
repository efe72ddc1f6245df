//! Client for the remote AI chat and transcription functions.

use crate::config::Settings;
use crate::core::traits::{AssistantBackend, ChatRequest};
use crate::error::BackendError;
use crate::infrastructure::identity::IdentityClient;
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, error};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionReply {
    text: String,
}

#[derive(Debug, Serialize)]
struct TranscriptionRequest<'a> {
    audio: &'a str,
}

pub struct EdgeFunctionsClient {
    chat_url: String,
    transcribe_url: String,
    api_key: Option<String>,
    identity: Option<Ref<IdentityClient>>,
    client: Client,
}

#[injectable(AssistantBackend)]
impl EdgeFunctionsClient {
    #[inject]
    pub fn create(settings: Ref<Settings>, identity: Ref<IdentityClient>) -> EdgeFunctionsClient {
        EdgeFunctionsClient::new(
            &settings.functions_url,
            &settings.chat_function,
            &settings.transcribe_function,
            settings.api_key.clone(),
        )
        .with_identity(identity)
    }
}

impl EdgeFunctionsClient {
    pub fn new(
        functions_url: &str,
        chat_function: &str,
        transcribe_function: &str,
        api_key: Option<String>,
    ) -> Self {
        let functions_url = functions_url.trim_end_matches('/');

        EdgeFunctionsClient {
            chat_url: format!("{functions_url}/{chat_function}"),
            transcribe_url: format!("{functions_url}/{transcribe_function}"),
            api_key,
            identity: None,
            client: Client::new(),
        }
    }

    /// Forwards the signed-in user's access token with every call.
    pub fn with_identity(mut self, identity: Ref<IdentityClient>) -> Self {
        self.identity = Some(identity);
        self
    }

    async fn invoke<B, R>(&self, url: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let token = match &self.identity {
            Some(identity) => identity.access_token().await,
            None => None,
        };
        if let Some(token) = token.as_ref().or(self.api_key.as_ref()) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| BackendError::Http {
            endpoint: url.to_owned(),
            source,
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| BackendError::Http {
            endpoint: url.to_owned(),
            source,
        })?;
        debug!("{url} answered {status}");

        let payload = match serde_json::from_str::<Value>(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => {
                return Err(BackendError::Remote {
                    endpoint: url.to_owned(),
                    status: status.as_u16(),
                    message: body,
                });
            }
            Err(e) => {
                return Err(BackendError::MalformedResponse {
                    endpoint: url.to_owned(),
                    reason: e.to_string(),
                });
            }
        };

        if let Some(message) = payload.get("error").and_then(error_message) {
            error!("{url} reported an error: {message}");
            return Err(BackendError::Remote {
                endpoint: url.to_owned(),
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            return Err(BackendError::Remote {
                endpoint: url.to_owned(),
                status: status.as_u16(),
                message: payload.to_string(),
            });
        }

        serde_json::from_value(payload).map_err(|e| BackendError::MalformedResponse {
            endpoint: url.to_owned(),
            reason: e.to_string(),
        })
    }
}

fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(fields) => Some(
            fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| value.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl AssistantBackend for EdgeFunctionsClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let reply: ChatReply = self.invoke(&self.chat_url, request).await?;
        Ok(reply.response)
    }

    async fn transcribe(&self, audio_base64: &str) -> Result<String, BackendError> {
        let reply: TranscriptionReply = self
            .invoke(
                &self.transcribe_url,
                &TranscriptionRequest {
                    audio: audio_base64,
                },
            )
            .await?;
        Ok(reply.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_urls_join_without_double_slash() {
        let client = EdgeFunctionsClient::new(
            "http://localhost:54321/functions/v1/",
            "study-chat",
            "transcribe-audio",
            None,
        );

        assert_eq!(client.chat_url, "http://localhost:54321/functions/v1/study-chat");
        assert_eq!(
            client.transcribe_url,
            "http://localhost:54321/functions/v1/transcribe-audio"
        );
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(&Value::Null), None);
        assert_eq!(error_message(&json!("quota")).as_deref(), Some("quota"));
        assert_eq!(
            error_message(&json!({"message": "bad image"})).as_deref(),
            Some("bad image")
        );
        assert_eq!(error_message(&json!(42)).as_deref(), Some("42"));
    }
}
