//! Error types shared across the client.

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),
}

/// Failures of the session/message service.
#[derive(Debug, Error)]
pub enum StudyError {
    #[error("session name must not be empty")]
    EmptyName,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the AI chat or transcription endpoints.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {message}")]
    Remote {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}

/// Failures talking to the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sign-in rejected: {0}")]
    Rejected(String),

    #[error("malformed identity response: {0}")]
    MalformedResponse(String),
}

/// Failures capturing audio from the microphone.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("microphone unavailable: {0}")]
    Unavailable(String),

    #[error("no audio was captured")]
    EmptyRecording,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one send pipeline: auth check, AI call, insert.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("not signed in")]
    Unauthenticated,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Study(#[from] StudyError),
}
