//! Error types for HealthBridge.
//!
//! None of these are fatal to the application: view controllers turn store and
//! AI failures into safe fallbacks, and validation errors are returned as values
//! so the caller can show them inline next to the control that triggered them.

use thiserror::Error;

/// Result alias for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for AI collaborator calls.
pub type AiResult<T> = Result<T, AiError>;

/// Failures reading or writing the local durable store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend: {0}")]
    Backend(#[from] sled::Error),

    #[error("stored record `{key}` is malformed: {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not serialize record `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the generative-AI collaborator.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI response parse failed: {0}")]
    Parse(String),

    #[error("AI request timed out")]
    Timeout,

    #[error("no API key configured")]
    MissingApiKey,

    #[error("AI service returned an empty response")]
    EmptyResponse,

    #[error("chat session has been disposed")]
    SessionDisposed,
}

impl AiError {
    /// Errors worth retrying with backoff: the request likely never landed or the
    /// service asked us to slow down.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Transport(_) | AiError::Timeout => true,
            AiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// User-correctable input problems. Surfaced inline, never thrown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please tell us your name to get started.")]
    EmptyName,

    #[error("Enter a value before saving the reading.")]
    EmptyReadingValue,

    #[error("Your cart contains prescription items. Please upload your script first.")]
    PrescriptionRequired,

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Open checkout before placing the order.")]
    CheckoutNotOpen,

    #[error("Scripts must be an image or a PDF (got `{0}`).")]
    UnsupportedScriptFormat(String),

    #[error("No doctor with id `{0}`.")]
    UnknownDoctor(String),

    #[error("No product with id `{0}`.")]
    UnknownProduct(String),

    #[error("Slot `{0}` is not available for this doctor.")]
    SlotUnavailable(String),

    #[error("Choose a doctor and a time slot first.")]
    BookingIncomplete,
}

/// One-shot device geolocation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Misuse of the triage chat screen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("triage screen is not mounted")]
    NotMounted,

    #[error("triage screen has been disposed")]
    Disposed,

    #[error("a message is already being sent")]
    SendInFlight,

    #[error("message is empty")]
    EmptyMessage,
}
