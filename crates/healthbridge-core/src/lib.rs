//! healthbridge-core: personal health companion for South African users.
//!
//! Profile and vitals state with local persistence, the AI collaborator seam
//! (remote Gemini client or offline mock), and the controllers behind each screen:
//! dashboard, symptom triage, fitness coach, telemedicine and pharmacy.

pub mod ai;
pub mod catalog;
mod config;
mod error;
pub mod geo;
pub mod lifecycle;
pub mod model;
pub mod prompts;
pub mod session;
mod state;
pub mod store;
pub mod views;

pub use ai::{AiServices, ChatCapability, ChatSession, GenerateRequest, GenerateResponse, RetryPolicy, TextGenerator};
pub use crate::config::HealthBridgeConfig;
pub use error::{AiError, AiResult, ChatError, GeoError, StoreError, StoreResult, ValidationError};
pub use geo::{Coordinates, DeniedGeolocator, FixedGeolocator, Geolocator};
pub use model::{
    ChatMessage, ChatRole, Doctor, FitnessLevel, FitnessPlan, GroundingSource, HealthReading, Measurement,
    PharmacyProduct, ProductCategory, ProfilePatch, Province, ReadingKind, SubscriptionTier, UserProfile,
};
pub use state::{AppSnapshot, AppState, SharedAppState, NO_READING, READINGS_CAPACITY};
pub use store::{KeyValueBackend, MemoryBackend, PersistentStore, RecordKey, SledBackend};
