//! Screen controllers. Each owns its transient UI state and talks to the shared
//! [`AppState`](crate::state::AppState) and the AI collaborator; none of them render.

pub mod dashboard;
pub mod fitness;
pub mod pharmacy;
pub mod telemedicine;
pub mod triage;

pub use dashboard::{ClinicSearch, Dashboard, DashboardModels, Insights};
pub use fitness::{FitnessCoach, PlanUpdate};
pub use pharmacy::{CartPhase, CategoryFilter, OrderConfirmation, Pharmacy};
pub use telemedicine::{BookingConfirmation, Telemedicine};
pub use triage::{ChatPhase, PendingSend, SendCompletion, TriageScreen};
