//! Prompt templates for the triage assistant, dashboard lookups, and plan generation.

pub mod dashboard;
pub mod fitness;
pub mod triage;

pub use dashboard::{clinics_prompt, insights_prompt, CLINICS_USER_PROMPT, INSIGHTS_USER_TEMPLATE};
pub use fitness::{fitness_plan_prompt, fitness_plan_schema, FITNESS_PLAN_USER_TEMPLATE};
pub use triage::{triage_preamble, TRIAGE_FALLBACK_MESSAGE, TRIAGE_SYSTEM};
