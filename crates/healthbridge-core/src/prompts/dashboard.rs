//! Dashboard lookups: provincial health news and nearby facilities.

use crate::model::Province;

/// Placeholder `{province}` is replaced with the province label.
pub const INSIGHTS_USER_TEMPLATE: &str = "Find the 3 most important recent health news or public health alerts \
specifically for the {province} province in South Africa. Provide a brief summary for each.";

pub const CLINICS_USER_PROMPT: &str = "Find the nearest public and private health clinics and pharmacies \
to my current location. List their names and provide navigation links.";

pub fn insights_prompt(province: Province) -> String {
    INSIGHTS_USER_TEMPLATE.replace("{province}", province.label())
}

/// Location travels in the grounding config, not the prompt text.
pub fn clinics_prompt() -> String {
    CLINICS_USER_PROMPT.to_string()
}
