//! Triage assistant instruction and the fixed failure reply.

use crate::model::UserProfile;

/// Appended to every triage session's context. Identifies the assistant's role and
/// mandates the non-diagnostic disclaimer.
pub const TRIAGE_SYSTEM: &str = "You are an AI Triage Assistant for HealthBridge SA. \
Your goal is to help users decide if they need to see a doctor. \
Use Google Search to check for current health outbreaks in SA. \
ALWAYS include a disclaimer that you are not a doctor.";

/// Shown in place of any failed reply. Never replaced by the raw error.
pub const TRIAGE_FALLBACK_MESSAGE: &str = "I'm having trouble connecting. Please try again or visit your nearest clinic if it's an emergency.";

/// Full system instruction for one triage session: who the user is, then the fixed role text.
pub fn triage_preamble(profile: &UserProfile) -> String {
    format!(
        "User is {} from {}. {}",
        profile.name.trim(),
        profile.province,
        TRIAGE_SYSTEM
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Province;

    #[test]
    fn preamble_names_user_and_keeps_disclaimer() {
        let profile = UserProfile {
            name: "Lerato ".into(),
            province: Province::FreeState,
            ..Default::default()
        };
        let p = triage_preamble(&profile);
        assert!(p.starts_with("User is Lerato from Free State."));
        assert!(p.contains("not a doctor"));
    }
}
