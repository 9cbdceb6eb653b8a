//! Structured fitness and nutrition plan generation.

use crate::model::{FitnessLevel, Province};
use serde_json::json;

pub const FITNESS_PLAN_USER_TEMPLATE: &str = r#"Generate a health and nutrition plan for a user in {province}, South Africa.
Goal: {goal}
Current Fitness Level: {level}
Please include local food recommendations (e.g. Pap, Biltong, Morogo)."#;

pub fn fitness_plan_prompt(goal: &str, level: FitnessLevel, province: Province) -> String {
    FITNESS_PLAN_USER_TEMPLATE
        .replace("{province}", province.label())
        .replace("{goal}", goal.trim())
        .replace("{level}", level.label())
}

/// Response schema: `{ workout: [string], nutrition: [string], advice: string }`, all required.
pub fn fitness_plan_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "workout": { "type": "ARRAY", "items": { "type": "STRING" } },
            "nutrition": { "type": "ARRAY", "items": { "type": "STRING" } },
            "advice": { "type": "STRING" }
        },
        "required": ["workout", "nutrition", "advice"]
    })
}
