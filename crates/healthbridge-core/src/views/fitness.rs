//! Fitness coach: structured workout and nutrition plans.

use crate::ai::{GenerateRequest, RetryPolicy, TextGenerator};
use crate::lifecycle::{DismissHandle, ViewLifetime};
use crate::model::{FitnessLevel, FitnessPlan, Province};
use crate::prompts::{fitness_plan_prompt, fitness_plan_schema};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shown when the model answers with something that is not a plan.
pub fn fallback_plan() -> FitnessPlan {
    FitnessPlan {
        workout: vec!["Daily 30-minute walk".to_string()],
        nutrition: vec!["Local balanced meals".to_string()],
        advice: "Consult a professional.".to_string(),
    }
}

pub fn default_goal(province: Province) -> String {
    format!("Build healthy habits in {}", province)
}

/// What a `generate` call did to the displayed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanUpdate {
    Generated,
    /// Reply could not be read as a plan; [`fallback_plan`] is shown.
    Fallback,
    /// The request failed; whatever was shown before stays.
    Unchanged,
    Stale,
}

pub struct FitnessCoach {
    ai: Arc<dyn TextGenerator>,
    model: String,
    policy: RetryPolicy,
    goal: String,
    level: FitnessLevel,
    plan: Option<FitnessPlan>,
    loading: bool,
    lane: ViewLifetime,
}

impl FitnessCoach {
    pub fn new(ai: Arc<dyn TextGenerator>, model: impl Into<String>, policy: RetryPolicy, province: Province) -> Self {
        Self {
            ai,
            model: model.into(),
            policy,
            goal: default_goal(province),
            level: FitnessLevel::default(),
            plan: None,
            loading: false,
            lane: ViewLifetime::new(),
        }
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn set_goal(&mut self, goal: impl Into<String>) {
        self.goal = goal.into();
    }

    pub fn level(&self) -> FitnessLevel {
        self.level
    }

    pub fn set_level(&mut self, level: FitnessLevel) {
        self.level = level;
    }

    pub fn plan(&self) -> Option<&FitnessPlan> {
        self.plan.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Generate with the current goal and level.
    pub async fn regenerate(&mut self, province: Province) -> PlanUpdate {
        let goal = self.goal.clone();
        self.generate(&goal, self.level, province).await
    }

    pub async fn generate(&mut self, goal: &str, level: FitnessLevel, province: Province) -> PlanUpdate {
        self.goal = goal.to_string();
        self.level = level;
        let ticket = self.lane.issue();
        self.loading = true;

        let request = GenerateRequest::new(self.model.clone(), fitness_plan_prompt(goal, level, province))
            .with_schema(fitness_plan_schema());
        let ai = Arc::clone(&self.ai);
        let result = self
            .policy
            .run("fitness_plan", || {
                let ai = Arc::clone(&ai);
                let request = request.clone();
                async move { ai.generate(request).await }
            })
            .await;

        self.loading = false;
        if !self.lane.accepts(&ticket) {
            debug!("dropping stale fitness plan");
            return PlanUpdate::Stale;
        }
        match result {
            Ok(response) => match parse_plan(&response.text) {
                Some(plan) => {
                    info!(%province, level = level.label(), "fitness plan generated");
                    self.plan = Some(plan);
                    PlanUpdate::Generated
                }
                None => {
                    warn!("fitness plan reply was not valid JSON; using fallback");
                    self.plan = Some(fallback_plan());
                    PlanUpdate::Fallback
                }
            },
            Err(e) => {
                warn!(error = %e, "fitness plan request failed");
                PlanUpdate::Unchanged
            }
        }
    }

    pub fn dismiss_handle(&self) -> DismissHandle {
        DismissHandle::new(vec![self.lane.clone()])
    }

    pub fn close(&self) {
        self.lane.dispose();
    }
}

/// Accepts a bare JSON object or one wrapped in a ```json fence.
fn parse_plan(text: &str) -> Option<FitnessPlan> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerateResponse;
    use crate::error::{AiError, AiResult};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Canned(Result<&'static str, ()>);

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, request: GenerateRequest) -> AiResult<GenerateResponse> {
            assert!(request.response_schema.is_some());
            match self.0 {
                Ok(text) => Ok(GenerateResponse {
                    text: text.to_string(),
                    sources: Vec::new(),
                }),
                Err(()) => Err(AiError::Status { status: 400, body: "bad".into() }),
            }
        }
    }

    fn coach(reply: Result<&'static str, ()>) -> FitnessCoach {
        FitnessCoach::new(
            Arc::new(Canned(reply)),
            "plan-model",
            RetryPolicy::no_retry(Duration::from_secs(5)),
            Province::FreeState,
        )
    }

    #[test]
    fn defaults_follow_province() {
        let c = coach(Ok("{}"));
        assert_eq!(c.goal(), "Build healthy habits in Free State");
        assert_eq!(c.level(), FitnessLevel::Beginner);
        assert!(c.plan().is_none());
    }

    #[tokio::test]
    async fn valid_json_becomes_the_plan() {
        let mut c = coach(Ok(r#"{"workout":["Squats"],"nutrition":["Morogo"],"advice":"Hydrate."}"#));
        assert_eq!(c.regenerate(Province::FreeState).await, PlanUpdate::Generated);
        assert_eq!(c.plan().unwrap().workout, vec!["Squats".to_string()]);
        assert!(!c.is_loading());
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let mut c = coach(Ok("```json\n{\"workout\":[],\"nutrition\":[],\"advice\":\"Rest.\"}\n```"));
        assert_eq!(c.regenerate(Province::FreeState).await, PlanUpdate::Generated);
        assert_eq!(c.plan().unwrap().advice, "Rest.");
    }

    #[tokio::test]
    async fn malformed_json_shows_fallback() {
        let mut c = coach(Ok("here is your plan: run"));
        assert_eq!(c.regenerate(Province::FreeState).await, PlanUpdate::Fallback);
        assert_eq!(c.plan(), Some(&fallback_plan()));
    }

    #[tokio::test]
    async fn request_failure_keeps_previous_plan() {
        let mut c = coach(Err(()));
        assert_eq!(
            c.generate("Run 5km", FitnessLevel::Intermediate, Province::FreeState).await,
            PlanUpdate::Unchanged
        );
        assert!(c.plan().is_none());
        assert!(!c.is_loading());
        assert_eq!(c.goal(), "Run 5km");
    }

    #[tokio::test]
    async fn closed_coach_drops_late_plan() {
        let mut c = coach(Ok(r#"{"workout":[],"nutrition":[],"advice":"x"}"#));
        c.close();
        assert_eq!(c.regenerate(Province::FreeState).await, PlanUpdate::Stale);
        assert!(c.plan().is_none());
        assert!(!c.is_loading());
    }
}
