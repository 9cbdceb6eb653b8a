//! Dashboard: provincial health news, nearby clinics, and vitals logging.
//!
//! News and clinic lookups each have their own request lane, so a newer lookup
//! supersedes an older one and nothing lands after the dashboard is dismissed.

use crate::ai::{GenerateRequest, Grounding, RetryPolicy, TextGenerator};
use crate::config::HealthBridgeConfig;
use crate::error::ValidationError;
use crate::geo::Geolocator;
use crate::lifecycle::{DismissHandle, ViewLifetime};
use crate::model::{GroundingSource, HealthReading, Province, ReadingKind};
use crate::prompts::{clinics_prompt, insights_prompt};
use crate::state::SharedAppState;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const INSIGHTS_LOADING: &str = "Fetching provincial health updates...";
pub const INSIGHTS_UNAVAILABLE: &str = "Unable to fetch latest news.";
pub const LOCATION_DENIED_ALERT: &str = "Please enable location to find clinics.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insights {
    pub province: Province,
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClinicSearch {
    /// Facilities found (possibly none).
    Found(Vec<GroundingSource>),
    /// User must enable location; carries the alert text.
    LocationDenied(String),
    /// Superseded or the dashboard was dismissed.
    Stale,
}

#[derive(Debug, Clone)]
pub struct DashboardModels {
    pub insights: String,
    pub clinics: String,
}

impl DashboardModels {
    pub fn from_config(cfg: &HealthBridgeConfig) -> Self {
        Self {
            insights: cfg.insights_model.clone(),
            clinics: cfg.clinics_model.clone(),
        }
    }
}

pub struct Dashboard {
    state: SharedAppState,
    ai: Arc<dyn TextGenerator>,
    models: DashboardModels,
    policy: RetryPolicy,
    insights: Option<Insights>,
    insights_failed: bool,
    clinics: Vec<GroundingSource>,
    insights_lane: ViewLifetime,
    clinics_lane: ViewLifetime,
}

impl Dashboard {
    pub fn new(
        state: SharedAppState,
        ai: Arc<dyn TextGenerator>,
        models: DashboardModels,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            state,
            ai,
            models,
            policy,
            insights: None,
            insights_failed: false,
            clinics: Vec::new(),
            insights_lane: ViewLifetime::new(),
            clinics_lane: ViewLifetime::new(),
        }
    }

    /// Current news text: loading placeholder until the first lookup lands.
    pub fn insights_text(&self) -> &str {
        self.insights
            .as_ref()
            .map(|i| i.text.as_str())
            .unwrap_or(INSIGHTS_LOADING)
    }

    pub fn insights(&self) -> Option<&Insights> {
        self.insights.as_ref()
    }

    pub fn clinics(&self) -> &[GroundingSource] {
        &self.clinics
    }

    /// Fetch news for the profile's province unless already showing it. A lookup
    /// that ended in [`INSIGHTS_UNAVAILABLE`] is not kept; the next call tries again.
    pub async fn refresh_if_province_changed(&mut self) -> Option<&Insights> {
        let province = self.state.read().await.profile().province;
        if !self.insights_failed && self.insights.as_ref().map(|i| i.province) == Some(province) {
            return self.insights.as_ref();
        }
        self.refresh_insights(province).await
    }

    /// Web-grounded summary of recent alerts. Failure shows [`INSIGHTS_UNAVAILABLE`]
    /// with no sources. Returns `None` if the result arrived stale.
    pub async fn refresh_insights(&mut self, province: Province) -> Option<&Insights> {
        let ticket = self.insights_lane.issue();
        let request = GenerateRequest::new(self.models.insights.clone(), insights_prompt(province))
            .grounded(Grounding::WebSearch);
        let ai = Arc::clone(&self.ai);
        let result = self
            .policy
            .run("health_insights", || {
                let ai = Arc::clone(&ai);
                let request = request.clone();
                async move { ai.generate(request).await }
            })
            .await;

        if !self.insights_lane.accepts(&ticket) {
            debug!(%province, "dropping stale insights");
            return None;
        }
        let insights = match result {
            Ok(r) if !r.text.trim().is_empty() => Insights {
                province,
                text: r.text,
                sources: r.sources,
            },
            Ok(_) => {
                warn!(%province, "insights reply was empty");
                Insights {
                    province,
                    text: INSIGHTS_UNAVAILABLE.to_string(),
                    sources: Vec::new(),
                }
            }
            Err(e) => {
                warn!(%province, error = %e, "insights unavailable");
                Insights {
                    province,
                    text: INSIGHTS_UNAVAILABLE.to_string(),
                    sources: Vec::new(),
                }
            }
        };
        self.insights_failed = insights.text == INSIGHTS_UNAVAILABLE;
        self.insights = Some(insights);
        self.insights.as_ref()
    }

    /// One-shot location fix, then a maps-grounded facility search.
    pub async fn locate_clinics(&mut self, geo: &dyn Geolocator) -> ClinicSearch {
        let ticket = self.clinics_lane.issue();
        let position = match geo.current_position().await {
            Ok(p) => p,
            Err(e) => {
                info!(error = %e, "clinic search without location");
                return ClinicSearch::LocationDenied(LOCATION_DENIED_ALERT.to_string());
            }
        };
        let request = GenerateRequest::new(self.models.clinics.clone(), clinics_prompt()).grounded(
            Grounding::Maps {
                latitude: position.latitude,
                longitude: position.longitude,
            },
        );
        let ai = Arc::clone(&self.ai);
        let result = self
            .policy
            .run("nearby_clinics", || {
                let ai = Arc::clone(&ai);
                let request = request.clone();
                async move { ai.generate(request).await }
            })
            .await;

        if !self.clinics_lane.accepts(&ticket) {
            debug!("dropping stale clinic results");
            return ClinicSearch::Stale;
        }
        self.clinics = match result {
            Ok(r) => r.sources,
            Err(e) => {
                warn!(error = %e, "clinic search failed");
                Vec::new()
            }
        };
        ClinicSearch::Found(self.clinics.clone())
    }

    /// Vitals form submit. Blank values are refused; anything else is stored verbatim.
    pub async fn log_reading(&self, kind: ReadingKind, value: &str) -> Result<HealthReading, ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyReadingValue);
        }
        let reading = HealthReading::now(kind, value.trim());
        self.state.write().await.add_reading(reading.clone());
        info!(kind = %kind, "reading logged");
        Ok(reading)
    }

    /// Handle that dismisses this dashboard; all in-flight lookups become stale.
    pub fn dismiss_handle(&self) -> DismissHandle {
        DismissHandle::new(vec![self.insights_lane.clone(), self.clinics_lane.clone()])
    }

    pub fn close(&self) {
        self.dismiss_handle().dismiss();
    }
}
