//! Screen controller flows against scripted AI doubles: dashboard lookups, triage
//! chat, fitness plans, booking and pharmacy checkout.
//!
//! Run with: `cargo test --test screens_test`

use async_trait::async_trait;
use healthbridge_core::ai::{ChatReply, Grounding};
use healthbridge_core::prompts::TRIAGE_FALLBACK_MESSAGE;
use healthbridge_core::views::dashboard::{INSIGHTS_LOADING, INSIGHTS_UNAVAILABLE, LOCATION_DENIED_ALERT};
use healthbridge_core::views::pharmacy::ORDER_SUCCESS_MESSAGE;
use healthbridge_core::views::{
    CartPhase, ChatPhase, ClinicSearch, Dashboard, DashboardModels, FitnessCoach, Pharmacy, PlanUpdate,
    Telemedicine, TriageScreen,
};
use healthbridge_core::{
    AiError, AiResult, AiServices, AppState, ChatCapability, ChatRole, ChatSession, Coordinates, DeniedGeolocator,
    FitnessLevel, FixedGeolocator, GenerateRequest, GenerateResponse, GroundingSource, HealthBridgeConfig,
    PersistentStore, ProfilePatch, Province, ReadingKind, RetryPolicy, SharedAppState, TextGenerator,
    ValidationError,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn source(title: &str) -> GroundingSource {
    GroundingSource {
        title: title.to_string(),
        uri: format!("https://example.org/{}", title.to_lowercase().replace(' ', "-")),
    }
}

/// Answers by grounding kind and records every request it sees.
#[derive(Default)]
struct ScriptedAi {
    fail: bool,
    seen: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedAi {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.seen.lock().expect("lock").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedAi {
    async fn generate(&self, request: GenerateRequest) -> AiResult<GenerateResponse> {
        self.seen.lock().expect("lock").push(request.clone());
        if self.fail {
            return Err(AiError::Status {
                status: 403,
                body: "forbidden".into(),
            });
        }
        let response = match request.grounding {
            Some(Grounding::WebSearch) => GenerateResponse {
                text: "Measles outbreak reported; vaccination drive under way.".into(),
                sources: vec![source("Health Alert")],
            },
            Some(Grounding::Maps { .. }) => GenerateResponse {
                text: "Two facilities nearby.".into(),
                sources: vec![source("Clinic A"), source("Pharmacy B")],
            },
            None => GenerateResponse {
                text: r#"{"workout":["Walk"],"nutrition":["Pap and morogo"],"advice":"Pace yourself."}"#.into(),
                sources: Vec::new(),
            },
        };
        Ok(response)
    }
}

/// Waits for a release signal before answering.
struct GatedAi {
    gate: Arc<Notify>,
}

#[async_trait]
impl TextGenerator for GatedAi {
    async fn generate(&self, _request: GenerateRequest) -> AiResult<GenerateResponse> {
        self.gate.notified().await;
        Ok(GenerateResponse {
            text: "late news".into(),
            sources: vec![source("Late")],
        })
    }
}

fn shared_state(province: Province) -> SharedAppState {
    let mut state = AppState::open(PersistentStore::in_memory());
    state.set_profile(&ProfilePatch::name("Thabo"));
    state.set_profile(&ProfilePatch::province(province));
    state.complete_onboarding().expect("onboard");
    state.into_shared()
}

fn policy() -> RetryPolicy {
    RetryPolicy::no_retry(Duration::from_secs(5))
}

fn models() -> DashboardModels {
    DashboardModels {
        insights: "insights-model".into(),
        clinics: "clinics-model".into(),
    }
}

#[tokio::test]
async fn test_dashboard_insights_follow_profile_province() {
    let state = shared_state(Province::Limpopo);
    let ai = Arc::new(ScriptedAi::default());
    let mut dashboard = Dashboard::new(Arc::clone(&state), ai.clone(), models(), policy());
    assert_eq!(dashboard.insights_text(), INSIGHTS_LOADING);

    let insights = dashboard.refresh_if_province_changed().await.expect("fresh").clone();
    assert_eq!(insights.province, Province::Limpopo);
    assert_eq!(insights.sources, vec![source("Health Alert")]);

    // Same province: no new request.
    dashboard.refresh_if_province_changed().await;
    let requests = ai.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.model, "insights-model");
    assert_eq!(request.grounding, Some(Grounding::WebSearch));
    assert!(request.prompt.contains("Limpopo"));

    state.write().await.set_profile(&ProfilePatch::province(Province::WesternCape));
    let insights = dashboard.refresh_if_province_changed().await.expect("fresh");
    assert_eq!(insights.province, Province::WesternCape);
    assert_eq!(ai.requests().len(), 2);
}

#[tokio::test]
async fn test_dashboard_insights_failure_shows_unavailable() {
    let state = shared_state(Province::Gauteng);
    let mut dashboard = Dashboard::new(state, Arc::new(ScriptedAi::failing()), models(), policy());
    let insights = dashboard.refresh_insights(Province::Gauteng).await.expect("fresh");
    assert_eq!(insights.text, INSIGHTS_UNAVAILABLE);
    assert!(insights.sources.is_empty());
}

/// Fails its first call, then answers normally.
#[derive(Default)]
struct FlakyAi {
    calls: Mutex<usize>,
}

#[async_trait]
impl TextGenerator for FlakyAi {
    async fn generate(&self, _request: GenerateRequest) -> AiResult<GenerateResponse> {
        let mut calls = self.calls.lock().expect("lock");
        *calls += 1;
        if *calls == 1 {
            return Err(AiError::Status {
                status: 403,
                body: "forbidden".into(),
            });
        }
        Ok(GenerateResponse {
            text: "Flu season has started.".into(),
            sources: vec![source("Flu Alert")],
        })
    }
}

#[tokio::test]
async fn test_dashboard_retries_news_after_a_failed_lookup() {
    let state = shared_state(Province::Mpumalanga);
    let ai = Arc::new(FlakyAi::default());
    let mut dashboard = Dashboard::new(state, ai.clone(), models(), policy());

    let first = dashboard.refresh_if_province_changed().await.expect("fresh");
    assert_eq!(first.text, INSIGHTS_UNAVAILABLE);

    let second = dashboard.refresh_if_province_changed().await.expect("fresh");
    assert_eq!(second.text, "Flu season has started.");
    assert_eq!(*ai.calls.lock().expect("lock"), 2);

    // A good result is kept for the same province.
    dashboard.refresh_if_province_changed().await;
    assert_eq!(*ai.calls.lock().expect("lock"), 2);
}

#[tokio::test]
async fn test_dashboard_dismissed_while_loading_drops_result() {
    let state = shared_state(Province::Gauteng);
    let gate = Arc::new(Notify::new());
    let mut dashboard = Dashboard::new(state, Arc::new(GatedAi { gate: Arc::clone(&gate) }), models(), policy());
    let handle = dashboard.dismiss_handle();

    let (landed, ()) = tokio::join!(dashboard.refresh_insights(Province::Gauteng), async {
        handle.dismiss();
        gate.notify_one();
    });
    assert!(landed.is_none());
    assert!(dashboard.insights().is_none());
    assert_eq!(dashboard.insights_text(), INSIGHTS_LOADING);
}

#[tokio::test]
async fn test_dashboard_clinics_use_position_and_handle_denial() {
    let state = shared_state(Province::Gauteng);
    let ai = Arc::new(ScriptedAi::default());
    let mut dashboard = Dashboard::new(state, ai.clone(), models(), policy());

    let denied = dashboard.locate_clinics(&DeniedGeolocator).await;
    assert_eq!(denied, ClinicSearch::LocationDenied(LOCATION_DENIED_ALERT.to_string()));
    assert!(ai.requests().is_empty());

    let here = FixedGeolocator(Coordinates {
        latitude: -26.2041,
        longitude: 28.0473,
    });
    match dashboard.locate_clinics(&here).await {
        ClinicSearch::Found(found) => assert_eq!(found.len(), 2),
        other => panic!("unexpected clinic search result: {:?}", other),
    }
    assert_eq!(
        ai.requests()[0].grounding,
        Some(Grounding::Maps {
            latitude: -26.2041,
            longitude: 28.0473
        })
    );
    assert_eq!(dashboard.clinics().len(), 2);
}

#[tokio::test]
async fn test_dashboard_clinic_failure_is_an_empty_list() {
    let state = shared_state(Province::Gauteng);
    let mut dashboard = Dashboard::new(state, Arc::new(ScriptedAi::failing()), models(), policy());
    let here = FixedGeolocator(Coordinates {
        latitude: -29.85,
        longitude: 31.02,
    });
    assert_eq!(dashboard.locate_clinics(&here).await, ClinicSearch::Found(Vec::new()));
}

#[tokio::test]
async fn test_logging_weight_updates_latest_value() {
    let state = shared_state(Province::KwaZuluNatal);
    let dashboard = Dashboard::new(Arc::clone(&state), Arc::new(ScriptedAi::default()), models(), policy());
    let mut rx = state.read().await.subscribe();

    assert_eq!(
        dashboard.log_reading(ReadingKind::Glucose, "  ").await,
        Err(ValidationError::EmptyReadingValue)
    );
    let reading = dashboard.log_reading(ReadingKind::Weight, "74.5").await.expect("logged");
    assert_eq!(reading.value, "74.5");
    assert_eq!(state.read().await.latest_value(ReadingKind::Weight), "74.5");
    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(rx.borrow_and_update().readings.len(), 1);
}

struct FailingSession;

#[async_trait]
impl ChatSession for FailingSession {
    async fn send(&self, _text: &str) -> AiResult<ChatReply> {
        Err(AiError::Timeout)
    }
}

struct FailingChat;

impl ChatCapability for FailingChat {
    fn open_session(&self, _preamble: &str) -> AiResult<Arc<dyn ChatSession>> {
        Ok(Arc::new(FailingSession))
    }
}

#[tokio::test]
async fn test_triage_failure_shows_fallback_and_recovers_after_remount() {
    let state = shared_state(Province::EasternCape);
    let profile = state.read().await.profile().clone();

    let mut screen = TriageScreen::new(Arc::new(FailingChat), policy());
    screen.mount(&profile).expect("mount");
    let reply = screen.send("I have a rash").await.expect("send");
    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(reply.text, TRIAGE_FALLBACK_MESSAGE);
    assert_eq!(screen.phase(), ChatPhase::Idle);
    screen.unmount();

    // A fresh mount gets a fresh session with an empty transcript.
    let ai = AiServices::from_config(&HealthBridgeConfig::default());
    let mut screen = TriageScreen::new(ai.chat, policy());
    screen.mount(&profile).expect("mount");
    assert!(screen.transcript().is_empty());
    let reply = screen.send("I have chest pain").await.expect("send");
    assert!(reply.text.contains("112"));
}

#[tokio::test]
async fn test_fitness_plan_from_schema_reply() {
    let ai = Arc::new(ScriptedAi::default());
    let mut coach = FitnessCoach::new(ai.clone(), "plan-model", policy(), Province::Mpumalanga);
    let update = coach
        .generate("Lose 5kg", FitnessLevel::Professional, Province::Mpumalanga)
        .await;
    assert_eq!(update, PlanUpdate::Generated);
    assert_eq!(coach.plan().expect("plan").nutrition, vec!["Pap and morogo".to_string()]);
    let requests = ai.requests();
    let request = &requests[0];
    assert_eq!(request.model, "plan-model");
    assert!(request.response_schema.is_some());
    assert!(request.prompt.contains("Professional"));
}

#[test]
fn test_booking_confirmation() {
    let mut tele = Telemedicine::new();
    tele.set_search("derm");
    let id = tele.results()[0].id.clone();
    tele.select(&id).expect("select");
    tele.choose_slot("13:00").expect("slot");
    let booking = tele.confirm().expect("confirm");
    assert_eq!(booking.doctor.name, "Dr. Amina Pillay");
    assert_eq!(booking.fee, 550);
}

#[tokio::test]
async fn test_checkout_blocked_until_script_uploaded() {
    let state = shared_state(Province::Gauteng);
    let mut pharmacy = Pharmacy::new(Arc::clone(&state));
    pharmacy.add_to_cart("p3").expect("add");
    pharmacy.add_to_cart("p1").expect("add");
    pharmacy.open_checkout().expect("checkout");

    assert_eq!(pharmacy.submit_order().await, Err(ValidationError::PrescriptionRequired));
    assert_eq!(pharmacy.phase(), CartPhase::Blocked);
    assert_eq!(pharmacy.cart().len(), 2);

    assert!(matches!(
        pharmacy.upload_script("notes.docx", Some("application/msword")).await,
        Err(ValidationError::UnsupportedScriptFormat(_))
    ));
    pharmacy.upload_script("script.png", Some("image/png")).await.expect("upload");
    assert!(state.read().await.script_uploaded());

    let order = pharmacy.submit_order().await.expect("order");
    assert_eq!(order.item_count, 2);
    assert!((order.total - 365.0).abs() < 1e-9);
    assert_eq!(order.message, ORDER_SUCCESS_MESSAGE);
    assert!(pharmacy.cart().is_empty());
    assert_eq!(pharmacy.phase(), CartPhase::OrderPlaced);
}
