//! Line-oriented screens: one command per line, output on stdout.

use healthbridge_core::catalog::{EMERGENCY_NUMBER, EMERGENCY_PROMPT};
use healthbridge_core::views::pharmacy::SCRIPT_UPLOADED_MESSAGE;
use healthbridge_core::views::{
    BookingConfirmation, CartPhase, CategoryFilter, ClinicSearch, Dashboard, DashboardModels, FitnessCoach, Pharmacy,
    PlanUpdate, Telemedicine, TriageScreen,
};
use healthbridge_core::{
    AiServices, FitnessLevel, Geolocator, GroundingSource, HealthBridgeConfig, ProfilePatch, Province, ReadingKind,
    RetryPolicy, SharedAppState, SubscriptionTier, ValidationError, NO_READING,
};
use std::io::Write;
use std::sync::Arc;
use tracing::debug;

const HELP: &str = "\
Commands:
  profile                      show your profile
  set name|province|age|tier <value>
  log bp|weight|glucose <value>  record a reading (bp as 120/80)
  latest                       latest value of each reading
  trend                        last 7 weight readings
  insights                     health news for your province
  clinics                      clinics and pharmacies near you
  triage <message>             chat with the symptom checker
  triage end                   close the chat (history is discarded)
  goal <text> | level <lvl>    fitness plan inputs
  plan                         generate a fitness plan
  doctors [search]             list doctors
  book <doctor id> <slot>      book a consultation
  shop [category|all]          browse the pharmacy
  add <product id>             add to cart
  cart                         show the cart
  upload <file> [mime]         upload a prescription script
  checkout                     review the cart
  order                        place the order
  emergency                    emergency services
  quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Onboarding {
    Name,
    Province,
}

pub struct Shell {
    state: SharedAppState,
    ai: AiServices,
    geo: Arc<dyn Geolocator>,
    policy: RetryPolicy,
    plan_model: String,
    onboarding: Option<Onboarding>,
    dashboard: Dashboard,
    triage: Option<TriageScreen>,
    coach: Option<FitnessCoach>,
    telemedicine: Telemedicine,
    pharmacy: Pharmacy,
}

impl Shell {
    pub fn new(cfg: &HealthBridgeConfig, state: SharedAppState, ai: AiServices, geo: Arc<dyn Geolocator>) -> Self {
        let policy = RetryPolicy::from_config(cfg);
        let dashboard = Dashboard::new(
            Arc::clone(&state),
            Arc::clone(&ai.text),
            DashboardModels::from_config(cfg),
            policy,
        );
        let pharmacy = Pharmacy::new(Arc::clone(&state));
        Self {
            state,
            ai,
            geo,
            policy,
            plan_model: cfg.plan_model.clone(),
            onboarding: None,
            dashboard,
            triage: None,
            coach: None,
            telemedicine: Telemedicine::new(),
            pharmacy,
        }
    }

    pub async fn greet(&mut self) {
        let state = self.state.read().await;
        if state.needs_onboarding() {
            println!("Welcome to HealthBridge SA. Let's set up your profile.");
            self.onboarding = Some(Onboarding::Name);
        } else {
            println!("Sawubona, {}. Type `help` for commands.", state.profile().name);
        }
    }

    pub fn prompt(&self) {
        match self.onboarding {
            Some(Onboarding::Name) => print!("Your name: "),
            Some(Onboarding::Province) => {
                let labels: Vec<&str> = Province::ALL.iter().map(|p| p.label()).collect();
                print!("Province ({}) [Gauteng]: ", labels.join(", "));
            }
            None => print!("> "),
        }
        let _ = std::io::stdout().flush();
    }

    pub async fn handle(&mut self, line: &str) -> Flow {
        if let Some(step) = self.onboarding {
            self.onboard(step, line.trim()).await;
            return Flow::Continue;
        }
        let line = line.trim();
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        debug!(command = cmd, "command");
        match cmd.to_ascii_lowercase().as_str() {
            "" => {}
            "help" | "?" => println!("{}", HELP),
            "profile" => self.show_profile().await,
            "set" => self.set(rest).await,
            "log" => self.log(rest).await,
            "latest" => self.latest().await,
            "trend" => self.trend().await,
            "insights" => self.insights().await,
            "clinics" => self.clinics().await,
            "triage" => self.triage(rest).await,
            "goal" => {
                self.coach().await.set_goal(rest);
                println!("Goal set.");
            }
            "level" => match rest.parse::<FitnessLevel>() {
                Ok(level) => {
                    self.coach().await.set_level(level);
                    println!("Level set to {}.", level.label());
                }
                Err(e) => println!("{}", e),
            },
            "plan" => self.plan().await,
            "doctors" => self.doctors(rest),
            "book" => self.book(rest),
            "shop" => self.shop(rest),
            "add" => match self.pharmacy.add_to_cart(rest) {
                Ok(p) => println!("Added {} (R{:.2}).", p.name, p.price),
                Err(e) => println!("{}", e),
            },
            "cart" => self.cart(),
            "upload" => self.upload(rest).await,
            "checkout" => match self.pharmacy.open_checkout() {
                Ok(()) => self.cart(),
                Err(e) => println!("{}", e),
            },
            "order" => match self.pharmacy.submit_order().await {
                Ok(order) => println!(
                    "{} (order {}, {} items, R{:.2})",
                    order.message, order.order_id, order.item_count, order.total
                ),
                Err(e) => println!("{}", e),
            },
            "emergency" => {
                println!("{}", EMERGENCY_PROMPT);
                println!("Call {} now.", EMERGENCY_NUMBER);
            }
            "quit" | "exit" => return Flow::Quit,
            other => println!("Unknown command `{}`. Type `help`.", other),
        }
        Flow::Continue
    }

    /// End every screen so late AI replies are dropped.
    pub fn close(&mut self) {
        self.dashboard.close();
        if let Some(coach) = &self.coach {
            coach.close();
        }
        if let Some(triage) = self.triage.as_mut() {
            triage.unmount();
        }
    }

    async fn onboard(&mut self, step: Onboarding, input: &str) {
        match step {
            Onboarding::Name => {
                if input.is_empty() {
                    println!("{}", ValidationError::EmptyName);
                    return;
                }
                self.state.write().await.set_profile(&ProfilePatch::name(input));
                self.onboarding = Some(Onboarding::Province);
            }
            Onboarding::Province => {
                let province = if input.is_empty() {
                    Province::default()
                } else {
                    match input.parse::<Province>() {
                        Ok(p) => p,
                        Err(e) => {
                            println!("{}", e);
                            return;
                        }
                    }
                };
                let mut state = self.state.write().await;
                state.set_profile(&ProfilePatch::province(province));
                match state.complete_onboarding() {
                    Ok(()) => {
                        self.onboarding = None;
                        println!("Welcome, {}! Type `help` for commands.", state.profile().name);
                    }
                    Err(e) => {
                        println!("{}", e);
                        self.onboarding = Some(Onboarding::Name);
                    }
                }
            }
        }
    }

    async fn show_profile(&self) {
        let state = self.state.read().await;
        let p = state.profile();
        println!("Name:      {}", p.name);
        println!("Province:  {}", p.province);
        println!("Age:       {}", p.age.map(|a| a.to_string()).unwrap_or_else(|| "-".into()));
        println!("Plan:      {:?}", p.subscription);
    }

    async fn set(&mut self, rest: &str) {
        let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let value = value.trim();
        let patch = match field.to_ascii_lowercase().as_str() {
            "name" if !value.is_empty() => ProfilePatch::name(value),
            "province" => match value.parse::<Province>() {
                Ok(p) => ProfilePatch::province(p),
                Err(e) => return println!("{}", e),
            },
            "age" if value.eq_ignore_ascii_case("none") => ProfilePatch::default().with_age(None),
            "age" => match value.parse::<u32>() {
                Ok(a) => ProfilePatch::default().with_age(Some(a)),
                Err(_) => return println!("Age must be a whole number or `none`."),
            },
            "tier" => match value.parse::<SubscriptionTier>() {
                Ok(t) => ProfilePatch::default().with_subscription(t),
                Err(e) => return println!("{}", e),
            },
            _ => return println!("Usage: set name|province|age|tier <value>"),
        };
        self.state.write().await.set_profile(&patch);
        println!("Profile updated.");
    }

    async fn log(&mut self, rest: &str) {
        let (kind, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let kind = match kind.parse::<ReadingKind>() {
            Ok(k) => k,
            Err(e) => return println!("{}", e),
        };
        match self.dashboard.log_reading(kind, value).await {
            Ok(r) => println!("Saved {}: {} {}", r.kind.label(), r.value, r.kind.unit()),
            Err(e) => println!("{}", e),
        }
    }

    async fn latest(&self) {
        let state = self.state.read().await;
        for kind in [ReadingKind::BloodPressure, ReadingKind::Weight, ReadingKind::Glucose] {
            let value = state.latest_value(kind);
            if value == NO_READING {
                println!("{:<15} {}", kind.label(), value);
            } else {
                println!("{:<15} {} {}", kind.label(), value, kind.unit());
            }
        }
    }

    async fn trend(&self) {
        let series = self.state.read().await.weight_series(7);
        if series.is_empty() {
            return println!("No weight readings yet.");
        }
        for (date, kg) in series {
            println!("{}  {:>6.1} kg", date.format("%Y-%m-%d %H:%M"), kg);
        }
    }

    async fn insights(&mut self) {
        match self.dashboard.refresh_if_province_changed().await {
            Some(insights) => {
                println!("{} health updates:\n{}", insights.province, insights.text);
                print_sources(&insights.sources);
            }
            None => println!("{}", self.dashboard.insights_text()),
        }
    }

    async fn clinics(&mut self) {
        match self.dashboard.locate_clinics(self.geo.as_ref()).await {
            ClinicSearch::Found(found) if found.is_empty() => println!("No facilities found nearby."),
            ClinicSearch::Found(found) => print_sources(&found),
            ClinicSearch::LocationDenied(alert) => println!("{}", alert),
            ClinicSearch::Stale => {}
        }
    }

    async fn triage(&mut self, rest: &str) {
        if rest.eq_ignore_ascii_case("end") {
            if let Some(mut screen) = self.triage.take() {
                screen.unmount();
            }
            return println!("Chat closed.");
        }
        if self.triage.is_none() {
            let profile = self.state.read().await.profile().clone();
            let mut screen = TriageScreen::new(Arc::clone(&self.ai.chat), self.policy);
            if let Err(e) = screen.mount(&profile) {
                return println!("{}", e);
            }
            println!(
                "Symptom checker: I am an AI assistant, not a doctor. In an emergency call {}.",
                EMERGENCY_NUMBER
            );
            self.triage = Some(screen);
        }
        let Some(screen) = self.triage.as_mut() else {
            return;
        };
        match screen.send(rest).await {
            Ok(reply) => {
                println!("{}", reply.text);
                print_sources(screen.sources());
            }
            Err(e) => println!("{}", e),
        }
    }

    /// Opened on first use; the default goal follows the province at that moment.
    async fn coach(&mut self) -> &mut FitnessCoach {
        let province = self.state.read().await.profile().province;
        let (ai, model, policy) = (&self.ai.text, &self.plan_model, self.policy);
        self.coach
            .get_or_insert_with(|| FitnessCoach::new(Arc::clone(ai), model.clone(), policy, province))
    }

    async fn plan(&mut self) {
        let province = self.state.read().await.profile().province;
        let coach = self.coach().await;
        println!("Analyzing data for \"{}\" ({})...", coach.goal(), coach.level().label());
        match coach.regenerate(province).await {
            PlanUpdate::Generated | PlanUpdate::Fallback => {
                if let Some(plan) = coach.plan() {
                    println!("Workout:");
                    plan.workout.iter().for_each(|w| println!("  - {}", w));
                    println!("Nutrition:");
                    plan.nutrition.iter().for_each(|n| println!("  - {}", n));
                    println!("\"{}\"", plan.advice);
                }
            }
            PlanUpdate::Unchanged => println!("Could not generate a plan right now. Please try again."),
            PlanUpdate::Stale => {}
        }
    }

    fn doctors(&mut self, search: &str) {
        self.telemedicine.set_search(search);
        let results = self.telemedicine.results();
        if results.is_empty() {
            return println!("No doctors match `{}`.", search);
        }
        for d in results {
            println!(
                "[{}] {} - {} ({}) {:.1}* R{}  slots: {}",
                d.id,
                d.name,
                d.specialty,
                d.location,
                d.rating,
                d.consultation_fee,
                d.availability.join(" ")
            );
        }
    }

    fn book(&mut self, rest: &str) {
        let (id, slot) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        match book_consultation(&mut self.telemedicine, id, slot) {
            Ok(b) => println!(
                "Booked {} at {} (R{}). A video link will be sent before your appointment.",
                b.doctor.name, b.slot, b.fee
            ),
            Err(e) => println!("{}", e),
        }
    }

    fn shop(&mut self, category: &str) {
        if !category.is_empty() {
            match category.parse::<CategoryFilter>() {
                Ok(f) => self.pharmacy.set_filter(f),
                Err(e) => return println!("{}", e),
            }
        }
        println!("Showing: {}", self.pharmacy.filter());
        for p in self.pharmacy.visible() {
            println!("[{}] {} ({}) R{:.2} - {}", p.id, p.name, p.category.label(), p.price, p.description);
        }
    }

    fn cart(&self) {
        let cart = self.pharmacy.cart();
        if cart.is_empty() {
            return println!("Your cart is empty.");
        }
        for p in cart {
            println!("  {} R{:.2}", p.name, p.price);
        }
        println!("Total: R{:.2}", self.pharmacy.cart_total());
        if self.pharmacy.has_prescription_item() {
            println!("Contains prescription items: a script is required.");
        }
        if self.pharmacy.phase() == CartPhase::Checkout {
            println!("Type `order` to confirm your purchase.");
        }
    }

    async fn upload(&mut self, rest: &str) {
        let mut parts = rest.split_whitespace();
        let Some(file) = parts.next() else {
            return println!("Usage: upload <file> [mime]");
        };
        match self.pharmacy.upload_script(file, parts.next()).await {
            Ok(()) => println!("{}", SCRIPT_UPLOADED_MESSAGE),
            Err(e) => println!("{}", e),
        }
    }
}

fn book_consultation(
    tele: &mut Telemedicine,
    doctor_id: &str,
    slot: &str,
) -> Result<BookingConfirmation, ValidationError> {
    tele.select(doctor_id)?;
    tele.choose_slot(slot)?;
    tele.confirm()
}

fn print_sources(sources: &[GroundingSource]) {
    for s in sources {
        println!("  * {} <{}>", s.title, s.uri);
    }
}
