//! Shared data model: profile, readings, chat transcript entries, catalog records.
//!
//! Serialized shapes match what is written to local storage, so field renames here
//! are storage-format changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// -----------------------------------------------------------------------------
// Profile
// -----------------------------------------------------------------------------

/// The nine provinces a user can pick at onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Province {
    #[default]
    Gauteng,
    #[serde(rename = "Western Cape")]
    WesternCape,
    #[serde(rename = "KwaZulu-Natal")]
    KwaZuluNatal,
    #[serde(rename = "Eastern Cape")]
    EasternCape,
    #[serde(rename = "Free State")]
    FreeState,
    Limpopo,
    Mpumalanga,
    #[serde(rename = "North West")]
    NorthWest,
    #[serde(rename = "Northern Cape")]
    NorthernCape,
}

impl Province {
    pub const ALL: [Province; 9] = [
        Province::Gauteng,
        Province::WesternCape,
        Province::KwaZuluNatal,
        Province::EasternCape,
        Province::FreeState,
        Province::Limpopo,
        Province::Mpumalanga,
        Province::NorthWest,
        Province::NorthernCape,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Province::Gauteng => "Gauteng",
            Province::WesternCape => "Western Cape",
            Province::KwaZuluNatal => "KwaZulu-Natal",
            Province::EasternCape => "Eastern Cape",
            Province::FreeState => "Free State",
            Province::Limpopo => "Limpopo",
            Province::Mpumalanga => "Mpumalanga",
            Province::NorthWest => "North West",
            Province::NorthernCape => "Northern Cape",
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Province {
    type Err = String;

    /// Accepts the display label in any case, with or without separators
    /// ("western cape", "WesternCape", "kwazulu-natal").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Province::ALL
            .iter()
            .copied()
            .find(|p| {
                let label: String = p
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                label == norm
            })
            .ok_or_else(|| format!("unknown province: {}", s.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

/// The user's identity and settings record.
///
/// `onboarded` stays false until a non-empty name has been confirmed; once true
/// the onboarding gate is never shown again for this stored profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub province: Province,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub onboarded: bool,
    pub subscription: SubscriptionTier,
}

/// Partial profile update. `None` leaves a field untouched; `age: Some(None)` clears it.
///
/// `onboarded` is not patchable; only onboarding completion sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub province: Option<Province>,
    pub age: Option<Option<u32>>,
    pub subscription: Option<SubscriptionTier>,
}

impl ProfilePatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn province(province: Province) -> Self {
        Self {
            province: Some(province),
            ..Default::default()
        }
    }

    pub fn with_age(mut self, age: Option<u32>) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_subscription(mut self, tier: SubscriptionTier) -> Self {
        self.subscription = Some(tier);
        self
    }

    /// Merge into `profile`. Returns true when anything changed.
    pub fn apply_to(&self, profile: &mut UserProfile) -> bool {
        let before = profile.clone();
        if let Some(ref name) = self.name {
            profile.name = name.clone();
        }
        if let Some(province) = self.province {
            profile.province = province;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(tier) = self.subscription {
            profile.subscription = tier;
        }
        *profile != before
    }
}

// -----------------------------------------------------------------------------
// Readings
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingKind {
    #[serde(rename = "BP")]
    BloodPressure,
    Weight,
    Glucose,
}

impl ReadingKind {
    pub fn label(&self) -> &'static str {
        match self {
            ReadingKind::BloodPressure => "BP",
            ReadingKind::Weight => "Weight",
            ReadingKind::Glucose => "Glucose",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ReadingKind::BloodPressure => "mmHg",
            ReadingKind::Weight => "kg",
            ReadingKind::Glucose => "mmol/L",
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReadingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bp" | "blood-pressure" | "bloodpressure" => Ok(ReadingKind::BloodPressure),
            "weight" => Ok(ReadingKind::Weight),
            "glucose" => Ok(ReadingKind::Glucose),
            other => Err(format!("unknown reading type: {}", other)),
        }
    }
}

/// One health measurement. `value` is free text: BP as "systolic/diastolic",
/// the rest as numeric text. No format validation is applied on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReading {
    #[serde(rename = "type")]
    pub kind: ReadingKind,
    pub value: String,
    pub date: DateTime<Utc>,
}

/// Parsed view of a reading's free-text value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measurement {
    BloodPressure { systolic: u16, diastolic: u16 },
    Scalar(f64),
}

impl HealthReading {
    pub fn new(kind: ReadingKind, value: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            kind,
            value: value.into(),
            date,
        }
    }

    /// Stamped with the current time.
    pub fn now(kind: ReadingKind, value: impl Into<String>) -> Self {
        Self::new(kind, value, Utc::now())
    }

    /// Parse the stored text. `None` when it does not match the kind's format.
    pub fn measurement(&self) -> Option<Measurement> {
        let v = self.value.trim();
        match self.kind {
            ReadingKind::BloodPressure => {
                let (sys, dia) = v.split_once('/')?;
                Some(Measurement::BloodPressure {
                    systolic: sys.trim().parse().ok()?,
                    diastolic: dia.trim().parse().ok()?,
                })
            }
            ReadingKind::Weight | ReadingKind::Glucose => {
                let n = leading_number(v)?;
                n.is_finite().then_some(Measurement::Scalar(n))
            }
        }
    }
}

/// The longest numeric prefix of `text`, so "74.5 kg" reads as 74.5.
fn leading_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };
    let mut end = if matches!(bytes.first(), Some(b'+' | b'-')) { 1 } else { 0 };
    let int_end = digits_from(end);
    let mut mantissa = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        if frac_end > end + 1 || mantissa {
            mantissa |= frac_end > end + 1;
            end = frac_end;
        }
    }
    if !mantissa {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}

// -----------------------------------------------------------------------------
// Conversation + AI results
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Citation attached to an AI response. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessPlan {
    pub workout: Vec<String>,
    pub nutrition: Vec<String>,
    pub advice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitnessLevel {
    #[default]
    Beginner,
    Intermediate,
    Professional,
}

impl FitnessLevel {
    pub fn label(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "Beginner",
            FitnessLevel::Intermediate => "Intermediate",
            FitnessLevel::Professional => "Professional",
        }
    }
}

impl FromStr for FitnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(FitnessLevel::Beginner),
            "intermediate" => Ok(FitnessLevel::Intermediate),
            "professional" | "pro" => Ok(FitnessLevel::Professional),
            other => Err(format!("unknown fitness level: {}", other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Catalog records
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialty: String,
    pub location: String,
    pub rating: f32,
    pub consultation_fee: u32,
    pub image: String,
    pub availability: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Prescription,
    #[serde(rename = "OTC")]
    OverTheCounter,
    Supplement,
    Wellness,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 4] = [
        ProductCategory::Prescription,
        ProductCategory::OverTheCounter,
        ProductCategory::Supplement,
        ProductCategory::Wellness,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProductCategory::Prescription => "Prescription",
            ProductCategory::OverTheCounter => "OTC",
            ProductCategory::Supplement => "Supplement",
            ProductCategory::Wellness => "Wellness",
        }
    }
}

impl FromStr for ProductCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductCategory::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {}", s.trim()))
    }
}

/// Prices are in rand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PharmacyProduct {
    pub id: String,
    pub name: String,
    pub category: ProductCategory,
    pub price: f64,
    pub image: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_json_shape() {
        let p = UserProfile {
            name: "Thandi".into(),
            province: Province::WesternCape,
            age: None,
            onboarded: true,
            subscription: SubscriptionTier::Premium,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["province"], "Western Cape");
        assert_eq!(v["subscription"], "Premium");
        assert!(v.get("age").is_none());
    }

    #[test]
    fn reading_json_uses_type_field() {
        let json = r#"{"type":"BP","value":"120/80","date":"2024-05-01T08:30:00.000Z"}"#;
        let r: HealthReading = serde_json::from_str(json).unwrap();
        assert_eq!(r.kind, ReadingKind::BloodPressure);
        assert_eq!(
            r.measurement(),
            Some(Measurement::BloodPressure { systolic: 120, diastolic: 80 })
        );
    }

    #[test]
    fn malformed_values_are_kept_but_do_not_parse() {
        let r = HealthReading::now(ReadingKind::BloodPressure, "abc");
        assert_eq!(r.value, "abc");
        assert!(r.measurement().is_none());
        assert!(HealthReading::now(ReadingKind::Weight, "NaN").measurement().is_none());
        assert!(HealthReading::now(ReadingKind::Weight, "kg 70").measurement().is_none());
    }

    #[test]
    fn scalar_values_read_their_leading_number() {
        let scalar = |v: &str| HealthReading::now(ReadingKind::Weight, v).measurement();
        assert_eq!(scalar("74.5 kg"), Some(Measurement::Scalar(74.5)));
        assert_eq!(scalar("5.6mmol/L"), Some(Measurement::Scalar(5.6)));
        assert_eq!(scalar("80."), Some(Measurement::Scalar(80.0)));
        assert_eq!(scalar(".5"), Some(Measurement::Scalar(0.5)));
        assert_eq!(scalar("1e2x"), Some(Measurement::Scalar(100.0)));
        assert_eq!(scalar("72e"), Some(Measurement::Scalar(72.0)));
        assert_eq!(scalar("-"), None);
    }

    #[test]
    fn province_parsing_is_lenient() {
        assert_eq!("kwazulu natal".parse::<Province>().unwrap(), Province::KwaZuluNatal);
        assert_eq!("NorthWest".parse::<Province>().unwrap(), Province::NorthWest);
        assert!("Atlantis".parse::<Province>().is_err());
    }

    #[test]
    fn patch_reports_change_only_when_different() {
        let mut p = UserProfile::default();
        let patch = ProfilePatch::name("Sipho").with_age(Some(31));
        assert!(patch.apply_to(&mut p));
        assert!(!patch.apply_to(&mut p));
        assert!(ProfilePatch::default().with_age(None).apply_to(&mut p));
        assert_eq!(p.age, None);
        assert!(!p.onboarded);
    }
}
