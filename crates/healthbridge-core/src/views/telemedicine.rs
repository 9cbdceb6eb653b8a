//! Doctor directory and (simulated) consultation booking.

use crate::catalog;
use crate::error::ValidationError;
use crate::model::Doctor;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct BookingConfirmation {
    pub doctor: Doctor,
    pub slot: String,
    /// Rand.
    pub fee: u32,
}

pub struct Telemedicine {
    doctors: Vec<Doctor>,
    search: String,
    selected: Option<Doctor>,
    slot: Option<String>,
}

impl Default for Telemedicine {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemedicine {
    pub fn new() -> Self {
        Self::with_doctors(catalog::doctors())
    }

    pub fn with_doctors(doctors: Vec<Doctor>) -> Self {
        Self {
            doctors,
            search: String::new(),
            selected: None,
            slot: None,
        }
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Doctors whose name or specialty contains the search term, ignoring case.
    /// An empty term matches everyone.
    pub fn results(&self) -> Vec<&Doctor> {
        let needle = self.search.trim().to_lowercase();
        self.doctors
            .iter()
            .filter(|d| d.name.to_lowercase().contains(&needle) || d.specialty.to_lowercase().contains(&needle))
            .collect()
    }

    /// Choosing a different doctor clears the chosen slot.
    pub fn select(&mut self, doctor_id: &str) -> Result<&Doctor, ValidationError> {
        let doctor = self
            .doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownDoctor(doctor_id.to_string()))?;
        if self.selected.as_ref().map(|d| d.id.as_str()) != Some(doctor_id) {
            self.slot = None;
        }
        Ok(&*self.selected.insert(doctor))
    }

    pub fn selected(&self) -> Option<&Doctor> {
        self.selected.as_ref()
    }

    pub fn choose_slot(&mut self, slot: &str) -> Result<(), ValidationError> {
        let doctor = self.selected.as_ref().ok_or(ValidationError::BookingIncomplete)?;
        if !doctor.availability.iter().any(|s| s == slot.trim()) {
            return Err(ValidationError::SlotUnavailable(slot.trim().to_string()));
        }
        self.slot = Some(slot.trim().to_string());
        Ok(())
    }

    pub fn chosen_slot(&self) -> Option<&str> {
        self.slot.as_deref()
    }

    /// Nothing is sent anywhere; the selection is cleared once confirmed.
    pub fn confirm(&mut self) -> Result<BookingConfirmation, ValidationError> {
        let (doctor, slot) = match (self.selected.as_ref(), self.slot.as_ref()) {
            (Some(d), Some(s)) => (d.clone(), s.clone()),
            _ => return Err(ValidationError::BookingIncomplete),
        };
        info!(doctor_id = %doctor.id, %slot, fee = doctor.consultation_fee, "consultation booked");
        self.selected = None;
        self.slot = None;
        Ok(BookingConfirmation {
            fee: doctor.consultation_fee,
            doctor,
            slot,
        })
    }
}
