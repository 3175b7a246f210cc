//! Patient roster shown on the clinician dashboard

use serde::{Deserialize, Serialize};
use std::fmt;

/// Triage status of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientStatus {
    Normal,
    Attention,
    Critical,
}

impl PatientStatus {
    /// Attention and critical patients are surfaced to clinicians first
    pub fn needs_attention(self) -> bool {
        matches!(self, PatientStatus::Attention | PatientStatus::Critical)
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatientStatus::Normal => write!(f, "normal"),
            PatientStatus::Attention => write!(f, "attention"),
            PatientStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Latest vitals summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub heart_rate: u32,
    pub blood_pressure: String,
    pub temperature_c: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub status: PatientStatus,
    pub last_contact: String,
    pub concerns: Vec<String>,
    pub vitals: Vitals,
}

/// Case-insensitive name search; an empty term matches everyone.
/// Roster order is preserved.
pub fn search<'a>(patients: &'a [Patient], term: &str) -> Vec<&'a Patient> {
    let needle = term.trim().to_lowercase();
    patients
        .iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn find<'a>(patients: &'a [Patient], id: &str) -> Option<&'a Patient> {
    patients.iter().find(|p| p.id == id)
}
