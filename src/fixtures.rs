//! Mock data for the portal front end
//!
//! None of this is used by the session core itself; views hand it in as
//! seed messages and roster data.

use crate::message::{Message, Sender};
use crate::roster::{Patient, PatientStatus, Vitals};
use chrono::{DateTime, Duration, Utc};

pub const GREETING: &str = "Hello! How can I help you with your health today?";

pub const CANNED_REPLY: &str = "I understand your concern. Based on your recent health data, \
I can see your heart rate has been slightly elevated. Would you like me to analyze this \
pattern further?";

/// Assistant greeting that opens every patient chat, stamped a minute ago
pub fn patient_greeting() -> Message {
    Message::new(Sender::Assistant, GREETING, Utc::now() - Duration::minutes(1))
}

/// Earlier conversation reviewed on the patient detail view.
///
/// Offsets are minutes after `start`; two patient messages were flagged by
/// review.
pub fn clinician_transcript(start: DateTime<Utc>) -> Vec<Message> {
    let at = |minutes: i64| start + Duration::minutes(minutes);
    vec![
        Message::new(
            Sender::Patient,
            "Hello, I've been experiencing headaches for the past week.",
            at(0),
        )
        .with_id("1"),
        Message::new(
            Sender::Assistant,
            "I'm sorry to hear that. Can you describe the pain? Is it constant or does it come \
             and go?",
            at(1),
        )
        .with_id("2"),
        Message::new(
            Sender::Patient,
            "It comes and goes, usually worse in the morning. It's a throbbing pain on the right \
             side of my head.",
            at(3),
        )
        .with_id("3"),
        Message::new(
            Sender::Patient,
            "I've also been feeling more tired than usual and sometimes feel dizzy when I stand \
             up quickly.",
            at(4),
        )
        .with_id("4")
        .flagged(),
        Message::new(
            Sender::Assistant,
            "Thank you for sharing that information. The combination of headaches, fatigue, and \
             dizziness could be related to several conditions. I notice your blood pressure \
             readings have been elevated recently. Have you been taking your prescribed \
             medication regularly?",
            at(6),
        )
        .with_id("5"),
        Message::new(
            Sender::Patient,
            "I might have missed a few doses last week when I was traveling.",
            at(8),
        )
        .with_id("6")
        .flagged(),
    ]
}

fn patient(
    id: &str,
    name: &str,
    status: PatientStatus,
    last_contact: &str,
    concerns: &[&str],
    vitals: (u32, &str, f64),
) -> Patient {
    let (heart_rate, blood_pressure, temperature_c) = vitals;
    Patient {
        id: id.to_string(),
        name: name.to_string(),
        status,
        last_contact: last_contact.to_string(),
        concerns: concerns.iter().map(|c| (*c).to_string()).collect(),
        vitals: Vitals {
            heart_rate,
            blood_pressure: blood_pressure.to_string(),
            temperature_c,
        },
    }
}

/// Dashboard roster
pub fn patients() -> Vec<Patient> {
    vec![
        patient(
            "1",
            "Sarah Johnson",
            PatientStatus::Critical,
            "10 min ago",
            &["Chest pain", "Shortness of breath"],
            (110, "150/95", 38.2),
        ),
        patient(
            "2",
            "Michael Chen",
            PatientStatus::Attention,
            "1 hour ago",
            &["Persistent cough"],
            (85, "130/85", 37.8),
        ),
        patient(
            "3",
            "Emily Rodriguez",
            PatientStatus::Normal,
            "3 hours ago",
            &["Medication review"],
            (72, "120/80", 36.9),
        ),
        patient(
            "4",
            "David Wilson",
            PatientStatus::Normal,
            "1 day ago",
            &["Follow-up appointment"],
            (68, "118/75", 36.6),
        ),
        patient(
            "5",
            "Lisa Thompson",
            PatientStatus::Attention,
            "2 hours ago",
            &["Elevated blood pressure", "Headaches"],
            (88, "145/90", 37.1),
        ),
    ]
}
