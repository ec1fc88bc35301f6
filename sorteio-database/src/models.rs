use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::password::PasswordHash;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub organizer_code: String,
    #[serde(skip)]
    pub password: PasswordHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub name: String,
    pub organizer_id: String,
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Raffle {
    pub id: String,
    pub event_id: String,
    /// What is being raffled.
    pub name: String,
    /// Number of prizes. Informational only, draws are not capped by it.
    pub quantity: u32,
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub raffle_id: String,
    pub is_winner: bool,
}

/// Snapshot of a participant taken when it was drawn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    #[serde(flatten)]
    pub participant: Participant,
    pub drawn_at: DateTime<Utc>,
}

/// `{organizer code}{first four non-whitespace chars of the name, uppercased}`
#[must_use]
pub fn event_code(organizer_code: &str, event_name: &str) -> String {
    let suffix: String = event_name
        .chars()
        .filter(|char| !char.is_whitespace())
        .take(4)
        .collect();
    format!("{organizer_code}{}", suffix.to_uppercase())
}

#[must_use]
pub fn eq_ignore_case(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}
