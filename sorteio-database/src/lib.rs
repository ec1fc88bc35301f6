//! In-memory entity store: organizers own events, events own raffles, raffles
//! own participants and winners.
//!
//! All tables live behind one lock. Readers go through [`Store::read`], writers
//! run their complete check-then-commit sequence inside [`Store::write`] so no
//! interleaving can observe a half-applied change.

pub mod error;
pub mod models;
pub mod password;
mod seed;

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use error::{NotFound, ValidationError};
use models::{eq_ignore_case, Event, Organizer, Participant, Raffle, Winner};
use password::PasswordHash;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::SeedableRng as _;
use tracing::debug;

/// Hands out strictly increasing millisecond timestamps.
///
/// Two ids requested within the same millisecond (or with a clock that went
/// backwards) still come out unique.
#[derive(Debug, Default)]
struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    fn next(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        self.last = now.max(self.last + 1);
        self.last
    }
}

pub struct Tables {
    organizers: Vec<Organizer>,
    events: Vec<Event>,
    raffles: Vec<Raffle>,
    participants: Vec<Participant>,
    winners: Vec<Winner>,
    ids: IdGenerator,
    rng: StdRng,
}

impl Tables {
    fn new(rng: StdRng) -> Self {
        Self {
            organizers: Vec::new(),
            events: Vec::new(),
            raffles: Vec::new(),
            participants: Vec::new(),
            winners: Vec::new(),
            ids: IdGenerator::default(),
            rng,
        }
    }

    pub fn organizers(&self) -> impl Iterator<Item = &Organizer> {
        self.organizers.iter()
    }

    pub fn organizer(&self, organizer_id: &str) -> Option<&Organizer> {
        self.organizers.iter().find(|organizer| organizer.id == organizer_id)
    }

    pub fn organizer_by_email(&self, email: &str) -> Option<&Organizer> {
        self.organizers
            .iter()
            .find(|organizer| eq_ignore_case(&organizer.email, email))
    }

    pub fn event(&self, event_id: &str) -> Option<&Event> {
        self.events.iter().find(|event| event.id == event_id)
    }

    pub fn events_for_organizer<'a>(
        &'a self,
        organizer_id: &'a str,
    ) -> impl Iterator<Item = &'a Event> {
        self.events
            .iter()
            .filter(move |event| event.organizer_id == organizer_id)
    }

    pub fn raffle(&self, raffle_id: &str) -> Option<&Raffle> {
        self.raffles.iter().find(|raffle| raffle.id == raffle_id)
    }

    pub fn raffle_by_code(&self, code: &str) -> Option<&Raffle> {
        self.raffles
            .iter()
            .find(|raffle| eq_ignore_case(&raffle.code, code))
    }

    pub fn raffles_for_event<'a>(&'a self, event_id: &'a str) -> impl Iterator<Item = &'a Raffle> {
        self.raffles
            .iter()
            .filter(move |raffle| raffle.event_id == event_id)
    }

    pub fn participants_for_raffle<'a>(
        &'a self,
        raffle_id: &'a str,
    ) -> impl Iterator<Item = &'a Participant> {
        self.participants
            .iter()
            .filter(move |participant| participant.raffle_id == raffle_id)
    }

    /// Participants of the raffle that have not been drawn yet.
    pub fn eligible_participants<'a>(
        &'a self,
        raffle_id: &'a str,
    ) -> impl Iterator<Item = &'a Participant> {
        self.participants_for_raffle(raffle_id)
            .filter(|participant| !participant.is_winner)
    }

    pub fn winners_for_raffle<'a>(&'a self, raffle_id: &'a str) -> impl Iterator<Item = &'a Winner> {
        self.winners
            .iter()
            .filter(move |winner| winner.participant.raffle_id == raffle_id)
    }

    pub fn push_organizer(
        &mut self,
        name: String,
        email: String,
        password: PasswordHash,
        organizer_code: String,
    ) -> Organizer {
        let organizer = Organizer {
            id: format!("org_{}", self.ids.next()),
            name,
            email,
            organizer_code,
            password,
        };
        self.organizers.push(organizer.clone());
        organizer
    }

    pub fn push_event(
        &mut self,
        name: String,
        organizer_id: &str,
        code: String,
    ) -> Result<Event, ValidationError> {
        if self.organizer(organizer_id).is_none() {
            return Err(ValidationError::unresolved("Organizador", organizer_id));
        }
        let event = Event {
            id: format!("evt_{}", self.ids.next()),
            name,
            organizer_id: organizer_id.to_owned(),
            code,
        };
        self.events.push(event.clone());
        Ok(event)
    }

    pub fn push_raffle(
        &mut self,
        event_id: &str,
        name: String,
        quantity: u32,
        code: String,
    ) -> Result<Raffle, ValidationError> {
        if self.event(event_id).is_none() {
            return Err(ValidationError::unresolved("Evento", event_id));
        }
        let raffle = Raffle {
            id: format!("raf_{}", self.ids.next()),
            event_id: event_id.to_owned(),
            name,
            quantity,
            code,
        };
        self.raffles.push(raffle.clone());
        Ok(raffle)
    }

    pub fn push_participant(
        &mut self,
        name: String,
        phone: String,
        email: String,
        raffle_id: &str,
    ) -> Result<Participant, ValidationError> {
        if self.raffle(raffle_id).is_none() {
            return Err(ValidationError::unresolved("Sorteio", raffle_id));
        }
        let participant = Participant {
            id: self.ids.next(),
            name,
            phone,
            email,
            raffle_id: raffle_id.to_owned(),
            is_winner: false,
        };
        self.participants.push(participant.clone());
        Ok(participant)
    }

    /// Flags the participant as drawn and appends its winner record.
    ///
    /// Returns `None` for unknown participants and for participants that
    /// already won; the flag is never cleared again.
    pub fn mark_winner(&mut self, participant_id: u64, drawn_at: DateTime<Utc>) -> Option<Winner> {
        let participant = self
            .participants
            .iter_mut()
            .find(|participant| participant.id == participant_id)?;
        if participant.is_winner {
            debug!("participant {participant_id} already won");
            return None;
        }
        participant.is_winner = true;
        let winner = Winner {
            participant: participant.clone(),
            drawn_at,
        };
        self.winners.push(winner.clone());
        Some(winner)
    }

    /// Randomizes display order once. Has no influence on draws.
    pub fn shuffle_participants(&mut self) {
        self.participants.shuffle(&mut self.rng);
    }

    /// The generator draws use. Only reachable while holding the store lock.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

pub struct Store {
    tables: Mutex<Tables>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[must_use]
    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            tables: Mutex::new(Tables::new(rng)),
        }
    }

    /// The demo dataset with participants shuffled once.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::new();
        store.write(seed::load);
        store
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        // every mutation is a single push or flag flip, so a panic elsewhere
        // cannot leave the tables inconsistent
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&tables)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut tables)
    }

    #[must_use]
    pub fn list_organizers(&self) -> Vec<Organizer> {
        self.read(|tables| tables.organizers().cloned().collect())
    }

    #[must_use]
    pub fn list_events_for_organizer(&self, organizer_id: &str) -> Vec<Event> {
        self.read(|tables| tables.events_for_organizer(organizer_id).cloned().collect())
    }

    #[must_use]
    pub fn list_raffles_for_event(&self, event_id: &str) -> Vec<Raffle> {
        self.read(|tables| tables.raffles_for_event(event_id).cloned().collect())
    }

    #[must_use]
    pub fn list_participants_for_raffle(&self, raffle_id: &str) -> Vec<Participant> {
        self.read(|tables| tables.participants_for_raffle(raffle_id).cloned().collect())
    }

    #[must_use]
    pub fn list_winners_for_raffle(&self, raffle_id: &str) -> Vec<Winner> {
        self.read(|tables| tables.winners_for_raffle(raffle_id).cloned().collect())
    }

    pub fn find_raffle_by_code(&self, code: &str) -> Result<(Raffle, Event), NotFound> {
        self.read(|tables| {
            let raffle = tables
                .raffle_by_code(code)
                .ok_or_else(|| NotFound::new("Sorteio", code))?;
            let event = tables
                .event(&raffle.event_id)
                .ok_or_else(|| NotFound::new("Evento", raffle.event_id.as_str()))?;
            Ok((raffle.clone(), event.clone()))
        })
    }
}
