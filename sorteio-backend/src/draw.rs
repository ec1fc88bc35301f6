//! Winner selection.
//!
//! A draw picks uniformly among the participants of a raffle that have not
//! won yet. The pick, the winner flag and the winner record are committed in
//! one store write.

use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom as _;
use sorteio_database::models::Participant;
use sorteio_database::Store;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("Nenhum sorteio selecionado.")]
    NoRaffleSelected,
    #[error("Não há mais participantes elegíveis para este sorteio.")]
    Exhausted,
}

#[must_use]
pub fn eligible_count(store: &Store, raffle_id: &str) -> usize {
    store.read(|tables| tables.eligible_participants(raffle_id).count())
}

/// Draws one winner right away. `None` when no raffle is given or nobody is
/// left to draw.
pub fn draw_winner(store: &Store, raffle_id: Option<&str>) -> Option<Participant> {
    let raffle_id = raffle_id?;
    let winner = store.write(|tables| {
        let eligible: Vec<u64> = tables
            .eligible_participants(raffle_id)
            .map(|participant| participant.id)
            .collect();
        let participant_id = *eligible.choose(tables.rng())?;
        tables.mark_winner(participant_id, Utc::now())
    })?;
    info!(
        raffle = raffle_id,
        participant = winner.participant.id,
        "winner drawn"
    );
    Some(winner.participant)
}

/// Permission to draw from a raffle that had eligible participants when the
/// ticket was issued.
///
/// Holding a ticket reserves nothing. Dropping it is always free of side
/// effects.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct DrawTicket {
    raffle_id: String,
}

impl DrawTicket {
    #[must_use]
    pub fn raffle_id(&self) -> &str {
        &self.raffle_id
    }
}

pub fn begin_draw(store: &Store, raffle_id: Option<&str>) -> Result<DrawTicket, DrawError> {
    let raffle_id = raffle_id.ok_or(DrawError::NoRaffleSelected)?;
    if eligible_count(store, raffle_id) == 0 {
        debug!("raffle {raffle_id} has nobody left to draw");
        return Err(DrawError::Exhausted);
    }
    Ok(DrawTicket {
        raffle_id: raffle_id.to_owned(),
    })
}

/// Performs the pick. Eligibility is checked again, so a raffle exhausted by
/// another draw in the meantime yields [`DrawError::Exhausted`].
pub fn commit_draw(store: &Store, ticket: DrawTicket) -> Result<Participant, DrawError> {
    draw_winner(store, Some(&ticket.raffle_id)).ok_or(DrawError::Exhausted)
}

/// Begins a draw, waits out the countdown and commits.
///
/// Dropping the returned future before the countdown ends leaves the store
/// untouched.
pub async fn draw_with_countdown(
    store: &Store,
    raffle_id: Option<&str>,
    countdown: Duration,
) -> Result<Participant, DrawError> {
    let ticket = begin_draw(store, raffle_id)?;
    debug!("drawing from {} in {countdown:?}", ticket.raffle_id());
    tokio::time::sleep(countdown).await;
    commit_draw(store, ticket)
}
