use http::Response;
use serde::Serialize;
use sorteio_database::error::{AuthError, NotFound, ValidationError};
use sorteio_database::models::{Event, Raffle};
use sorteio_relay::{AnnouncedEvent, AnnouncedOrganizer, AnnouncedRaffle, RaffleAnnouncement};
use tracing::{debug, warn};

use super::{created, ok_data, read_json, ResponseBody};
use crate::error::AppError;
use crate::export::participation_url;
use crate::registration::{
    adopt_remote_raffle, check_raffle_form, create_event_with_raffle, full_raffle_code, NewRaffle,
};
use crate::session::Session;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedRaffle {
    raffle: Raffle,
    participation_url: String,
}

#[derive(Serialize)]
struct FoundRaffle {
    raffle: Raffle,
    event: Event,
}

/// Announces the raffle to the registration webhook and stores it locally
/// only once the webhook accepted it.
pub async fn new_raffle(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let new: NewRaffle = read_json(body)?;
    let organizer = state
        .sessions
        .get(session)
        .active_organizer(&state.store)
        .ok_or(AuthError::NotLoggedIn)?;
    check_raffle_form(&new)?;
    let code = full_raffle_code(&organizer, &new.raffle_code);
    // checked again when committing, this only avoids announcing a doomed raffle
    if state.store.read(|tables| tables.raffle_by_code(&code).is_some()) {
        return Err(ValidationError::DuplicateRaffleCode(code).into());
    }

    let link = participation_url(&state.config.url, &code);
    let announcement = RaffleAnnouncement {
        organizer: AnnouncedOrganizer {
            id: organizer.id.clone(),
            name: organizer.name.clone(),
            code: organizer.organizer_code.clone(),
        },
        event: AnnouncedEvent {
            name: new.event_name.clone(),
        },
        raffle: AnnouncedRaffle {
            name: new.raffle_name.clone(),
            quantity: new.quantity,
            code,
        },
        qr_code_url: link.clone(),
    };
    state.relay.announce_raffle(&announcement).await.inspect_err(|err| {
        warn!("raffle {} was not announced: {err}", announcement.raffle.code);
    })?;

    let raffle = state.sessions.update(session, |selection| {
        create_event_with_raffle(&state.store, selection, new)
    })?;
    created(
        session,
        "Sorteio adicionado ao evento com sucesso!",
        CreatedRaffle {
            raffle,
            participation_url: link,
        },
    )
}

/// Public lookup for the self registration form. Raffles found only in the
/// remote listing are stored locally so participants can join them.
pub async fn find_raffle(
    state: &AppState,
    session: &Session,
    code: &str,
) -> Result<Response<ResponseBody>, AppError> {
    let (raffle, event) = match state.store.find_raffle_by_code(code) {
        Ok(found) => found,
        Err(not_found) => {
            debug!("{not_found}, asking the remote listing");
            let remote = state
                .relay
                .find_remote_raffle(code)
                .await?
                .ok_or_else(|| NotFound::new("Sorteio", code))?;
            adopt_remote_raffle(&state.store, &remote)?
        }
    };
    ok_data(session, None, FoundRaffle { raffle, event })
}
