use std::time::Duration;

use http::Response;
use serde::Serialize;
use sorteio_database::models::Participant;

use super::{ok_data, ResponseBody};
use crate::draw::{draw_with_countdown, eligible_count};
use crate::error::AppError;
use crate::export::mask_phone;
use crate::session::Session;
use crate::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Eligible<'a> {
    raffle_id: Option<&'a str>,
    eligible_count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Drawn {
    winner: Participant,
    masked_phone: String,
}

pub fn eligible(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    let selection = state.sessions.get(session);
    selection.require_organizer()?;
    let raffle_id = selection.raffle_id();
    let count = raffle_id.map_or(0, |raffle_id| eligible_count(&state.store, raffle_id));
    ok_data(
        session,
        None,
        Eligible {
            raffle_id,
            eligible_count: count,
        },
    )
}

/// Draws from the active raffle after the configured countdown. A client
/// that disconnects during the countdown cancels the draw.
pub async fn draw(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    let selection = state.sessions.get(session);
    selection.require_organizer()?;
    let countdown = Duration::from_secs(state.config.draw_countdown_secs);
    let winner = draw_with_countdown(&state.store, selection.raffle_id(), countdown).await?;
    let masked_phone = mask_phone(&winner.phone);
    ok_data(
        session,
        None,
        Drawn {
            winner,
            masked_phone,
        },
    )
}
