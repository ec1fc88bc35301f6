use http::Response;
use serde::Deserialize;
use sorteio_database::error::AuthError;

use super::{ok_data, read_json, ResponseBody};
use crate::error::AppError;
use crate::session::{Session, SelectionView};
use crate::AppState;

/// `{"id": null}` clears the selection.
#[derive(Deserialize)]
pub struct Select {
    id: Option<String>,
}

fn current(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    let selection = state.sessions.get(session);
    ok_data(session, None, SelectionView::new(&selection, &state.store))
}

pub fn state(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    current(state, session)
}

pub fn select_event(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let Select { id } = read_json(body)?;
    state.sessions.update(session, |selection| {
        selection.require_organizer()?;
        selection.select_event(id);
        Ok::<_, AuthError>(())
    })?;
    current(state, session)
}

pub fn select_raffle(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let Select { id } = read_json(body)?;
    state.sessions.update(session, |selection| {
        selection.require_organizer()?;
        selection.select_raffle(id);
        Ok::<_, AuthError>(())
    })?;
    current(state, session)
}
