use http::Response;

use super::{created, ok_data, read_json, ResponseBody};
use crate::error::AppError;
use crate::registration::{create_event, create_organizer, NewEvent, NewOrganizer};
use crate::session::Session;
use crate::AppState;

pub fn list_organizers(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    ok_data(session, None, state.store.list_organizers())
}

pub fn new_organizer(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let new: NewOrganizer = read_json(body)?;
    let organizer = create_organizer(&state.store, new)?;
    created(session, "Organizador criado com sucesso!", organizer)
}

pub fn new_event(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let new: NewEvent = read_json(body)?;
    let event = create_event(&state.store, new)?;
    created(session, "Evento criado com sucesso!", event)
}
