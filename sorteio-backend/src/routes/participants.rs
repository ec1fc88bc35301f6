use http::Response;

use super::{created, read_json, ResponseBody};
use crate::error::AppError;
use crate::registration::{add_participant, NewParticipant};
use crate::session::Session;
use crate::AppState;

pub fn new_participant(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let new: NewParticipant = read_json(body)?;
    let participant = add_participant(&state.store, new)?;
    created(session, "Cadastro realizado com sucesso!", participant)
}
