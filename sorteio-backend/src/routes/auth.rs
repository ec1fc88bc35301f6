use http::Response;
use serde::Deserialize;

use super::{ok_data, ok_message, read_json, ResponseBody};
use crate::error::AppError;
use crate::session::Session;
use crate::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    email: String,
    password: String,
}

pub fn login(
    state: &AppState,
    session: &Session,
    body: &[u8],
) -> Result<Response<ResponseBody>, AppError> {
    let credentials: Credentials = read_json(body)?;
    let organizer = state.sessions.update(session, |selection| {
        selection.login(&state.store, &credentials.email, &credentials.password)
    })?;
    ok_data(session, Some("Login bem-sucedido!"), organizer)
}

pub fn logout(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    state.sessions.update(session, |selection| selection.logout());
    ok_message(session, "Logout realizado.")
}
