use bytes::Bytes;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::Response;
use http_body_util::Full;
use serde::Serialize;

use super::{ok_data, ResponseBody};
use crate::error::AppError;
use crate::export::{export_file_name, participation_url, winners_csv};
use crate::session::{ResponseSessionExt as _, Session};
use crate::AppState;

#[derive(Serialize)]
struct Link {
    url: String,
}

pub fn winners(state: &AppState, session: &Session) -> Result<Response<ResponseBody>, AppError> {
    let selection = state.sessions.get(session);
    selection.require_organizer()?;
    let winners = selection.active_winners(&state.store);
    let event_name = selection.active_event(&state.store).map(|event| event.name);
    let csv = winners_csv(&winners, &chrono::Local);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_file_name(event_name.as_deref())
    );
    Ok(Response::builder()
        .header(CONTENT_TYPE, "text/csv; charset=utf-8")
        // event names may carry non-ascii characters
        .header(CONTENT_DISPOSITION, disposition.into_bytes())
        .with_session(session)
        .body(Full::new(Bytes::from(csv)))?)
}

pub fn participation_link(
    state: &AppState,
    session: &Session,
    code: &str,
) -> Result<Response<ResponseBody>, AppError> {
    ok_data(
        session,
        None,
        Link {
            url: participation_url(&state.config.url, code),
        },
    )
}
