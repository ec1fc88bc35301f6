pub mod admin;
pub mod auth;
pub mod draw;
pub mod export;
pub mod participants;
pub mod raffles;
pub mod selection;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
use crate::session::{ResponseSessionExt as _, Session};

pub type ResponseBody = Full<Bytes>;

/// Envelope of every JSON answer.
#[derive(Serialize)]
struct Outcome<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

pub fn read_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    Ok(serde_json::from_slice(body)?)
}

fn json_response<T: Serialize>(
    session: &Session,
    status: StatusCode,
    outcome: &Outcome<'_, T>,
) -> Result<Response<ResponseBody>, AppError> {
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .with_session(session)
        .body(Full::new(Bytes::from(serde_json::to_vec(outcome)?)))?)
}

pub fn ok_data<T: Serialize>(
    session: &Session,
    message: Option<&str>,
    data: T,
) -> Result<Response<ResponseBody>, AppError> {
    json_response(
        session,
        StatusCode::OK,
        &Outcome {
            success: true,
            message,
            data: Some(data),
        },
    )
}

pub fn ok_message(session: &Session, message: &str) -> Result<Response<ResponseBody>, AppError> {
    json_response::<()>(
        session,
        StatusCode::OK,
        &Outcome {
            success: true,
            message: Some(message),
            data: None,
        },
    )
}

pub fn created<T: Serialize>(
    session: &Session,
    message: &str,
    data: T,
) -> Result<Response<ResponseBody>, AppError> {
    json_response(
        session,
        StatusCode::CREATED,
        &Outcome {
            success: true,
            message: Some(message),
            data: Some(data),
        },
    )
}
