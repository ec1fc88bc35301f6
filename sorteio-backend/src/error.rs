use std::convert::Infallible;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use sorteio_config::ConfigError;
use sorteio_database::error::{AuthError, NotFound, ValidationError};
use sorteio_relay::error::RelayError;
use tracing::{error, warn};

use crate::draw::DrawError;
use crate::registration::RegistrationError;
use crate::session::{ResponseSessionExt as _, Session};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error("Erro ao comunicar com o serviço de sorteios: {0}")]
    Relay(#[from] RelayError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read request body: {0}")]
    Body(Box<dyn std::error::Error + Send + Sync>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Http(#[from] http::Error),
    #[error("webserver error: {0}")]
    Hyper(#[from] hyper::Error),
    #[error("no route for {0} {1}")]
    NoRoute(http::Method, String),
}

impl From<Infallible> for AppError {
    fn from(value: Infallible) -> Self {
        match value {}
    }
}

impl From<RegistrationError> for AppError {
    fn from(value: RegistrationError) -> Self {
        match value {
            RegistrationError::Auth(error) => Self::Auth(error),
            RegistrationError::Validation(error) => Self::Validation(error),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl AppError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Draw(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) | Self::NoRoute(..) => StatusCode::NOT_FOUND,
            Self::Relay(_) => StatusCode::BAD_GATEWAY,
            Self::Json(_) | Self::Body(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Http(_) | Self::Hyper(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self, session: &Session) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {self}");
        } else {
            warn!("request rejected: {self}");
        }
        let body = serde_json::to_vec(&ErrorBody {
            success: false,
            message: self.to_string(),
        })
        .unwrap_or_default();
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .with_session(session)
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| {
                let mut response = Response::new(Full::new(Bytes::new()));
                *response.status_mut() = status;
                response
            })
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt as _;

    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            AppError::from(ValidationError::DuplicateEmail).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(AuthError::NotLoggedIn).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(NotFound::new("Sorteio", "X")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(RelayError::Status(StatusCode::INTERNAL_SERVER_ERROR)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(RegistrationError::Auth(AuthError::NotLoggedIn)).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn error_body_carries_message() {
        let session = Session::new(&http::Request::new(()));
        let response = AppError::from(ValidationError::DuplicateRegistration).into_response(&session);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.headers().contains_key(http::header::SET_COOKIE));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Este e-mail já está cadastrado neste sorteio.");
    }
}
