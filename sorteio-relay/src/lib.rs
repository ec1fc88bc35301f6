//! Client for the two outbound webhooks: announcing a freshly created raffle
//! and listing the raffles open for public self-registration.
//!
//! Calls are one-shot. There is no retry and no offline queue, a failed call
//! is reported to the caller which then skips the local change it guarded.

pub mod error;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderValue, Method, Request, Response, Uri};
use http_body_util::{BodyExt as _, Full};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use sorteio_config::WebhookConfig;
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::error::RelayError;

/// The only answer of the registration webhook that counts as success.
pub const REGISTER_SUCCESS: &str = "Cadastro efetuado!";

/// Upper bound for one webhook call, connecting included.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedOrganizer {
    pub id: String,
    pub name: String,
    pub code: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedEvent {
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AnnouncedRaffle {
    pub name: String,
    pub quantity: u32,
    pub code: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RaffleAnnouncement {
    pub organizer: AnnouncedOrganizer,
    pub event: AnnouncedEvent,
    pub raffle: AnnouncedRaffle,
    pub qr_code_url: String,
}

#[derive(Deserialize)]
struct RegisterAnswer {
    #[serde(default)]
    resposta: Option<String>,
}

/// One row of the listing webhook. The keys are the column titles of the
/// spreadsheet behind it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteRaffle {
    #[serde(rename = "Id", default)]
    pub id: serde_json::Value,
    #[serde(rename = "Objeto do sorteio", default)]
    pub name: String,
    #[serde(rename = "Quantidade de objetos", default)]
    pub quantity: serde_json::Value,
    #[serde(rename = "Código do sorteio", default)]
    pub code: Option<String>,
    #[serde(rename = "Nome do evento", default)]
    pub event_name: String,
    #[serde(rename = "Código da empresa", default)]
    pub company_code: Option<String>,
}

impl RemoteRaffle {
    /// Leading integer of the quantity column, `1` when missing or zero.
    #[must_use]
    pub fn parsed_quantity(&self) -> u32 {
        let parsed = match &self.quantity {
            serde_json::Value::Number(number) => number.as_u64().or_else(|| {
                number
                    .as_f64()
                    .filter(|value| *value >= 1.0)
                    .map(|value| value.trunc() as u64)
            }),
            serde_json::Value::String(text) => {
                let digits: String = text
                    .trim_start()
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                digits.parse().ok()
            }
            _ => None,
        };
        parsed
            .and_then(|value| u32::try_from(value).ok())
            .filter(|value| *value > 0)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn matches_code(&self, code: &str) -> bool {
        self.code
            .as_deref()
            .is_some_and(|own| own.to_uppercase() == code.to_uppercase())
    }

    /// Organizer code of the company owning the row, if the column is filled.
    #[must_use]
    pub fn company(&self) -> Option<&str> {
        self.company_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }
}

#[derive(Clone, Debug)]
pub struct Relay {
    register_url: Uri,
    list_url: Uri,
    timeout: Duration,
}

impl Relay {
    pub fn new(config: &WebhookConfig) -> Result<Self, RelayError> {
        Ok(Self {
            register_url: parse_url(&config.register_url)?,
            list_url: parse_url(&config.list_url)?,
            timeout: WEBHOOK_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call(&self, request: Request<Full<Bytes>>) -> Result<Response<Bytes>, RelayError> {
        let uri = request.uri().clone();
        tokio::time::timeout(self.timeout, send(request))
            .await
            .map_err(|_elapsed| {
                warn!("webhook {uri} did not answer within {:?}", self.timeout);
                RelayError::Timeout(self.timeout)
            })?
    }

    pub async fn announce_raffle(&self, announcement: &RaffleAnnouncement) -> Result<(), RelayError> {
        let body = serde_json::to_vec(announcement)?;
        let request = Request::builder()
            .method(Method::POST)
            .uri(self.register_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;
        let response = self.call(request).await?;
        let answer: RegisterAnswer = serde_json::from_slice(&success_body(response)?)?;
        if answer.resposta.as_deref() == Some(REGISTER_SUCCESS) {
            debug!(code = %announcement.raffle.code, "raffle announced");
            Ok(())
        } else {
            warn!(answer = ?answer.resposta, "registration webhook refused raffle");
            Err(RelayError::UnexpectedAnswer(answer.resposta))
        }
    }

    pub async fn list_remote_raffles(&self) -> Result<Vec<RemoteRaffle>, RelayError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.list_url.clone())
            .body(Full::new(Bytes::new()))?;
        let response = self.call(request).await?;
        Ok(serde_json::from_slice(&success_body(response)?)?)
    }

    /// Case-insensitive lookup of a raffle code in the remote listing.
    pub async fn find_remote_raffle(&self, code: &str) -> Result<Option<RemoteRaffle>, RelayError> {
        Ok(self
            .list_remote_raffles()
            .await?
            .into_iter()
            .find(|remote| remote.matches_code(code)))
    }
}

fn parse_url(url: &str) -> Result<Uri, RelayError> {
    let uri: Uri = url
        .parse()
        .map_err(|_err| RelayError::InvalidUrl(url.to_owned()))?;
    match (uri.scheme_str(), uri.host()) {
        (Some("http" | "https"), Some(_)) => Ok(uri),
        _ => Err(RelayError::InvalidUrl(url.to_owned())),
    }
}

fn success_body(response: Response<Bytes>) -> Result<Bytes, RelayError> {
    if response.status().is_success() {
        Ok(response.into_body())
    } else {
        warn!(status = %response.status(), "webhook call failed");
        Err(RelayError::Status(response.status()))
    }
}

fn tls_connector() -> TlsConnector {
    static CONNECTOR: OnceLock<TlsConnector> = OnceLock::new();
    CONNECTOR
        .get_or_init(|| {
            let mut root_cert_store = RootCertStore::empty();
            root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();
            TlsConnector::from(Arc::new(config))
        })
        .clone()
}

async fn send(request: Request<Full<Bytes>>) -> Result<Response<Bytes>, RelayError> {
    let uri = request.uri().clone();
    let host = uri
        .host()
        .ok_or_else(|| RelayError::InvalidUrl(uri.to_string()))?
        .to_owned();
    let https = uri.scheme_str() == Some("https");
    let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });

    let (mut parts, body) = request.into_parts();
    if let Some(authority) = uri.authority() {
        let host_header =
            HeaderValue::from_str(authority.as_str()).map_err(hyper::http::Error::from)?;
        parts.headers.insert(HOST, host_header);
    }
    // origin form: path and query only
    parts.uri = uri
        .path_and_query()
        .map_or_else(|| Uri::from_static("/"), |path| Uri::from(path.clone()));
    let request = Request::from_parts(parts, body);

    let stream = TcpStream::connect((host.as_str(), port)).await?;
    if https {
        let server_name = ServerName::try_from(host)?;
        let stream = tls_connector().connect(server_name, stream).await?;
        exchange(TokioIo::new(stream), request).await
    } else {
        exchange(TokioIo::new(stream), request).await
    }
}

async fn exchange<I>(io: I, request: Request<Full<Bytes>>) -> Result<Response<Bytes>, RelayError>
where
    I: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(io).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("webhook connection closed with error: {err}");
        }
    });

    let response = sender.send_request(request).await?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(Response::from_parts(parts, body))
}
