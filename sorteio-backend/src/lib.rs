//! Raffle service: sessions, registration, draws and the HTTP server tying
//! them together.

pub mod draw;
pub mod error;
pub mod export;
pub mod registration;
pub mod routes;
pub mod session;

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use error::AppError;
use futures_util::pin_mut;
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt as _;
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use routes::ResponseBody;
use session::{Session, SessionRegistry};
use sorteio_config::Config;
use sorteio_database::Store;
use sorteio_relay::Relay;
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub struct AppState {
    pub store: Store,
    pub sessions: SessionRegistry,
    pub relay: Relay,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Result<Self, AppError> {
        Ok(Self {
            relay: Relay::new(&config.webhook)?,
            store,
            sessions: SessionRegistry::default(),
            config,
        })
    }
}

/// Answers one request. Failures become JSON error responses, so this never
/// fails itself.
pub async fn handle<B>(state: Arc<AppState>, request: Request<B>) -> Response<ResponseBody>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let session = Session::new(&request);
    match route(&state, &session, request).await {
        Ok(response) => response,
        Err(app_error) => app_error.into_response(&session),
    }
}

async fn route<B>(
    state: &AppState,
    session: &Session,
    request: Request<B>,
) -> Result<Response<ResponseBody>, AppError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = request.into_parts();
    let body: Bytes = body
        .collect()
        .await
        .map_err(|err| AppError::Body(err.into()))?
        .to_bytes();
    let path = parts.uri.path();
    debug!(method = %parts.method, path, "request");
    let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

    match (parts.method.as_str(), segments.as_slice()) {
        ("POST", ["login"]) => routes::auth::login(state, session, &body),
        ("POST", ["logout"]) => routes::auth::logout(state, session),
        ("GET", ["state"]) => routes::selection::state(state, session),
        ("POST", ["select", "event"]) => routes::selection::select_event(state, session, &body),
        ("POST", ["select", "raffle"]) => routes::selection::select_raffle(state, session, &body),
        ("GET", ["admin", "organizers"]) => routes::admin::list_organizers(state, session),
        ("POST", ["admin", "organizers"]) => routes::admin::new_organizer(state, session, &body),
        ("POST", ["admin", "events"]) => routes::admin::new_event(state, session, &body),
        ("POST", ["raffles"]) => routes::raffles::new_raffle(state, session, &body).await,
        ("GET", ["raffles", code]) => routes::raffles::find_raffle(state, session, code).await,
        ("POST", ["participants"]) => routes::participants::new_participant(state, session, &body),
        ("GET", ["eligible"]) => routes::draw::eligible(state, session),
        ("POST", ["draw"]) => routes::draw::draw(state, session).await,
        ("GET", ["winners.csv"]) => routes::export::winners(state, session),
        ("GET", ["participation-link", code]) => {
            routes::export::participation_link(state, session, code)
        }
        _ => Err(AppError::NoRoute(parts.method.clone(), path.to_owned())),
    }
}

/// Serves connections until `shutdown` completes, then lets open
/// connections finish gracefully.
#[allow(clippy::cognitive_complexity, clippy::redundant_pub_crate)]
pub async fn run_server(
    state: Arc<AppState>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<(), AppError> {
    // tell the connections to shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let shutdown_tx = Arc::new(shutdown_tx);

    // wait for the connections to finish shutdown
    let (closed_tx, closed_rx) = watch::channel(());

    info!("listening on {}", listener.local_addr()?);
    pin_mut!(shutdown);

    loop {
        select! {
            accept = listener.accept() => {
                let (socket, remote_addr) = match accept {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        warn!("failed to accept connection: {err}");
                        continue;
                    }
                };
                debug!("connection from {remote_addr}");

                let state = Arc::clone(&state);
                let shutdown_tx = Arc::clone(&shutdown_tx);
                let closed_rx = closed_rx.clone();

                tokio::spawn(async move {
                    let socket = TokioIo::new(socket);
                    let service = hyper::service::service_fn(move |request: Request<Incoming>| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle(state, request).await) }
                    });

                    let builder = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new());
                    let connection = builder.serve_connection_with_upgrades(socket, service);
                    pin_mut!(connection);

                    let mut draining = false;
                    loop {
                        select! {
                            connection_result = connection.as_mut() => {
                                if let Err(err) = connection_result {
                                    error!("failed to serve connection: {err:#}");
                                }
                                break;
                            }
                            () = shutdown_tx.closed(), if !draining => {
                                connection.as_mut().graceful_shutdown();
                                draining = true;
                            }
                        }
                    }

                    drop(closed_rx);
                });
            }
            () = &mut shutdown => {
                warn!("shutting down");
                drop(shutdown_rx);
                drop(closed_rx);
                closed_tx.closed().await;
                break;
            }
        }
    }

    Ok(())
}

/// Completes on ctrl-c or, on unix, SIGTERM.
#[allow(clippy::redundant_pub_crate)]
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to install ctrl-c handler: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
