use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use cookie::{Cookie, SameSite};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderValue, Request};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng as _};
use serde::Serialize;
use sorteio_database::error::AuthError;
use sorteio_database::models::{Event, Organizer, Participant, Raffle, Winner};
use sorteio_database::Store;
use tracing::{debug, info};

const COOKIE_NAME_SESSION: &str = "__Host_sorteio_session";

/// Sessions nobody used for this long are forgotten.
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Which organizer is logged in and what it is currently working on.
///
/// Only ids are kept. Every projection resolves them against the store again,
/// so a selection never serves stale copies of entities.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    organizer_id: Option<String>,
    event_id: Option<String>,
    raffle_id: Option<String>,
}

impl Selection {
    /// Email matches case-insensitively, the password must match exactly.
    ///
    /// Selects the organizer's first event, if any, and always clears the
    /// raffle selection.
    pub fn login(&mut self, store: &Store, email: &str, password: &str) -> Result<Organizer, AuthError> {
        let (organizer, first_event) = store.read(|tables| {
            let organizer = tables
                .organizer_by_email(email)
                .filter(|organizer| organizer.password.verify(password))
                .cloned()?;
            let first_event = tables
                .events_for_organizer(&organizer.id)
                .next()
                .map(|event| event.id.clone());
            Some((organizer, first_event))
        })
        .ok_or_else(|| {
            debug!("rejected login for {email}");
            AuthError::InvalidCredentials
        })?;

        info!(organizer = %organizer.id, "organizer logged in");
        self.organizer_id = Some(organizer.id.clone());
        self.event_id = first_event;
        self.raffle_id = None;
        Ok(organizer)
    }

    pub fn logout(&mut self) {
        *self = Self::default();
    }

    pub fn select_event(&mut self, event_id: Option<String>) {
        self.event_id = event_id;
    }

    pub fn select_raffle(&mut self, raffle_id: Option<String>) {
        self.raffle_id = raffle_id;
    }

    #[must_use]
    pub fn organizer_id(&self) -> Option<&str> {
        self.organizer_id.as_deref()
    }

    /// The logged in organizer, for routes only organizers may use.
    pub fn require_organizer(&self) -> Result<&str, AuthError> {
        self.organizer_id().ok_or(AuthError::NotLoggedIn)
    }

    #[must_use]
    pub fn raffle_id(&self) -> Option<&str> {
        self.raffle_id.as_deref()
    }

    #[must_use]
    pub fn active_organizer(&self, store: &Store) -> Option<Organizer> {
        let organizer_id = self.organizer_id.as_deref()?;
        store.read(|tables| tables.organizer(organizer_id).cloned())
    }

    #[must_use]
    pub fn organizer_events(&self, store: &Store) -> Vec<Event> {
        self.organizer_id
            .as_deref()
            .map(|organizer_id| store.list_events_for_organizer(organizer_id))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_event(&self, store: &Store) -> Option<Event> {
        let event_id = self.event_id.as_deref()?;
        store.read(|tables| tables.event(event_id).cloned())
    }

    #[must_use]
    pub fn active_raffle(&self, store: &Store) -> Option<Raffle> {
        let raffle_id = self.raffle_id.as_deref()?;
        store.read(|tables| tables.raffle(raffle_id).cloned())
    }

    #[must_use]
    pub fn active_event_raffles(&self, store: &Store) -> Vec<Raffle> {
        self.active_event(store)
            .map(|event| store.list_raffles_for_event(&event.id))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_participants(&self, store: &Store) -> Vec<Participant> {
        self.raffle_id
            .as_deref()
            .map(|raffle_id| store.list_participants_for_raffle(raffle_id))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn active_winners(&self, store: &Store) -> Vec<Winner> {
        self.active_raffle(store)
            .map(|raffle| store.list_winners_for_raffle(&raffle.id))
            .unwrap_or_default()
    }
}

/// Everything a client needs to render the organizer area.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    pub organizer: Option<Organizer>,
    pub organizer_events: Vec<Event>,
    pub active_event: Option<Event>,
    pub active_event_raffles: Vec<Raffle>,
    pub active_raffle: Option<Raffle>,
    pub participants: Vec<Participant>,
    pub winners: Vec<Winner>,
}

impl SelectionView {
    #[must_use]
    pub fn new(selection: &Selection, store: &Store) -> Self {
        Self {
            organizer: selection.active_organizer(store),
            organizer_events: selection.organizer_events(store),
            active_event: selection.active_event(store),
            active_event_raffles: selection.active_event_raffles(store),
            active_raffle: selection.active_raffle(store),
            participants: selection.active_participants(store),
            winners: selection.active_winners(store),
        }
    }
}

/// The browser session a request belongs to, identified by a cookie.
#[derive(Clone, Debug)]
#[must_use]
pub struct Session {
    // bool is true when the value was just created and must be sent back
    id: (String, bool),
}

impl Session {
    pub fn new<T>(request: &Request<T>) -> Self {
        let existing = request
            .headers()
            .get_all(COOKIE)
            .into_iter()
            .filter_map(|value| value.to_str().ok())
            .map(std::borrow::ToOwned::to_owned)
            .flat_map(Cookie::split_parse)
            .filter_map(std::result::Result::ok)
            .find(|cookie| cookie.name() == COOKIE_NAME_SESSION)
            .map(|cookie| cookie.value().to_owned())
            .filter(|value| !value.is_empty());
        let id = existing.map_or_else(
            || {
                (
                    thread_rng()
                        .sample_iter(&Alphanumeric)
                        .take(30)
                        .map(char::from)
                        .collect(),
                    true,
                )
            },
            |value| (value, false),
        );
        Self { id }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id.0
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.id.1
    }
}

pub trait ResponseSessionExt {
    #[must_use]
    fn with_session(self, session: &Session) -> Self;
}

impl ResponseSessionExt for http::response::Builder {
    fn with_session(self, session: &Session) -> Self {
        if !session.is_new() {
            return self;
        }
        let cookie = Cookie::build((COOKIE_NAME_SESSION, session.id().to_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build();
        match HeaderValue::try_from(cookie.to_string()) {
            Ok(value) => self.header(SET_COOKIE, value),
            Err(err) => {
                debug!("session cookie is not a valid header: {err}");
                self
            }
        }
    }
}

#[derive(Debug)]
struct Entry {
    selection: Selection,
    touched: Instant,
}

/// Selections of all live browser sessions.
///
/// Only sessions whose selection differs from the default are kept, and only
/// until they sit idle for longer than the timeout. Lock order is always
/// registry first, then store.
#[derive(Debug)]
pub struct SessionRegistry {
    selections: Mutex<HashMap<String, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(SESSION_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            selections: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    #[must_use]
    pub fn get(&self, session: &Session) -> Selection {
        let mut selections = self.selections.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match selections.get_mut(session.id()) {
            Some(entry) if now.duration_since(entry.touched) < self.idle_timeout => {
                entry.touched = now;
                entry.selection.clone()
            }
            _ => Selection::default(),
        }
    }

    pub fn update<R>(&self, session: &Session, f: impl FnOnce(&mut Selection) -> R) -> R {
        let mut selections = self.selections.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let before = selections.len();
        selections.retain(|_, entry| now.duration_since(entry.touched) < self.idle_timeout);
        if selections.len() < before {
            debug!("expired {} idle sessions", before - selections.len());
        }

        let mut selection = selections
            .remove(session.id())
            .map(|entry| entry.selection)
            .unwrap_or_default();
        let result = f(&mut selection);
        if selection != Selection::default() {
            selections.insert(
                session.id().to_owned(),
                Entry {
                    selection,
                    touched: now,
                },
            );
        }
        result
    }

    /// Number of sessions currently remembered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selections.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use sorteio_database::Store;

    use super::*;

    #[test]
    fn login_ignores_email_case_and_selects_first_event() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        selection.select_raffle(Some("raf_2".to_owned()));

        let organizer = selection.login(&store, "ADMIN@Triad3.io", "123").unwrap();
        assert_eq!(organizer.id, "org_1");
        assert_eq!(selection.organizer_id(), Some("org_1"));
        assert_eq!(
            selection.active_event(&store).map(|event| event.id),
            Some("evt_1700000000000".to_owned())
        );
        assert_eq!(selection.raffle_id(), None);
        assert_eq!(selection.active_event_raffles(&store).len(), 2);
    }

    #[test]
    fn wrong_password_changes_nothing() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        selection.select_raffle(Some("raf_1".to_owned()));
        assert_eq!(
            selection.login(&store, "admin@triad3.io", "1234"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            selection.login(&store, "nobody@triad3.io", "123"),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(selection.organizer_id(), None);
        assert_eq!(selection.raffle_id(), Some("raf_1"));
    }

    #[test]
    fn logout_clears_everything() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        selection.login(&store, "admin@festacorp.com", "password123").unwrap();
        selection.select_raffle(Some("raf_3".to_owned()));
        selection.logout();
        assert_eq!(selection, Selection::default());
        assert!(selection.organizer_events(&store).is_empty());
    }

    #[test]
    fn projections_resolve_to_none_for_unknown_ids() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        selection.select_event(Some("evt_missing".to_owned()));
        selection.select_raffle(Some("raf_missing".to_owned()));
        assert!(selection.active_event(&store).is_none());
        assert!(selection.active_raffle(&store).is_none());
        assert!(selection.active_event_raffles(&store).is_empty());
        assert!(selection.active_participants(&store).is_empty());
        assert!(selection.active_winners(&store).is_empty());
    }

    #[test]
    fn selecting_an_event_keeps_the_raffle() {
        let mut selection = Selection::default();
        selection.select_raffle(Some("raf_1".to_owned()));
        selection.select_event(Some("evt_1710000000000".to_owned()));
        assert_eq!(selection.raffle_id(), Some("raf_1"));
    }

    #[test]
    fn session_cookie_is_reused() {
        let request = Request::builder()
            .header(COOKIE, "other=1; __Host_sorteio_session=abc123")
            .body(())
            .unwrap();
        let session = Session::new(&request);
        assert_eq!(session.id(), "abc123");
        assert!(!session.is_new());

        let response = http::Response::builder().with_session(&session).body(()).unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn new_session_sets_cookie() {
        let session = Session::new(&Request::new(()));
        assert!(session.is_new());
        assert_eq!(session.id().len(), 30);
        let response = http::Response::builder().with_session(&session).body(()).unwrap();
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("{COOKIE_NAME_SESSION}={}", session.id())));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn registry_keeps_selections_apart() {
        let registry = SessionRegistry::default();
        let first = Session::new(&Request::new(()));
        let second = Session::new(&Request::new(()));
        registry.update(&first, |selection| selection.select_raffle(Some("raf_1".to_owned())));
        assert_eq!(registry.get(&first).raffle_id(), Some("raf_1"));
        assert_eq!(registry.get(&second), Selection::default());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_forgets_default_selections() {
        let store = Store::seeded();
        let registry = SessionRegistry::default();
        for _ in 0..1000 {
            let anonymous = Session::new(&Request::new(()));
            registry.update(&anonymous, Selection::logout);
            let failed = registry.update(&anonymous, |selection| {
                selection.login(&store, "admin@triad3.io", "wrong")
            });
            assert!(failed.is_err());
        }
        assert!(registry.is_empty());

        let session = Session::new(&Request::new(()));
        registry
            .update(&session, |selection| selection.login(&store, "admin@triad3.io", "123"))
            .unwrap();
        assert_eq!(registry.len(), 1);
        registry.update(&session, Selection::logout);
        assert!(registry.is_empty());
        assert_eq!(registry.get(&session), Selection::default());
    }

    #[test]
    fn idle_sessions_expire() {
        let registry = SessionRegistry::with_idle_timeout(Duration::ZERO);
        let first = Session::new(&Request::new(()));
        registry.update(&first, |selection| selection.select_raffle(Some("raf_1".to_owned())));
        assert_eq!(registry.get(&first), Selection::default());

        let second = Session::new(&Request::new(()));
        registry.update(&second, Selection::logout);
        assert!(registry.is_empty());
    }

    #[test]
    fn organizer_routes_need_a_login() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        assert_eq!(selection.require_organizer(), Err(AuthError::NotLoggedIn));
        selection.login(&store, "admin@triad3.io", "123").unwrap();
        assert_eq!(selection.require_organizer(), Ok("org_1"));
    }
}
