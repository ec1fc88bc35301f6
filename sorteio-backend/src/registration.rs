//! Creation of organizers, events, raffles and participants.
//!
//! Each operation checks its uniqueness rules and commits inside a single
//! store write, so two concurrent requests can never both pass the same check.

use serde::Deserialize;
use sorteio_database::error::{AuthError, ValidationError};
use sorteio_database::models::{eq_ignore_case, event_code, Event, Organizer, Participant, Raffle};
use sorteio_database::password::PasswordHash;
use sorteio_database::Store;
use sorteio_relay::RemoteRaffle;
use tracing::{debug, info};

use crate::session::Selection;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganizer {
    pub name: String,
    pub email: String,
    pub password: String,
    pub organizer_code: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub organizer_id: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewRaffle {
    pub event_name: String,
    pub raffle_name: String,
    pub quantity: u32,
    /// Appended to the organizer code to form the raffle code.
    pub raffle_code: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewParticipant {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub raffle_id: String,
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        debug!("rejected empty {field}");
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

pub fn create_organizer(store: &Store, new: NewOrganizer) -> Result<Organizer, ValidationError> {
    require("nome", &new.name)?;
    require("e-mail", &new.email)?;
    require("senha", &new.password)?;
    let organizer_code = new.organizer_code.trim().to_owned();
    require("código do organizador", &organizer_code)?;

    let organizer = store.write(|tables| {
        if tables.organizer_by_email(&new.email).is_some() {
            return Err(ValidationError::DuplicateEmail);
        }
        if tables
            .organizers()
            .any(|organizer| eq_ignore_case(&organizer.organizer_code, &organizer_code))
        {
            return Err(ValidationError::DuplicateOrganizerCode);
        }
        Ok(tables.push_organizer(
            new.name,
            new.email,
            PasswordHash::new(&new.password),
            organizer_code,
        ))
    })?;
    info!(organizer = %organizer.id, code = %organizer.organizer_code, "organizer created");
    Ok(organizer)
}

pub fn create_event(store: &Store, new: NewEvent) -> Result<Event, ValidationError> {
    require("nome do evento", &new.name)?;
    let event = store.write(|tables| {
        let organizer_code = tables
            .organizer(&new.organizer_id)
            .ok_or_else(|| ValidationError::unresolved("Organizador", new.organizer_id.as_str()))?
            .organizer_code
            .clone();
        let code = event_code(&organizer_code, &new.name);
        tables.push_event(new.name, &new.organizer_id, code)
    })?;
    info!(event = %event.id, code = %event.code, "event created");
    Ok(event)
}

/// The full raffle code the logged in organizer would get for `suffix`.
pub fn full_raffle_code(organizer: &Organizer, suffix: &str) -> String {
    format!("{}{suffix}", organizer.organizer_code)
}

/// Field checks that need no store access.
pub fn check_raffle_form(new: &NewRaffle) -> Result<(), ValidationError> {
    require("nome do evento", &new.event_name)?;
    require("objeto do sorteio", &new.raffle_name)?;
    require("código do sorteio", &new.raffle_code)?;
    if new.quantity < 1 {
        return Err(ValidationError::InvalidQuantity);
    }
    Ok(())
}

/// Adds a raffle to the organizer's event named `event_name`, creating that
/// event first when the organizer has none with that name.
///
/// The resolved event becomes the active one. Raffle codes are unique across
/// all organizers, not just within the event.
pub fn create_event_with_raffle(
    store: &Store,
    selection: &mut Selection,
    new: NewRaffle,
) -> Result<Raffle, RegistrationError> {
    let organizer_id = selection.organizer_id().ok_or(AuthError::NotLoggedIn)?.to_owned();
    check_raffle_form(&new)?;

    let (event, raffle) = store.write(|tables| {
        let organizer = tables
            .organizer(&organizer_id)
            .cloned()
            .ok_or(AuthError::NotLoggedIn)?;
        let code = full_raffle_code(&organizer, &new.raffle_code);
        if tables.raffle_by_code(&code).is_some() {
            return Err(ValidationError::DuplicateRaffleCode(code).into());
        }

        let existing = tables
            .events_for_organizer(&organizer.id)
            .find(|event| eq_ignore_case(&event.name, &new.event_name))
            .cloned();
        let event = match existing {
            Some(event) => event,
            None => {
                let event_code = event_code(&organizer.organizer_code, &new.event_name);
                let event = tables.push_event(new.event_name, &organizer.id, event_code)?;
                info!(event = %event.id, "event created for new raffle");
                event
            }
        };
        let raffle = tables.push_raffle(&event.id, new.raffle_name, new.quantity, code)?;
        Ok::<_, RegistrationError>((event, raffle))
    })?;

    selection.select_event(Some(event.id));
    info!(raffle = %raffle.id, code = %raffle.code, "raffle created");
    Ok(raffle)
}

/// Owner of remote raffles whose row names no company.
const EXTERNAL_ORGANIZER_CODE: &str = "EXTERNO";
const EXTERNAL_EVENT_NAME: &str = "Evento externo";

/// Stores a raffle only known to the remote listing so participants can
/// join it.
///
/// It is owned by the local organizer with the row's company code, or by a
/// placeholder organizer nobody can log in to. The event is matched by name
/// within that organizer. Adopting a code that is already stored returns the
/// stored raffle.
pub fn adopt_remote_raffle(store: &Store, remote: &RemoteRaffle) -> Result<(Raffle, Event), ValidationError> {
    let code = remote.code.as_deref().map(str::trim).unwrap_or_default();
    require("código do sorteio", code)?;
    let company = remote.company().unwrap_or(EXTERNAL_ORGANIZER_CODE);
    let event_name = match remote.event_name.trim() {
        "" => EXTERNAL_EVENT_NAME,
        name => name,
    };

    store.write(|tables| {
        if let Some(raffle) = tables.raffle_by_code(code).cloned() {
            let event = tables
                .event(&raffle.event_id)
                .cloned()
                .ok_or_else(|| ValidationError::unresolved("Evento", raffle.event_id.as_str()))?;
            return Ok((raffle, event));
        }

        let existing = tables
            .organizers()
            .find(|organizer| eq_ignore_case(&organizer.organizer_code, company))
            .cloned();
        let organizer = match existing {
            Some(organizer) => organizer,
            None => tables.push_organizer(
                company.to_owned(),
                String::new(),
                PasswordHash::locked(),
                company.to_owned(),
            ),
        };
        let existing = tables
            .events_for_organizer(&organizer.id)
            .find(|event| eq_ignore_case(&event.name, event_name))
            .cloned();
        let event = match existing {
            Some(event) => event,
            None => {
                let code = event_code(&organizer.organizer_code, event_name);
                tables.push_event(event_name.to_owned(), &organizer.id, code)?
            }
        };
        let raffle = tables.push_raffle(
            &event.id,
            remote.name.clone(),
            remote.parsed_quantity(),
            code.to_owned(),
        )?;
        info!(raffle = %raffle.id, code = %raffle.code, "remote raffle adopted");
        Ok((raffle, event))
    })
}

/// Registers a participant. The same email may join different raffles but
/// each raffle only once.
pub fn add_participant(store: &Store, new: NewParticipant) -> Result<Participant, ValidationError> {
    if new.raffle_id.is_empty() {
        return Err(ValidationError::unresolved("Sorteio", ""));
    }
    require("nome", &new.name)?;
    require("telefone", &new.phone)?;
    require("e-mail", &new.email)?;

    let participant = store.write(|tables| {
        if tables
            .participants_for_raffle(&new.raffle_id)
            .any(|participant| eq_ignore_case(&participant.email, &new.email))
        {
            return Err(ValidationError::DuplicateRegistration);
        }
        tables.push_participant(new.name, new.phone, new.email, &new.raffle_id)
    })?;
    info!(participant = participant.id, raffle = %participant.raffle_id, "participant registered");
    Ok(participant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_organizer(email: &str, code: &str) -> NewOrganizer {
        NewOrganizer {
            name: "Org".to_owned(),
            email: email.to_owned(),
            password: "secret".to_owned(),
            organizer_code: code.to_owned(),
        }
    }

    fn new_participant(name: &str, email: &str, raffle_id: &str) -> NewParticipant {
        NewParticipant {
            name: name.to_owned(),
            phone: "111".to_owned(),
            email: email.to_owned(),
            raffle_id: raffle_id.to_owned(),
        }
    }

    fn new_raffle(event_name: &str, suffix: &str) -> NewRaffle {
        NewRaffle {
            event_name: event_name.to_owned(),
            raffle_name: "Prize".to_owned(),
            quantity: 1,
            raffle_code: suffix.to_owned(),
        }
    }

    fn logged_in(store: &Store) -> Selection {
        let mut selection = Selection::default();
        selection.login(store, "admin@triad3.io", "123").unwrap();
        selection
    }

    #[test]
    fn organizer_email_and_code_are_unique_ignoring_case() {
        let store = Store::seeded();
        assert_eq!(
            create_organizer(&store, new_organizer("ADMIN@TRIAD3.IO", "NEW")),
            Err(ValidationError::DuplicateEmail)
        );
        assert_eq!(
            create_organizer(&store, new_organizer("new@x.com", "tcnf")),
            Err(ValidationError::DuplicateOrganizerCode)
        );
        assert_eq!(
            create_organizer(&store, new_organizer("new@x.com", "  tcnf ")),
            Err(ValidationError::DuplicateOrganizerCode)
        );
        assert_eq!(
            create_organizer(&store, new_organizer("new@x.com", "   ")),
            Err(ValidationError::EmptyField("código do organizador"))
        );

        let organizer = create_organizer(&store, new_organizer("new@x.com", " NEW ")).unwrap();
        assert_eq!(organizer.organizer_code, "NEW");
        assert!(organizer.id.starts_with("org_"));
        let mut selection = Selection::default();
        assert!(selection.login(&store, "NEW@x.com", "secret").is_ok());
    }

    #[test]
    fn event_code_is_derived_from_organizer_and_name() {
        let store = Store::seeded();
        let event = create_event(
            &store,
            NewEvent {
                name: "Feira de Ciências".to_owned(),
                organizer_id: "org_2".to_owned(),
            },
        )
        .unwrap();
        assert_eq!(event.code, "FCORPFEIR");
        assert_eq!(store.list_events_for_organizer("org_2").len(), 2);

        assert_eq!(
            create_event(
                &store,
                NewEvent {
                    name: " ".to_owned(),
                    organizer_id: "org_2".to_owned(),
                },
            ),
            Err(ValidationError::EmptyField("nome do evento"))
        );
        assert_eq!(
            create_event(
                &store,
                NewEvent {
                    name: "Feira".to_owned(),
                    organizer_id: "org_404".to_owned(),
                },
            ),
            Err(ValidationError::unresolved("Organizador", "org_404"))
        );
    }

    #[test]
    fn raffle_requires_login() {
        let store = Store::seeded();
        let mut selection = Selection::default();
        assert_eq!(
            create_event_with_raffle(&store, &mut selection, new_raffle("Conf", "CODE1")),
            Err(RegistrationError::Auth(AuthError::NotLoggedIn))
        );
    }

    #[test]
    fn raffle_reuses_event_with_same_name() {
        let store = Store::seeded();
        let mut selection = logged_in(&store);

        let first = create_event_with_raffle(&store, &mut selection, new_raffle("Conf", "CODE1")).unwrap();
        assert_eq!(first.code, "TCNFCODE1");
        let event = selection.active_event(&store).unwrap();
        assert_eq!(event.id, first.event_id);
        assert_eq!(event.code, "TCNFCONF");

        selection.select_event(None);
        let second = create_event_with_raffle(&store, &mut selection, new_raffle("conf", "CODE2")).unwrap();
        assert_eq!(second.event_id, first.event_id);
        assert_eq!(selection.active_event(&store).unwrap().id, first.event_id);
        assert_eq!(store.list_events_for_organizer("org_1").len(), 2);
        assert_eq!(store.list_raffles_for_event(&first.event_id).len(), 2);
    }

    #[test]
    fn raffle_codes_are_unique_system_wide() {
        let store = Store::seeded();
        let mut selection = logged_in(&store);
        let events_before = store.list_events_for_organizer("org_1").len();

        assert_eq!(
            create_event_with_raffle(&store, &mut selection, new_raffle("Novo", "tech4k")),
            Err(RegistrationError::Validation(ValidationError::DuplicateRaffleCode(
                "TCNFtech4k".to_owned()
            )))
        );
        // a rejected raffle leaves no event behind
        assert_eq!(store.list_events_for_organizer("org_1").len(), events_before);
    }

    #[test]
    fn raffle_form_fields_are_validated() {
        let store = Store::seeded();
        let mut selection = logged_in(&store);
        let mut zero = new_raffle("Conf", "CODE1");
        zero.quantity = 0;
        assert_eq!(
            create_event_with_raffle(&store, &mut selection, zero),
            Err(RegistrationError::Validation(ValidationError::InvalidQuantity))
        );
        assert_eq!(
            create_event_with_raffle(&store, &mut selection, new_raffle("Conf", "")),
            Err(RegistrationError::Validation(ValidationError::EmptyField(
                "código do sorteio"
            )))
        );
    }

    #[test]
    fn duplicate_registration_is_per_raffle() {
        let store = Store::seeded();
        let first = add_participant(&store, new_participant("Bob", "bob@x.com", "raf_1")).unwrap();
        assert!(!first.is_winner);
        assert_eq!(
            add_participant(&store, new_participant("Bob2", "BOB@x.com", "raf_1")),
            Err(ValidationError::DuplicateRegistration)
        );
        assert!(add_participant(&store, new_participant("Bob", "bob@x.com", "raf_2")).is_ok());
        assert_eq!(store.list_participants_for_raffle("raf_1").len(), 3);
    }

    fn remote(row: serde_json::Value) -> RemoteRaffle {
        serde_json::from_value(row).unwrap()
    }

    #[test]
    fn remote_raffle_joins_the_local_company() {
        let store = Store::seeded();
        let row = remote(serde_json::json!({
            "Id": 42, "Objeto do sorteio": "Bicicleta", "Quantidade de objetos": "2 unidades",
            "Código do sorteio": "TCNFBIKE", "Nome do evento": "conferência tech 2024",
            "Código da empresa": "tcnf"
        }));
        let (raffle, event) = adopt_remote_raffle(&store, &row).unwrap();
        assert_eq!(event.id, "evt_1700000000000");
        assert_eq!(raffle.event_id, event.id);
        assert_eq!(raffle.quantity, 2);
        assert_eq!(raffle.code, "TCNFBIKE");
        assert_eq!(store.list_organizers().len(), 2);

        let (again, _) = adopt_remote_raffle(&store, &row).unwrap();
        assert_eq!(again, raffle);
        assert!(add_participant(&store, new_participant("Ana", "ana@x.com", &raffle.id)).is_ok());
    }

    #[test]
    fn remote_raffle_without_company_gets_a_locked_owner() {
        let store = Store::seeded();
        let row = remote(serde_json::json!({
            "Id": "7", "Objeto do sorteio": "Caneca", "Código do sorteio": "XYZ", "Nome do evento": ""
        }));
        let (raffle, event) = adopt_remote_raffle(&store, &row).unwrap();
        assert_eq!(event.name, "Evento externo");
        assert_eq!(raffle.quantity, 1);
        let owner = store.read(|tables| tables.organizer(&event.organizer_id).cloned()).unwrap();
        assert_eq!(owner.organizer_code, "EXTERNO");
        assert!(!owner.password.verify(""));
        assert!(Selection::default().login(&store, "", "").is_err());

        let nameless = remote(serde_json::json!({"Id": 8, "Objeto do sorteio": "Copo"}));
        assert_eq!(
            adopt_remote_raffle(&store, &nameless),
            Err(ValidationError::EmptyField("código do sorteio"))
        );
    }

    #[test]
    fn participant_needs_an_existing_raffle() {
        let store = Store::seeded();
        assert_eq!(
            add_participant(&store, new_participant("Bob", "bob@x.com", "")),
            Err(ValidationError::unresolved("Sorteio", ""))
        );
        assert_eq!(
            add_participant(&store, new_participant("Bob", "bob@x.com", "raf_404")),
            Err(ValidationError::unresolved("Sorteio", "raf_404"))
        );
    }
}
