use tracing::info;

use crate::models::{Event, Organizer, Participant, Raffle};
use crate::password::PasswordHash;
use crate::Tables;

fn organizer(id: &str, name: &str, email: &str, password: &str, code: &str) -> Organizer {
    Organizer {
        id: id.to_owned(),
        name: name.to_owned(),
        email: email.to_owned(),
        organizer_code: code.to_owned(),
        password: PasswordHash::new(password),
    }
}

fn event(id: &str, name: &str, organizer_id: &str, code: &str) -> Event {
    Event {
        id: id.to_owned(),
        name: name.to_owned(),
        organizer_id: organizer_id.to_owned(),
        code: code.to_owned(),
    }
}

fn raffle(id: &str, event_id: &str, name: &str, quantity: u32, code: &str) -> Raffle {
    Raffle {
        id: id.to_owned(),
        event_id: event_id.to_owned(),
        name: name.to_owned(),
        quantity,
        code: code.to_owned(),
    }
}

fn participant(id: u64, name: &str, phone: &str, email: &str, raffle_id: &str) -> Participant {
    Participant {
        id,
        name: name.to_owned(),
        phone: phone.to_owned(),
        email: email.to_owned(),
        raffle_id: raffle_id.to_owned(),
        is_winner: false,
    }
}

pub fn load(tables: &mut Tables) {
    tables.organizers.extend([
        organizer("org_1", "Admin TechConf", "admin@triad3.io", "123", "TCNF"),
        organizer(
            "org_2",
            "Festa Corp",
            "admin@festacorp.com",
            "password123",
            "FCORP",
        ),
    ]);
    tables.events.extend([
        event(
            "evt_1700000000000",
            "Conferência Tech 2024",
            "org_1",
            "TCNFTECH",
        ),
        event(
            "evt_1710000000000",
            "Festa de Fim de Ano",
            "org_2",
            "FCORPFEST",
        ),
    ]);
    tables.raffles.extend([
        raffle("raf_1", "evt_1700000000000", "Monitor Gamer 4K", 1, "TCNFTECH4K"),
        raffle("raf_2", "evt_1700000000000", "Teclado Mecânico", 3, "TCNFKEYCAPS"),
        raffle("raf_3", "evt_1710000000000", "Cesta de Natal", 5, "FCORPNATAL24"),
    ]);
    tables.participants.extend([
        participant(1, "Ana Silva", "(11) 98765-4321", "ana.silva@example.com", "raf_1"),
        participant(2, "Bruno Costa", "(21) 91234-5678", "bruno.costa@example.com", "raf_1"),
        participant(3, "Carlos Dias", "(31) 99999-8888", "carlos.dias@example.com", "raf_2"),
        participant(6, "Felipe Gomes", "(61) 92222-5555", "felipe.gomes@example.com", "raf_3"),
        participant(7, "Gabriela Rocha", "(71) 91111-4444", "gabriela.rocha@example.com", "raf_3"),
    ]);
    tables.shuffle_participants();
    info!(
        organizers = tables.organizers.len(),
        raffles = tables.raffles.len(),
        participants = tables.participants.len(),
        "loaded demo data"
    );
}
