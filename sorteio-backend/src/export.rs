//! Winner history export and shareable participation links.

use std::fmt::{Display, Write as _};

use chrono::TimeZone;
use sorteio_database::models::Winner;

const CSV_HEADER: &str = "Nome do Ganhador,Telefone,Data do Sorteio";
const DATE_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// CSV of the winners, most recent draw first, dates rendered in `tz`.
///
/// Starts with a byte order mark so spreadsheet tools pick up UTF-8.
pub fn winners_csv<Tz>(winners: &[Winner], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut csv = format!("\u{feff}{CSV_HEADER}");
    for winner in winners.iter().rev() {
        let drawn_at = winner.drawn_at.with_timezone(tz).format(DATE_FORMAT).to_string();
        // writing to a String cannot fail
        let _ = write!(
            csv,
            "\n{},{},{}",
            quoted(&winner.participant.name),
            quoted(&winner.participant.phone),
            quoted(&drawn_at),
        );
    }
    csv
}

#[must_use]
pub fn export_file_name(event_name: Option<&str>) -> String {
    let stem = event_name
        .map(|name| name.split_whitespace().collect::<Vec<_>>().join("_"))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "sorteio".to_owned());
    format!("historico_{stem}.csv")
}

/// Link that opens the public registration form with `code` filled in.
#[must_use]
pub fn participation_url(base_url: &str, code: &str) -> String {
    format!("{base_url}#/participar?code={code}")
}

fn split_area_code(head: &str) -> (&str, &str) {
    let bytes = head.as_bytes();
    let has_area_code = bytes.len() >= 4
        && bytes[0] == b'('
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_digit()
        && bytes[3] == b')';
    if !has_area_code {
        return ("", head);
    }
    let number = head[4..].trim_start();
    let area_code_len = head.len() - number.len();
    (&head[..area_code_len], number.trim())
}

/// Hides the middle digits of a phone like `(11) 98765-4321`.
///
/// Anything not shaped like `prefix-suffix` with a four or five digit prefix
/// comes back unchanged.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let mut parts = phone.split('-');
    let (Some(head), Some(tail), None) = (parts.next(), parts.next(), parts.next()) else {
        return phone.to_owned();
    };
    let (area_code, number) = split_area_code(head);
    let mut chars = number.chars();
    let masked = match number.chars().count() {
        5 => chars.next().map(|first| format!("{first}****")),
        4 => Some("****".to_owned()),
        _ => None,
    };
    masked.map_or_else(|| phone.to_owned(), |masked| format!("{area_code}{masked}-{tail}"))
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};
    use sorteio_database::models::Participant;

    use super::*;

    fn winner(name: &str, phone: &str, timestamp: i64) -> Winner {
        Winner {
            participant: Participant {
                id: 1,
                name: name.to_owned(),
                phone: phone.to_owned(),
                email: "w@x.com".to_owned(),
                raffle_id: "raf_1".to_owned(),
                is_winner: true,
            },
            drawn_at: Utc.timestamp_opt(timestamp, 0).unwrap(),
        }
    }

    #[test]
    fn csv_lists_newest_first() {
        let winners = [
            winner("Ana Silva", "(11) 98765-4321", 1_700_000_000),
            winner("Bruno \"B\" Costa", "(21) 91234-5678", 1_700_003_600),
        ];
        let csv = winners_csv(&winners, &FixedOffset::west_opt(3 * 3600).unwrap());
        assert_eq!(
            csv,
            "\u{feff}Nome do Ganhador,Telefone,Data do Sorteio\n\
             \"Bruno \"\"B\"\" Costa\",\"(21) 91234-5678\",\"14/11/2023, 20:13:20\"\n\
             \"Ana Silva\",\"(11) 98765-4321\",\"14/11/2023, 19:13:20\""
        );
    }

    #[test]
    fn empty_csv_has_header_only() {
        assert_eq!(
            winners_csv(&[], &Utc),
            "\u{feff}Nome do Ganhador,Telefone,Data do Sorteio"
        );
    }

    #[test]
    fn file_name_uses_event_name() {
        assert_eq!(
            export_file_name(Some("Conferência Tech  2024")),
            "historico_Conferência_Tech_2024.csv"
        );
        assert_eq!(export_file_name(None), "historico_sorteio.csv");
        assert_eq!(export_file_name(Some("  ")), "historico_sorteio.csv");
    }

    #[test]
    fn participation_link() {
        assert_eq!(
            participation_url("http://localhost:3000/", "TCNFTECH4K"),
            "http://localhost:3000/#/participar?code=TCNFTECH4K"
        );
    }

    #[test]
    fn phones_are_masked() {
        assert_eq!(mask_phone("(11) 98765-4321"), "(11) 9****-4321");
        assert_eq!(mask_phone("(21) 1234-5678"), "(21) ****-5678");
        assert_eq!(mask_phone("98765-4321"), "9****-4321");
        assert_eq!(mask_phone("11987654321"), "11987654321");
        assert_eq!(mask_phone("(11) 987-654-321"), "(11) 987-654-321");
        assert_eq!(mask_phone("(11) 987-4321"), "(11) 987-4321");
    }
}
