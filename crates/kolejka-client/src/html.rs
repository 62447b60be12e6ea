//! Office-list recovery from the upstream HTML page.
//!
//! The page embeds one `<div>` per dataset; an office entry is a div whose
//! `class`/`role` attributes carry fixed sentinel values, with the office
//! key in its `id` attribute and the display name in the first non-empty
//! text node after the literal `Opis danych` marker. Everything else on
//! the page is noise and skipped.

use kolejka_core::office::Office;
use quick_xml::events::Event;

/// `class` attribute of an office entry div.
const OFFICE_DIV_CLASS: &str = "show_example";
/// `role` attribute of an office entry div.
const OFFICE_DIV_ROLE: &str = "wsstore_api_info#https://api.um.warszawa.pl/api/action";
/// Literal text preceding the office display name.
const NAME_MARKER: &str = "Opis danych";

enum State {
  /// Scanning for the next office entry div.
  Scanning,
  /// Entry div seen; waiting for the name marker text.
  AwaitingMarker,
  /// Marker seen; the next non-empty text node is the office name.
  AwaitingName,
}

/// Recover the office list from the HTML document.
///
/// Tolerant by design: markup the reader cannot make sense of ends the
/// walk, returning whatever complete entries were recovered up to that
/// point (an empty list for garbage input, never an error). Entries whose
/// name never arrived are dropped.
pub fn parse_office_list(html: &str) -> Vec<Office> {
  let mut reader = quick_xml::Reader::from_str(html);
  let config = reader.config_mut();
  config.check_end_names = false;
  config.allow_unmatched_ends = true;

  let mut offices: Vec<Office> = Vec::new();
  let mut pending_key: Option<String> = None;
  let mut state = State::Scanning;

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.name().as_ref() == b"div" => {
        let mut class = None;
        let mut role = None;
        let mut id = None;
        for attr in e.attributes().with_checks(false).flatten() {
          let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => continue,
          };
          match attr.key.as_ref() {
            b"class" => class = Some(value),
            b"role" => role = Some(value),
            b"id" => id = Some(value),
            _ => {}
          }
        }
        if class.as_deref() == Some(OFFICE_DIV_CLASS)
          && role.as_deref() == Some(OFFICE_DIV_ROLE)
          && let Some(id) = id
        {
          pending_key = Some(id);
          state = State::AwaitingMarker;
        }
      }
      Ok(Event::Text(ref e)) => {
        let Ok(text) = e.unescape() else { continue };
        let text = text.trim();
        if text.is_empty() {
          continue;
        }
        match state {
          State::AwaitingName => {
            if let Some(key) = pending_key.take() {
              offices.push(Office {
                key,
                name: text.to_owned(),
              });
            }
            state = State::Scanning;
          }
          State::AwaitingMarker if text == NAME_MARKER => {
            state = State::AwaitingName;
          }
          _ => {}
        }
      }
      Ok(Event::Eof) | Err(_) => break,
      Ok(_) => {}
    }
  }

  offices
}
