//! Decoding of the JSON queue-status payload.
//!
//! The envelope's `result` field is an object on success and a bare
//! string on upstream failure; the accompanying `error` field (or the
//! `result` string itself) is the error message. Numeric fields arrive as
//! numbers or numeric strings depending on the upstream's mood, so the
//! decoders accept both.

use chrono::NaiveDateTime;
use kolejka_core::{
  Error, Result,
  matter::{Matter, MatterWithSample},
  sample::{Sample, TIME_FORMAT},
};
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ResultBody {
  date:  String,
  time:  String,
  grupy: Vec<Group>,
}

/// One queue group as the upstream reports it.
#[derive(Debug, Deserialize)]
struct Group {
  #[serde(rename = "nazwaGrupy", deserialize_with = "flexible_string")]
  name:           String,
  #[serde(rename = "lp", deserialize_with = "flexible_opt_int")]
  ordinal:        Option<i64>,
  #[serde(rename = "idGrupy", deserialize_with = "flexible_int")]
  group_id:       i64,
  #[serde(rename = "liczbaKlwKolejce", deserialize_with = "flexible_int")]
  queue_length:   i64,
  #[serde(rename = "liczbaCzynnychStan", deserialize_with = "flexible_int")]
  open_counters:  i64,
  #[serde(rename = "aktualnyNumer", deserialize_with = "flexible_string")]
  current_number: String,
}

/// Decode the payload into matter/sample pairs, sorted by matter name.
///
/// Every pair carries the same response-wide timestamp: the upstream
/// reports queue state atomically, one sample per matter per response.
pub fn parse_matters(payload: &str) -> Result<Vec<MatterWithSample>> {
  let envelope: Value = serde_json::from_str(payload)
    .map_err(|e| Error::Response(format!("malformed payload: {e}")))?;

  let result = envelope
    .get("result")
    .ok_or_else(|| Error::Response("payload has no result field".into()))?;

  // A string-typed result is the upstream's error envelope.
  if let Some(fallback) = result.as_str() {
    let message = envelope
      .get("error")
      .and_then(Value::as_str)
      .unwrap_or(fallback);
    return Err(Error::Response(message.to_owned()));
  }

  let body: ResultBody = serde_json::from_value(result.clone())
    .map_err(|e| Error::Response(format!("malformed result object: {e}")))?;

  let time = parse_response_time(&body.date, &body.time)?;

  let mut pairs: Vec<MatterWithSample> = body
    .grupy
    .into_iter()
    .map(|group| MatterWithSample {
      matter: Matter {
        name:     group.name,
        ordinal:  group.ordinal,
        group_id: group.group_id,
      },
      sample: Sample {
        time,
        queue_length:   group.queue_length,
        open_counters:  group.open_counters,
        current_number: group.current_number,
      },
    })
    .collect();
  pairs.sort_by(|a, b| a.matter.name.cmp(&b.matter.name));
  Ok(pairs)
}

/// Combine the response's `date` and `time` fields; the upstream usually
/// reports minute resolution but occasionally includes seconds.
fn parse_response_time(date: &str, time: &str) -> Result<NaiveDateTime> {
  let stamp = format!("{date} {time}");
  NaiveDateTime::parse_from_str(&stamp, TIME_FORMAT)
    .or_else(|_| NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S"))
    .map_err(|e| Error::Response(format!("bad response timestamp {stamp:?}: {e}")))
}

// ─── Flexible field decoders ─────────────────────────────────────────────────

fn int_from_value(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn flexible_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
  let value = Value::deserialize(deserializer)?;
  int_from_value(&value)
    .ok_or_else(|| de::Error::custom(format!("expected integer, got {value}")))
}

fn flexible_opt_int<'de, D: Deserializer<'de>>(
  deserializer: D,
) -> Result<Option<i64>, D::Error> {
  let value = Value::deserialize(deserializer)?;
  if value.is_null() {
    return Ok(None);
  }
  int_from_value(&value)
    .map(Some)
    .ok_or_else(|| de::Error::custom(format!("expected integer or null, got {value}")))
}

fn flexible_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(de::Error::custom(format!("expected string, got {other}"))),
  }
}
