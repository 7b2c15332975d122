//! Normalisation of OCR and storage payloads into [`TicketRecord`].
//!
//! Payloads reach the client in three shapes:
//!
//! - the upload response envelope `{status, message, data}` from the OCR service,
//! - a bare ticket object,
//! - a stored history row `{id, game_type, draw_date, ticket_price, status, details}`
//!   where `details` holds the ticket, sometimes as an encoded JSON string.
//!
//! Older revisions wrote a single `toto_entry` (object or list) instead of
//! `toto_entries`. Both are folded into one list here so nothing past this
//! module has to care.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::CoreError;
use crate::model::{FourDBet, GameType, TicketRecord, TotoEntry};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Wire shape of a ticket. Only the active collection is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPayload {
    pub game_type: GameType,
    pub draw_date: NaiveDate,
    #[serde(default, deserialize_with = "price_or_zero")]
    pub ticket_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fourd_bets: Option<Vec<FourDBet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toto_entries: Option<Vec<TotoEntry>>,
    #[serde(default, skip_serializing)]
    toto_entry: Option<OneOrMany<TotoEntry>>,
}

impl From<TicketPayload> for TicketRecord {
    fn from(p: TicketPayload) -> Self {
        let toto_entries = match (p.toto_entries, p.toto_entry) {
            (Some(entries), legacy) => {
                if legacy.is_some() {
                    debug!("both toto_entries and toto_entry present, keeping toto_entries");
                }
                entries
            }
            (None, Some(OneOrMany::One(entry))) => {
                debug!("normalised legacy singular toto_entry");
                vec![entry]
            }
            (None, Some(OneOrMany::Many(entries))) => {
                debug!(count = entries.len(), "normalised legacy toto_entry list");
                entries
            }
            (None, None) => Vec::new(),
        };
        TicketRecord {
            game_type: p.game_type,
            draw_date: p.draw_date,
            ticket_price: p.ticket_price,
            fourd_bets: p.fourd_bets.unwrap_or_default(),
            toto_entries,
        }
    }
}

impl From<TicketRecord> for TicketPayload {
    fn from(r: TicketRecord) -> Self {
        let (fourd_bets, toto_entries) = match r.game_type {
            GameType::FourD => (Some(r.fourd_bets), None),
            GameType::Toto => (None, Some(r.toto_entries)),
        };
        TicketPayload {
            game_type: r.game_type,
            draw_date: r.draw_date,
            ticket_price: r.ticket_price,
            fourd_bets,
            toto_entries,
            toto_entry: None,
        }
    }
}

impl TicketRecord {
    /// Decode an upload response, either the `{status, message, data}`
    /// envelope or a bare ticket object.
    pub fn from_upload_json(json: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_upload_value(value)
    }

    pub fn from_upload_value(value: Value) -> Result<Self, CoreError> {
        let mut envelope = match value {
            Value::Object(map) if map.contains_key("data") && !map.contains_key("game_type") => {
                map
            }
            bare => return Ok(serde_json::from_value(bare)?),
        };
        let status = envelope
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("success")
            .to_string();
        if status != "success" {
            let message = envelope
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(CoreError::UploadRejected { status, message });
        }
        let data = envelope.remove("data").unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }
}

/// Outcome column of a stored ticket.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    #[default]
    Pending,
    Win,
    Loss,
    Other(String),
}

impl TicketStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Win => "win",
            TicketStatus::Loss => "loss",
            TicketStatus::Other(s) => s,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => TicketStatus::Pending,
            "win" | "won" => TicketStatus::Win,
            "loss" | "lost" => TicketStatus::Loss,
            _ => TicketStatus::Other(s),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(s: TicketStatus) -> Self {
        match s {
            TicketStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `tickets` table as returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTicket {
    #[serde(alias = "uuid")]
    pub id: String,
    #[serde(default)]
    pub game_type: Option<GameType>,
    #[serde(default)]
    pub draw_date: Option<NaiveDate>,
    #[serde(default)]
    pub ticket_price: Option<f64>,
    #[serde(default, alias = "win_status", deserialize_with = "status_or_pending")]
    pub status: TicketStatus,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl StoredTicket {
    /// Decode `details` into a record.
    ///
    /// Fields missing from `details` are filled from the row's own columns.
    pub fn record(&self) -> Result<TicketRecord, CoreError> {
        let mut details = match &self.details {
            Value::Null => return Err(CoreError::MissingDetails(self.id.clone())),
            Value::String(encoded) => serde_json::from_str::<Value>(encoded)?,
            other => other.clone(),
        };

        if let Value::Object(map) = &mut details {
            if let Some(game_type) = self.game_type {
                fill_missing(map, "game_type", Value::from(game_type.as_str()));
            }
            if let Some(draw_date) = self.draw_date {
                fill_missing(
                    map,
                    "draw_date",
                    Value::from(draw_date.format("%Y-%m-%d").to_string()),
                );
            }
            if let Some(price) = self.ticket_price {
                fill_missing(map, "ticket_price", Value::from(price));
            }
        }

        let record: TicketRecord = serde_json::from_value(details)?;
        debug!(id = %self.id, game_type = %record.game_type, "decoded stored ticket");
        Ok(record)
    }
}

fn fill_missing(map: &mut Map<String, Value>, key: &str, value: Value) {
    if matches!(map.get(key), None | Some(Value::Null)) {
        map.insert(key.to_string(), value);
    }
}

/// Insert payload for the `tickets` table. The owning user is attached by
/// the backend from the session token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTicket {
    pub game_type: GameType,
    pub draw_date: NaiveDate,
    pub ticket_price: f64,
    pub details: TicketRecord,
}

impl From<&TicketRecord> for NewTicket {
    fn from(record: &TicketRecord) -> Self {
        Self {
            game_type: record.game_type,
            draw_date: record.draw_date,
            ticket_price: record.ticket_price,
            details: record.clone(),
        }
    }
}

fn price_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn status_or_pending<'de, D>(deserializer: D) -> Result<TicketStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(TicketStatus::from)
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TotoBetType;
    use serde_json::json;

    fn toto_entry_json() -> Value {
        json!({
            "bet_type": "System",
            "numbers": [5, 12, 18, 23, 31, 42, 45],
            "system_size": 7,
            "system_roll": null
        })
    }

    #[test]
    fn legacy_singular_toto_entry_object() {
        let record: TicketRecord = serde_json::from_value(json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-18",
            "ticket_price": 7.0,
            "fourd_bets": null,
            "toto_entry": toto_entry_json()
        }))
        .unwrap();
        assert_eq!(record.toto_entries().len(), 1);
        assert_eq!(record.toto_entries()[0].bet_type, TotoBetType::System);
        assert_eq!(record.toto_entries()[0].system_size, Some(7));
    }

    #[test]
    fn legacy_toto_entry_list() {
        let record: TicketRecord = serde_json::from_value(json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-18",
            "ticket_price": 14.0,
            "toto_entry": [toto_entry_json(), toto_entry_json()]
        }))
        .unwrap();
        assert_eq!(record.toto_entries().len(), 2);
    }

    #[test]
    fn plural_form_wins_over_legacy() {
        let record: TicketRecord = serde_json::from_value(json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-18",
            "ticket_price": 7.0,
            "toto_entries": [toto_entry_json()],
            "toto_entry": [toto_entry_json(), toto_entry_json()]
        }))
        .unwrap();
        assert_eq!(record.toto_entries().len(), 1);
    }

    #[test]
    fn serialises_only_the_active_collection() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let mut record = TicketRecord::fourd(date, 2.0, vec![FourDBet::default()]);
        record.toto_entries.push(TotoEntry::placeholder("A".into()));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["game_type"], "4D");
        assert_eq!(value["draw_date"], "2026-01-15");
        assert!(value["fourd_bets"].is_array());
        assert!(value.get("toto_entries").is_none());
        assert!(value.get("toto_entry").is_none());
    }

    #[test]
    fn null_ticket_price_reads_as_zero() {
        let record: TicketRecord = serde_json::from_value(json!({
            "game_type": "4D",
            "draw_date": "2026-01-15",
            "ticket_price": null,
            "fourd_bets": []
        }))
        .unwrap();
        assert_eq!(record.ticket_price, 0.0);
    }

    #[test]
    fn upload_envelope_is_unwrapped() {
        let json = r#"{
            "status": "success",
            "message": "Ticket processed successfully",
            "data": {
                "game_type": "4D",
                "draw_date": "2026-01-15",
                "ticket_price": 3.0,
                "fourd_bets": [
                    {"entry_type": "Ordinary", "number": "1234", "big_amount": 1.0, "small_amount": 1.0},
                    {"entry_type": "Roll", "roll_pattern": "58X2", "big_amount": 1.0, "small_amount": 0.0}
                ],
                "toto_entry": null
            }
        }"#;
        let record = TicketRecord::from_upload_json(json).unwrap();
        assert_eq!(record.game_type, GameType::FourD);
        assert_eq!(record.fourd_bets().len(), 2);
        assert_eq!(record.fourd_bets()[1].roll_pattern.as_deref(), Some("58X2"));
    }

    #[test]
    fn bare_upload_object_is_accepted() {
        let record = TicketRecord::from_upload_value(json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-18",
            "ticket_price": 1.0,
            "toto_entries": [{"bet_type": "Ordinary", "numbers": [7, 14, 21, 28, 35, 42]}]
        }))
        .unwrap();
        assert_eq!(record.toto_entries()[0].numbers.len(), 6);
    }

    #[test]
    fn failed_upload_envelope_is_rejected() {
        let err = TicketRecord::from_upload_value(json!({
            "status": "error",
            "message": "OCR timed out",
            "data": null
        }))
        .unwrap_err();
        assert!(matches!(err, CoreError::UploadRejected { .. }));
        assert!(err.to_string().contains("OCR timed out"));
    }

    #[test]
    fn stored_ticket_with_encoded_details() {
        let details = json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-08",
            "ticket_price": 1.0,
            "toto_entry": {"bet_type": "Ordinary", "numbers": [7, 14, 21, 28, 35, 42]}
        })
        .to_string();
        let row: StoredTicket = serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440003",
            "game_type": "TOTO",
            "draw_date": "2026-01-08",
            "ticket_price": 1.0,
            "status": "loss",
            "details": details
        }))
        .unwrap();
        assert_eq!(row.status, TicketStatus::Loss);
        let record = row.record().unwrap();
        assert_eq!(record.toto_entries().len(), 1);
        assert_eq!(record.toto_entries()[0].numbers[0], 7);
    }

    #[test]
    fn stored_ticket_fills_missing_fields_from_columns() {
        let row: StoredTicket = serde_json::from_value(json!({
            "uuid": "t-1",
            "game_type": "4D",
            "draw_date": "2026-01-05",
            "ticket_price": 1.0,
            "win_status": "win",
            "details": {"fourd_bets": [{"entry_type": "Ordinary", "number": "8888"}]}
        }))
        .unwrap();
        assert_eq!(row.id, "t-1");
        assert_eq!(row.status, TicketStatus::Win);

        let record = row.record().unwrap();
        assert_eq!(record.game_type, GameType::FourD);
        assert_eq!(record.draw_date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(record.ticket_price, 1.0);
    }

    #[test]
    fn history_rows_with_loose_labels_decode() {
        let rows: Vec<StoredTicket> = serde_json::from_value(json!([
            {"id": "t-1", "game_type": "toto", "draw_date": "2026-01-08", "ticket_price": 44.0,
             "details": {"toto_entries": [{"bet_type": "system roll",
                 "system_roll": {"fixed_numbers": [1, 2, 3, 4, 5], "roll_from": 6, "roll_to": 49}}]}},
            {"id": "t-2", "game_type": "4d", "draw_date": "2026-01-05", "ticket_price": 1.0,
             "details": {"fourd_bets": [{"entry_type": "Ordinary", "number": "8888"}]}}
        ]))
        .unwrap();
        assert_eq!(rows[0].game_type, Some(GameType::Toto));
        let record = rows[0].record().unwrap();
        assert_eq!(record.game_type, GameType::Toto);
        assert_eq!(record.toto_entries()[0].bet_type, TotoBetType::SystemRoll);
        assert_eq!(rows[1].record().unwrap().game_type, GameType::FourD);
    }

    #[test]
    fn stored_ticket_without_details_errors() {
        let row: StoredTicket =
            serde_json::from_value(json!({"id": "t-2", "status": null})).unwrap();
        assert_eq!(row.status, TicketStatus::Pending);
        assert!(matches!(row.record(), Err(CoreError::MissingDetails(id)) if id == "t-2"));
    }

    #[test]
    fn new_ticket_mirrors_record_columns() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let record = TicketRecord::fourd(date, 2.0, vec![FourDBet::default()]);
        let value = serde_json::to_value(NewTicket::from(&record)).unwrap();
        assert_eq!(value["game_type"], "4D");
        assert_eq!(value["ticket_price"], 2.0);
        assert_eq!(value["details"]["fourd_bets"][0]["big_amount"], 1.0);
    }
}
