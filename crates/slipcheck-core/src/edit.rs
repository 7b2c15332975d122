//! Edit engine: pure operations over [`TicketRecord`].
//!
//! Every operation borrows the record and returns a new one. Nothing here
//! fails. Malformed numeric text is coerced to zero, out-of-range indices
//! and structural limits (last line, 6/12 numbers) turn the operation into
//! a no-op. [`crate::validate`] reports whatever the edits leave behind.
//!
//! `system_size` is never set directly. Any operation that touches an
//! entry's numbers recomputes it from `numbers.len()`.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::derive::{display_label, entry_label};
use crate::model::{
    FourDBet, FourDEntryType, GameType, MAX_TOTO_NUMBERS, MIN_TOTO_NUMBERS,
    SYSTEM_ROLL_FIXED_NUMBERS, SystemRoll, TicketRecord, TotoBetType, TotoEntry,
};

/// Number appended by [`add_toto_number`].
const NEW_TOTO_NUMBER: i32 = 1;

/// Editable fields of a 4D line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FourDField {
    Number,
    RollPattern,
    EntryType,
    BigAmount,
    SmallAmount,
}

/// Top-level fields set by direct replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketField {
    DrawDate,
    TicketPrice,
}

/// One edit, as issued by the view or replayed from a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    SetGameType {
        game_type: GameType,
    },
    AddFourdBet,
    RemoveFourdBet {
        index: usize,
    },
    UpdateFourdBet {
        index: usize,
        field: FourDField,
        value: String,
    },
    AddTotoEntry,
    RemoveTotoEntry {
        index: usize,
    },
    AddTotoNumber {
        entry: usize,
    },
    RemoveTotoNumber {
        entry: usize,
        index: usize,
    },
    UpdateTotoNumber {
        entry: usize,
        index: usize,
        value: i32,
    },
    SetTotoBetType {
        entry: usize,
        bet_type: TotoBetType,
    },
    SetRollRange {
        entry: usize,
        from: i32,
        to: i32,
    },
    UpdateRollFixedNumber {
        entry: usize,
        index: usize,
        value: i32,
    },
    SetField {
        field: TicketField,
        value: String,
    },
}

pub fn apply(record: &TicketRecord, op: &EditOp) -> TicketRecord {
    match op {
        EditOp::SetGameType { game_type } => set_game_type(record, *game_type),
        EditOp::AddFourdBet => add_fourd_bet(record),
        EditOp::RemoveFourdBet { index } => remove_fourd_bet(record, *index),
        EditOp::UpdateFourdBet {
            index,
            field,
            value,
        } => update_fourd_bet_field(record, *index, *field, value),
        EditOp::AddTotoEntry => add_toto_entry(record),
        EditOp::RemoveTotoEntry { index } => remove_toto_entry(record, *index),
        EditOp::AddTotoNumber { entry } => add_toto_number(record, *entry),
        EditOp::RemoveTotoNumber { entry, index } => remove_toto_number(record, *entry, *index),
        EditOp::UpdateTotoNumber {
            entry,
            index,
            value,
        } => update_toto_number(record, *entry, *index, *value),
        EditOp::SetTotoBetType { entry, bet_type } => set_toto_bet_type(record, *entry, *bet_type),
        EditOp::SetRollRange { entry, from, to } => set_roll_range(record, *entry, *from, *to),
        EditOp::UpdateRollFixedNumber {
            entry,
            index,
            value,
        } => update_roll_fixed_number(record, *entry, *index, *value),
        EditOp::SetField { field, value } => set_field(record, *field, value),
    }
}

// ── Game type ──

/// Switch the active collection. The other collection is kept as is.
pub fn set_game_type(record: &TicketRecord, game_type: GameType) -> TicketRecord {
    let mut next = record.clone();
    if next.game_type != game_type {
        debug!(from = %next.game_type, to = %game_type, "switched game type");
        next.game_type = game_type;
    }
    next
}

// ── 4D lines ──

pub fn add_fourd_bet(record: &TicketRecord) -> TicketRecord {
    let mut next = record.clone();
    next.fourd_bets.push(FourDBet::default());
    next
}

/// Remove a 4D line. The last remaining line is never removed.
pub fn remove_fourd_bet(record: &TicketRecord, index: usize) -> TicketRecord {
    let mut next = record.clone();
    if next.fourd_bets.len() <= 1 {
        debug!(index, "refused to remove the last 4D line");
    } else if index < next.fourd_bets.len() {
        next.fourd_bets.remove(index);
    } else {
        debug!(index, len = next.fourd_bets.len(), "4D line index out of range");
    }
    next
}

pub fn update_fourd_bet_field(
    record: &TicketRecord,
    index: usize,
    field: FourDField,
    value: &str,
) -> TicketRecord {
    let mut next = record.clone();
    let Some(bet) = next.fourd_bets.get_mut(index) else {
        debug!(index, "4D line index out of range");
        return next;
    };
    match field {
        FourDField::Number => bet.number = non_empty(value.trim()),
        FourDField::RollPattern => bet.roll_pattern = non_empty(&value.trim().to_ascii_uppercase()),
        FourDField::EntryType => bet.entry_type = FourDEntryType::from(value.trim()),
        FourDField::BigAmount => bet.big_amount = coerce_amount(value),
        FourDField::SmallAmount => bet.small_amount = coerce_amount(value),
    }
    next
}

// ── TOTO entries ──

/// Append a placeholder Ordinary entry labelled with the next free letter.
pub fn add_toto_entry(record: &TicketRecord) -> TicketRecord {
    let mut next = record.clone();
    let label = next_label(&next.toto_entries);
    next.toto_entries.push(TotoEntry::placeholder(label));
    next
}

/// Remove a TOTO entry. The last remaining entry is never removed.
pub fn remove_toto_entry(record: &TicketRecord, index: usize) -> TicketRecord {
    let mut next = record.clone();
    if next.toto_entries.len() <= 1 {
        debug!(index, "refused to remove the last TOTO entry");
    } else if index < next.toto_entries.len() {
        next.toto_entries.remove(index);
    } else {
        debug!(index, len = next.toto_entries.len(), "TOTO entry index out of range");
    }
    next
}

/// Append `1` to an entry, up to 12 numbers.
pub fn add_toto_number(record: &TicketRecord, entry: usize) -> TicketRecord {
    with_entry(record, entry, |e| {
        if e.numbers.len() >= MAX_TOTO_NUMBERS {
            debug!(entry, "entry already holds the maximum of 12 numbers");
        } else {
            e.numbers.push(NEW_TOTO_NUMBER);
        }
        e.resync_system_size();
    })
}

/// Remove a number from an entry, down to 6 numbers.
pub fn remove_toto_number(record: &TicketRecord, entry: usize, index: usize) -> TicketRecord {
    with_entry(record, entry, |e| {
        if e.numbers.len() <= MIN_TOTO_NUMBERS {
            debug!(entry, "entry already holds the minimum of 6 numbers");
        } else if index < e.numbers.len() {
            e.numbers.remove(index);
        } else {
            debug!(entry, index, "TOTO number index out of range");
        }
        e.resync_system_size();
    })
}

/// Replace a number in place. Values outside 1-49 are kept as typed.
pub fn update_toto_number(
    record: &TicketRecord,
    entry: usize,
    index: usize,
    value: i32,
) -> TicketRecord {
    with_entry(record, entry, |e| {
        match e.numbers.get_mut(index) {
            Some(slot) => *slot = value,
            None => debug!(entry, index, "TOTO number index out of range"),
        }
        e.resync_system_size();
    })
}

/// Change an entry's bet type.
///
/// Moving to System Roll seeds the roll from the first five numbers over
/// the full 1-49 range; moving away drops the roll details.
pub fn set_toto_bet_type(record: &TicketRecord, entry: usize, bet_type: TotoBetType) -> TicketRecord {
    with_entry(record, entry, |e| {
        e.bet_type = bet_type;
        if bet_type == TotoBetType::SystemRoll {
            if e.system_roll.is_none() {
                e.system_roll = Some(SystemRoll {
                    fixed_numbers: e
                        .numbers
                        .iter()
                        .take(SYSTEM_ROLL_FIXED_NUMBERS)
                        .copied()
                        .collect(),
                    roll_from: 1,
                    roll_to: 49,
                });
            }
        } else {
            e.system_roll = None;
        }
        e.resync_system_size();
    })
}

pub fn set_roll_range(record: &TicketRecord, entry: usize, from: i32, to: i32) -> TicketRecord {
    with_entry(record, entry, |e| match e.system_roll.as_mut() {
        Some(roll) => {
            roll.roll_from = from;
            roll.roll_to = to;
        }
        None => debug!(entry, "entry has no system roll"),
    })
}

pub fn update_roll_fixed_number(
    record: &TicketRecord,
    entry: usize,
    index: usize,
    value: i32,
) -> TicketRecord {
    with_entry(record, entry, |e| {
        match e
            .system_roll
            .as_mut()
            .and_then(|roll| roll.fixed_numbers.get_mut(index))
        {
            Some(slot) => *slot = value,
            None => debug!(entry, index, "no fixed roll number at index"),
        }
    })
}

// ── Top-level fields ──

/// Replace `draw_date` or `ticket_price` from user text.
///
/// A date that is not `YYYY-MM-DD` leaves the old date in place; a price
/// that does not parse becomes zero.
pub fn set_field(record: &TicketRecord, field: TicketField, value: &str) -> TicketRecord {
    let mut next = record.clone();
    match field {
        TicketField::DrawDate => match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
            Ok(date) => next.draw_date = date,
            Err(e) => warn!(value, error = %e, "ignored malformed draw date"),
        },
        TicketField::TicketPrice => next.ticket_price = coerce_amount(value),
    }
    next
}

// ── Helpers ──

/// Run `f` on one TOTO entry of a copy. Operations that change `numbers`
/// resync `system_size` themselves.
fn with_entry(
    record: &TicketRecord,
    entry: usize,
    f: impl FnOnce(&mut TotoEntry),
) -> TicketRecord {
    let mut next = record.clone();
    match next.toto_entries.get_mut(entry) {
        Some(e) => f(e),
        None => debug!(entry, "TOTO entry index out of range"),
    }
    next
}

/// First ordinal label, counting up from the entry count, not already used.
fn next_label(entries: &[TotoEntry]) -> String {
    let taken: HashSet<String> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| display_label(e, i))
        .collect();
    let mut i = entries.len();
    loop {
        let label = entry_label(i);
        if !taken.contains(&label) {
            return label;
        }
        i += 1;
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Parse a monetary amount, coercing anything unusable to zero.
pub fn coerce_amount(text: &str) -> f64 {
    let trimmed = text.trim().trim_start_matches('$');
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!(text, "coerced malformed amount to 0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 18).unwrap()
    }

    fn fourd_one_line() -> TicketRecord {
        TicketRecord::fourd(
            date(),
            2.0,
            vec![FourDBet {
                number: Some("1234".into()),
                ..FourDBet::default()
            }],
        )
    }

    fn toto_system(numbers: Vec<i32>) -> TicketRecord {
        TicketRecord::toto(
            date(),
            7.0,
            vec![TotoEntry {
                label: Some("A".into()),
                bet_type: TotoBetType::System,
                system_size: Some(numbers.len()),
                numbers,
                system_roll: None,
            }],
        )
    }

    fn entry(record: &TicketRecord, i: usize) -> &TotoEntry {
        &record.toto_entries()[i]
    }

    #[test]
    fn system_bet_grows_and_shrinks() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);

        let grown = add_toto_number(&record, 0);
        assert_eq!(entry(&grown, 0).numbers.len(), 7);
        assert_eq!(entry(&grown, 0).system_size, Some(7));

        let shrunk = remove_toto_number(&grown, 0, 0);
        assert_eq!(entry(&shrunk, 0).numbers, vec![2, 3, 4, 5, 6, 1]);
        assert_eq!(entry(&shrunk, 0).system_size, Some(6));
    }

    #[test]
    fn system_size_tracks_numbers_after_every_number_op() {
        let mut record = toto_system(vec![3, 9, 15, 22, 31, 40]);
        // Start from a stale size so each op has to fix it.
        record.toto_entries[0].system_size = Some(9);

        let ops = [
            EditOp::UpdateTotoNumber {
                entry: 0,
                index: 2,
                value: 16,
            },
            EditOp::AddTotoNumber { entry: 0 },
            EditOp::AddTotoNumber { entry: 0 },
            EditOp::RemoveTotoNumber { entry: 0, index: 1 },
            EditOp::UpdateTotoNumber {
                entry: 0,
                index: 0,
                value: 77,
            },
        ];
        for op in &ops {
            record = apply(&record, op);
            let e = entry(&record, 0);
            assert_eq!(e.system_size, Some(e.numbers.len()), "after {op:?}");
        }
    }

    #[test]
    fn number_count_is_capped_at_twelve() {
        let record = toto_system((1..=12).collect());
        let next = add_toto_number(&record, 0);
        assert_eq!(next, record);
    }

    #[test]
    fn number_count_floor_is_six() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        let next = remove_toto_number(&record, 0, 3);
        assert_eq!(next, record);
    }

    #[test]
    fn out_of_range_number_is_kept_as_typed() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        let next = update_toto_number(&record, 0, 5, 99);
        assert_eq!(entry(&next, 0).numbers[5], 99);
        assert_eq!(entry(&next, 0).system_size, Some(6));
    }

    #[test]
    fn last_fourd_line_is_kept() {
        let record = fourd_one_line();
        let next = remove_fourd_bet(&record, 0);
        assert_eq!(next, record);
        assert_eq!(next.fourd_bets().len(), 1);
    }

    #[test]
    fn last_toto_entry_is_kept() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(remove_toto_entry(&record, 0), record);
    }

    #[test]
    fn fourd_lines_add_and_remove() {
        let record = add_fourd_bet(&fourd_one_line());
        assert_eq!(record.fourd_bets().len(), 2);
        let added = &record.fourd_bets()[1];
        assert_eq!(added.number, None);
        assert_eq!(added.entry_type, FourDEntryType::Ordinary);
        assert_eq!(added.big_amount, 1.0);
        assert_eq!(added.small_amount, 1.0);

        let removed = remove_fourd_bet(&record, 0);
        assert_eq!(removed.fourd_bets().len(), 1);
        assert_eq!(removed.fourd_bets()[0].number, None);

        assert_eq!(remove_fourd_bet(&record, 5), record);
    }

    #[test]
    fn fourd_field_updates_coerce_amounts() {
        let record = fourd_one_line();
        let next = update_fourd_bet_field(&record, 0, FourDField::BigAmount, "abc");
        assert_eq!(next.fourd_bets()[0].big_amount, 0.0);

        let next = update_fourd_bet_field(&next, 0, FourDField::SmallAmount, " $2.50 ");
        assert_eq!(next.fourd_bets()[0].small_amount, 2.5);

        let next = update_fourd_bet_field(&next, 0, FourDField::SmallAmount, "inf");
        assert_eq!(next.fourd_bets()[0].small_amount, 0.0);

        let next = update_fourd_bet_field(&next, 0, FourDField::EntryType, "roll");
        assert_eq!(next.fourd_bets()[0].entry_type, FourDEntryType::Roll);

        let next = update_fourd_bet_field(&next, 0, FourDField::RollPattern, "58x2");
        assert_eq!(next.fourd_bets()[0].roll_pattern.as_deref(), Some("58X2"));

        let next = update_fourd_bet_field(&next, 0, FourDField::Number, "  ");
        assert_eq!(next.fourd_bets()[0].number, None);
    }

    #[test]
    fn game_type_round_trip_keeps_fourd_lines() {
        let record = add_fourd_bet(&fourd_one_line());
        let as_toto = set_game_type(&record, GameType::Toto);
        assert_eq!(as_toto.game_type, GameType::Toto);
        assert!(as_toto.toto_entries().is_empty());

        let back = set_game_type(&as_toto, GameType::FourD);
        assert_eq!(back.fourd_bets(), record.fourd_bets());
        assert_eq!(back, record);
    }

    #[test]
    fn toto_labels_continue_the_sequence() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        let record = add_toto_entry(&add_toto_entry(&record));
        let labels: Vec<_> = record
            .toto_entries()
            .iter()
            .map(|e| e.label.clone().unwrap())
            .collect();
        assert_eq!(labels, ["A", "B", "C"]);
        assert_eq!(entry(&record, 2).numbers, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(entry(&record, 2).bet_type, TotoBetType::Ordinary);
        assert_eq!(entry(&record, 2).system_size, Some(6));

        // Removing B then adding must not hand out C twice.
        let record = add_toto_entry(&remove_toto_entry(&record, 1));
        let labels: Vec<_> = record
            .toto_entries()
            .iter()
            .map(|e| e.label.clone().unwrap())
            .collect();
        assert_eq!(labels, ["A", "C", "D"]);
    }

    #[test]
    fn switching_to_system_roll_seeds_roll() {
        let record = toto_system(vec![4, 8, 15, 16, 23, 42]);
        let rolled = set_toto_bet_type(&record, 0, TotoBetType::SystemRoll);
        let roll = entry(&rolled, 0).system_roll.clone().unwrap();
        assert_eq!(roll.fixed_numbers, vec![4, 8, 15, 16, 23]);
        assert_eq!((roll.roll_from, roll.roll_to), (1, 49));

        let ranged = set_roll_range(&rolled, 0, 24, 49);
        let ranged = update_roll_fixed_number(&ranged, 0, 0, 5);
        let roll = entry(&ranged, 0).system_roll.clone().unwrap();
        assert_eq!(roll.roll_from, 24);
        assert_eq!(roll.fixed_numbers[0], 5);

        let back = set_toto_bet_type(&ranged, 0, TotoBetType::System);
        assert_eq!(entry(&back, 0).system_roll, None);
        assert_eq!(entry(&back, 0).system_size, Some(6));
    }

    #[test]
    fn roll_edits_leave_system_size_alone() {
        let record: TicketRecord = serde_json::from_value(serde_json::json!({
            "game_type": "TOTO",
            "draw_date": "2026-01-18",
            "ticket_price": 44.0,
            "toto_entries": [{
                "bet_type": "SystemRoll",
                "numbers": null,
                "system_size": null,
                "system_roll": {"fixed_numbers": [1, 2, 3, 4, 5], "roll_from": 6, "roll_to": 49}
            }]
        }))
        .unwrap();

        let ranged = set_roll_range(&record, 0, 10, 40);
        let fixed = update_roll_fixed_number(&ranged, 0, 4, 7);
        let retyped = set_toto_bet_type(&fixed, 0, TotoBetType::SystemRoll);
        for next in [&ranged, &fixed, &retyped] {
            assert_eq!(entry(next, 0).system_size, None);
        }
        let value = serde_json::to_value(&retyped).unwrap();
        assert!(value["toto_entries"][0]["system_size"].is_null());
        assert_eq!(value["toto_entries"][0]["system_roll"]["roll_from"], 10);

        // A stale size on a System entry is untouched by roll-only edits.
        let mut stale = toto_system(vec![1, 2, 3, 4, 5, 6, 7]);
        stale.toto_entries[0].system_size = Some(9);
        assert_eq!(entry(&set_roll_range(&stale, 0, 1, 2), 0).system_size, Some(9));
    }

    #[test]
    fn set_field_replaces_top_level_values() {
        let record = fourd_one_line();
        let next = set_field(&record, TicketField::DrawDate, "2026-02-01");
        assert_eq!(next.draw_date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());

        let kept = set_field(&next, TicketField::DrawDate, "1 Feb");
        assert_eq!(kept.draw_date, next.draw_date);

        let priced = set_field(&kept, TicketField::TicketPrice, "12.5");
        assert_eq!(priced.ticket_price, 12.5);
        let zeroed = set_field(&priced, TicketField::TicketPrice, "twelve");
        assert_eq!(zeroed.ticket_price, 0.0);
    }

    #[test]
    fn ticket_price_is_not_recomputed_by_edits() {
        let record = fourd_one_line();
        let next = add_fourd_bet(&add_fourd_bet(&record));
        let next = update_fourd_bet_field(&next, 1, FourDField::BigAmount, "10");
        assert_eq!(next.ticket_price, 2.0);
    }

    #[test]
    fn operations_leave_the_input_untouched() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        let before = record.clone();
        let _ = add_toto_number(&record, 0);
        let _ = update_toto_number(&record, 0, 0, 9);
        let _ = add_toto_entry(&record);
        let _ = set_game_type(&record, GameType::FourD);
        assert_eq!(record, before);
    }

    #[test]
    fn edit_ops_decode_from_script_json() {
        let ops: Vec<EditOp> = serde_json::from_str(
            r#"[
                {"op": "add_toto_number", "entry": 0},
                {"op": "update_fourd_bet", "index": 0, "field": "big_amount", "value": "3"},
                {"op": "set_field", "field": "draw_date", "value": "2026-03-01"},
                {"op": "set_game_type", "game_type": "4D"},
                {"op": "add_toto_entry"}
            ]"#,
        )
        .unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[0], EditOp::AddTotoNumber { entry: 0 });
        assert_eq!(
            ops[3],
            EditOp::SetGameType {
                game_type: GameType::FourD
            }
        );
        assert_eq!(ops[4], EditOp::AddTotoEntry);
    }

    #[test]
    fn out_of_range_entry_is_a_no_op() {
        let record = toto_system(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(add_toto_number(&record, 3), record);
        assert_eq!(update_toto_number(&record, 0, 6, 10), record);
        assert_eq!(set_roll_range(&record, 0, 1, 2), record);
    }
}
