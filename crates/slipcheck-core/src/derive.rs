//! Read-only derivations used when displaying a ticket.

use crate::model::{ActiveBets, FourDBet, TicketRecord, TotoEntry};

const DEFAULT_BET_TYPE: &str = "Ordinary";

/// Bet type of the record as a whole, taken from its first bet line.
///
/// Falls back to `"Ordinary"` when the active collection is empty.
pub fn derive_bet_type(record: &TicketRecord) -> String {
    match record.active() {
        ActiveBets::FourD(bets) => bets
            .first()
            .map(|b| b.entry_type.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_BET_TYPE)
            .to_string(),
        ActiveBets::Toto(entries) => entries
            .first()
            .map(|e| e.bet_type.as_str())
            .unwrap_or(DEFAULT_BET_TYPE)
            .to_string(),
    }
}

/// Ordinal label for the entry at `index`: A..Z, then AA, AB, ...
pub fn entry_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

/// The entry's explicit label, else its ordinal label.
pub fn display_label(entry: &TotoEntry, index: usize) -> String {
    match entry.label.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => entry_label(index),
    }
}

/// The number printed for a 4D line: the number, else the roll pattern.
pub fn display_number(bet: &FourDBet) -> &str {
    bet.number
        .as_deref()
        .filter(|n| !n.is_empty())
        .or(bet.roll_pattern.as_deref().filter(|p| !p.is_empty()))
        .unwrap_or("N/A")
}

/// Sum of Big and Small stakes over the active 4D lines.
///
/// This is a display aid only. `ticket_price` stays whatever was entered.
pub fn fourd_stake_total(record: &TicketRecord) -> f64 {
    match record.active() {
        ActiveBets::FourD(bets) => bets.iter().map(|b| b.big_amount + b.small_amount).sum(),
        ActiveBets::Toto(_) => 0.0,
    }
}

/// Number of six-number lines a System bet of `size` numbers covers, C(size, 6).
///
/// Saturates at `u64::MAX` for sizes far beyond any real slip.
pub fn system_combinations(size: usize) -> u64 {
    if size < 6 {
        return 0;
    }
    let size = size as u64;
    (0..6u64).try_fold(1u64, |acc, k| {
        acc.checked_mul(size - k).map(|n| n / (k + 1))
    })
    .unwrap_or(u64::MAX)
}
