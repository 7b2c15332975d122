//! Field-shape and structural checks for a ticket.
//!
//! The edit engine never refuses input, so a record may hold values that
//! are not valid bets. [`validate`] reports them without failing; callers
//! decide whether a violation blocks confirmation.

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

use crate::derive::display_label;
use crate::model::{
    ActiveBets, FOURD_DIGITS, FourDBet, FourDEntryType, MAX_TOTO_NUMBERS, MIN_TOTO_NUMBERS,
    SYSTEM_ROLL_FIXED_NUMBERS, TOTO_NUMBER_RANGE, TicketRecord, TotoBetType, TotoEntry,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("ticket has no bet lines")]
    NoBets,

    #[error("ticket price {0} is negative")]
    NegativePrice(f64),

    #[error("4D line {line}: number {number:?} is not 4 digits")]
    BadFourDNumber { line: usize, number: String },

    #[error("4D line {line}: roll pattern {pattern:?} needs 4 characters with exactly one X")]
    BadRollPattern { line: usize, pattern: String },

    #[error("4D line {line}: no number or roll pattern")]
    MissingFourDNumber { line: usize },

    #[error("4D line {line}: {field} amount {amount} is negative")]
    NegativeAmount {
        line: usize,
        field: &'static str,
        amount: f64,
    },

    #[error("TOTO entry {label}: system size {system_size} does not match {count} numbers")]
    SystemSizeMismatch {
        label: String,
        system_size: usize,
        count: usize,
    },

    #[error("TOTO entry {label}: System bet has no system size")]
    MissingSystemSize { label: String },

    #[error("TOTO entry {label}: {count} numbers, expected 6 to 12")]
    NumberCount { label: String, count: usize },

    #[error("TOTO entry {label}: number {number} is outside 1-49")]
    NumberOutOfRange { label: String, number: i32 },

    #[error("TOTO entry {label}: number {number} appears more than once")]
    DuplicateNumber { label: String, number: i32 },

    #[error("TOTO entry {label}: System Roll bet has no roll details")]
    MissingSystemRoll { label: String },

    #[error("TOTO entry {label}: System Roll has {count} fixed numbers, expected 5")]
    FixedNumberCount { label: String, count: usize },

    #[error("TOTO entry {label}: roll range {from}-{to} is invalid")]
    BadRollRange { label: String, from: i32, to: i32 },
}

/// Every violation found in a record, in line order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.violations.is_empty() {
            return f.write_str("no violations");
        }
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

pub fn validate(record: &TicketRecord) -> ValidationReport {
    let mut violations = Vec::new();

    if record.ticket_price < 0.0 {
        violations.push(Violation::NegativePrice(record.ticket_price));
    }

    let active = record.active();
    if active.is_empty() {
        violations.push(Violation::NoBets);
    }
    match active {
        ActiveBets::FourD(bets) => {
            for (i, bet) in bets.iter().enumerate() {
                check_fourd_bet(i + 1, bet, &mut violations);
            }
        }
        ActiveBets::Toto(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                check_toto_entry(&display_label(entry, i), entry, &mut violations);
            }
        }
    }

    ValidationReport { violations }
}

fn check_fourd_bet(line: usize, bet: &FourDBet, out: &mut Vec<Violation>) {
    let number = bet.number.as_deref().filter(|n| !n.is_empty());
    let pattern = bet.roll_pattern.as_deref().filter(|p| !p.is_empty());

    match (number, pattern) {
        (Some(number), _) => {
            if !is_fourd_number(number) {
                out.push(Violation::BadFourDNumber {
                    line,
                    number: number.to_string(),
                });
            }
        }
        (None, Some(pattern)) => {
            if !is_roll_pattern(pattern) {
                out.push(Violation::BadRollPattern {
                    line,
                    pattern: pattern.to_string(),
                });
            }
        }
        (None, None) => out.push(Violation::MissingFourDNumber { line }),
    }

    // A Roll line that also carries a number still needs a sound pattern.
    if bet.entry_type == FourDEntryType::Roll
        && number.is_some()
        && let Some(pattern) = pattern
        && !is_roll_pattern(pattern)
    {
        out.push(Violation::BadRollPattern {
            line,
            pattern: pattern.to_string(),
        });
    }

    for (field, amount) in [("big", bet.big_amount), ("small", bet.small_amount)] {
        if amount < 0.0 {
            out.push(Violation::NegativeAmount {
                line,
                field,
                amount,
            });
        }
    }
}

fn check_toto_entry(label: &str, entry: &TotoEntry, out: &mut Vec<Violation>) {
    let count = entry.numbers.len();

    match entry.system_size {
        Some(system_size) if system_size != count => out.push(Violation::SystemSizeMismatch {
            label: label.to_string(),
            system_size,
            count,
        }),
        None if entry.bet_type == TotoBetType::System => out.push(Violation::MissingSystemSize {
            label: label.to_string(),
        }),
        _ => {}
    }

    if entry.bet_type != TotoBetType::SystemRoll
        && !(MIN_TOTO_NUMBERS..=MAX_TOTO_NUMBERS).contains(&count)
    {
        out.push(Violation::NumberCount {
            label: label.to_string(),
            count,
        });
    }

    check_numbers(label, &entry.numbers, out);

    if entry.bet_type == TotoBetType::SystemRoll {
        match &entry.system_roll {
            None => out.push(Violation::MissingSystemRoll {
                label: label.to_string(),
            }),
            Some(roll) => {
                if roll.fixed_numbers.len() != SYSTEM_ROLL_FIXED_NUMBERS {
                    out.push(Violation::FixedNumberCount {
                        label: label.to_string(),
                        count: roll.fixed_numbers.len(),
                    });
                }
                check_numbers(label, &roll.fixed_numbers, out);
                if roll.roll_from > roll.roll_to
                    || !TOTO_NUMBER_RANGE.contains(&roll.roll_from)
                    || !TOTO_NUMBER_RANGE.contains(&roll.roll_to)
                {
                    out.push(Violation::BadRollRange {
                        label: label.to_string(),
                        from: roll.roll_from,
                        to: roll.roll_to,
                    });
                }
            }
        }
    }
}

fn check_numbers(label: &str, numbers: &[i32], out: &mut Vec<Violation>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for &number in numbers {
        if !TOTO_NUMBER_RANGE.contains(&number) {
            out.push(Violation::NumberOutOfRange {
                label: label.to_string(),
                number,
            });
        }
        if !seen.insert(number) && reported.insert(number) {
            out.push(Violation::DuplicateNumber {
                label: label.to_string(),
                number,
            });
        }
    }
}

fn is_fourd_number(s: &str) -> bool {
    s.len() == FOURD_DIGITS && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_roll_pattern(s: &str) -> bool {
    let upper = s.trim().to_ascii_uppercase();
    upper.len() == FOURD_DIGITS
        && upper.bytes().all(|b| b.is_ascii_digit() || b == b'X')
        && upper.bytes().filter(|&b| b == b'X').count() == 1
}
