//! Canonical in-memory ticket shape.
//!
//! A [`TicketRecord`] carries both bet collections. `game_type` selects the
//! active one; the inactive collection is kept untouched so that switching
//! the game type back and forth loses nothing. Only the active collection is
//! written out on the wire (see [`crate::boundary`]).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Fewest numbers a TOTO entry may hold.
pub const MIN_TOTO_NUMBERS: usize = 6;
/// Most numbers a TOTO entry may hold (System 12).
pub const MAX_TOTO_NUMBERS: usize = 12;
/// Fixed numbers in a System Roll; the sixth is rolled.
pub const SYSTEM_ROLL_FIXED_NUMBERS: usize = 5;
/// Lowest and highest TOTO ball.
pub const TOTO_NUMBER_RANGE: std::ops::RangeInclusive<i32> = 1..=49;
/// Length of a 4D number or roll pattern.
pub const FOURD_DIGITS: usize = 4;

/// Written as `"4D"` / `"TOTO"`; read case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GameType {
    FourD,
    Toto,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::FourD => "4D",
            GameType::Toto => "TOTO",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for GameType {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<GameType> for String {
    fn from(g: GameType) -> Self {
        g.as_str().to_string()
    }
}

impl FromStr for GameType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            t if t.eq_ignore_ascii_case("4d") => Ok(GameType::FourD),
            t if t.eq_ignore_ascii_case("toto") => Ok(GameType::Toto),
            other => Err(CoreError::UnknownGameType(other.to_string())),
        }
    }
}

/// Category of a 4D bet line as printed on the slip.
///
/// OCR output is free-form, so labels outside the known set are kept
/// verbatim in [`FourDEntryType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FourDEntryType {
    #[default]
    Ordinary,
    Roll,
    System,
    IBet,
    Other(String),
}

impl FourDEntryType {
    pub fn as_str(&self) -> &str {
        match self {
            FourDEntryType::Ordinary => "Ordinary",
            FourDEntryType::Roll => "Roll",
            FourDEntryType::System => "System",
            FourDEntryType::IBet => "iBet",
            FourDEntryType::Other(s) => s,
        }
    }
}

impl From<String> for FourDEntryType {
    fn from(s: String) -> Self {
        let t = s.trim();
        if t.eq_ignore_ascii_case("ordinary") {
            FourDEntryType::Ordinary
        } else if t.eq_ignore_ascii_case("roll") {
            FourDEntryType::Roll
        } else if t.eq_ignore_ascii_case("system") {
            FourDEntryType::System
        } else if t.eq_ignore_ascii_case("ibet") {
            FourDEntryType::IBet
        } else {
            FourDEntryType::Other(s)
        }
    }
}

impl From<&str> for FourDEntryType {
    fn from(s: &str) -> Self {
        FourDEntryType::from(s.to_string())
    }
}

impl From<FourDEntryType> for String {
    fn from(t: FourDEntryType) -> Self {
        match t {
            FourDEntryType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FourDEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One 4D bet line with its Big and Small stakes.
///
/// Ordinary, System and iBet lines use `number`; Roll lines use
/// `roll_pattern` (four characters, one of them `X`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourDBet {
    #[serde(default)]
    pub entry_type: FourDEntryType,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub roll_pattern: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub big_amount: f64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub small_amount: f64,
    /// Printed on some System/iBet slips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permutations: Option<u32>,
}

impl Default for FourDBet {
    /// A fresh line as added from the edit view: no number, $1 Big, $1 Small.
    fn default() -> Self {
        Self {
            entry_type: FourDEntryType::Ordinary,
            number: None,
            roll_pattern: None,
            big_amount: 1.0,
            small_amount: 1.0,
            permutations: None,
        }
    }
}

/// OCR spells these loosely ("System Roll", "SYSTEM_ROLL"); any spelling
/// [`FromStr`] accepts is accepted on the wire too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TotoBetType {
    #[default]
    Ordinary,
    System,
    SystemRoll,
}

impl TotoBetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotoBetType::Ordinary => "Ordinary",
            TotoBetType::System => "System",
            TotoBetType::SystemRoll => "SystemRoll",
        }
    }
}

impl fmt::Display for TotoBetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TotoBetType {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TotoBetType> for String {
    fn from(t: TotoBetType) -> Self {
        t.as_str().to_string()
    }
}

impl FromStr for TotoBetType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect();
        if t.eq_ignore_ascii_case("ordinary") {
            Ok(TotoBetType::Ordinary)
        } else if t.eq_ignore_ascii_case("system") {
            Ok(TotoBetType::System)
        } else if t.eq_ignore_ascii_case("systemroll") {
            Ok(TotoBetType::SystemRoll)
        } else {
            Err(CoreError::UnknownBetType(s.to_string()))
        }
    }
}

/// Fixed numbers plus an inclusive rolled range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemRoll {
    #[serde(default)]
    pub fixed_numbers: Vec<i32>,
    pub roll_from: i32,
    pub roll_to: i32,
}

/// One TOTO line on the slip.
///
/// `system_size` mirrors `numbers.len()`; the edit engine recomputes it on
/// every operation that touches `numbers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotoEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub bet_type: TotoBetType,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub numbers: Vec<i32>,
    #[serde(default)]
    pub system_size: Option<usize>,
    #[serde(default)]
    pub system_roll: Option<SystemRoll>,
}

impl TotoEntry {
    /// An Ordinary entry with the placeholder numbers 1 to 6.
    pub fn placeholder(label: String) -> Self {
        let numbers: Vec<i32> = (1..=MIN_TOTO_NUMBERS as i32).collect();
        Self {
            label: Some(label),
            bet_type: TotoBetType::Ordinary,
            system_size: Some(numbers.len()),
            numbers,
            system_roll: None,
        }
    }

    /// Recompute `system_size` from `numbers`. A System Roll entry without
    /// numbers carries no size at all.
    pub(crate) fn resync_system_size(&mut self) {
        self.system_size = if self.bet_type == TotoBetType::SystemRoll && self.numbers.is_empty() {
            None
        } else {
            Some(self.numbers.len())
        };
    }
}

/// The bet collection selected by a record's game type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveBets<'a> {
    FourD(&'a [FourDBet]),
    Toto(&'a [TotoEntry]),
}

impl ActiveBets<'_> {
    pub fn len(&self) -> usize {
        match self {
            ActiveBets::FourD(bets) => bets.len(),
            ActiveBets::Toto(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A lottery ticket as extracted by OCR or loaded from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "crate::boundary::TicketPayload", into = "crate::boundary::TicketPayload")]
pub struct TicketRecord {
    pub game_type: GameType,
    pub draw_date: NaiveDate,
    /// Entered by hand; never recomputed from the stakes.
    pub ticket_price: f64,
    pub(crate) fourd_bets: Vec<FourDBet>,
    pub(crate) toto_entries: Vec<TotoEntry>,
}

impl TicketRecord {
    pub fn fourd(draw_date: NaiveDate, ticket_price: f64, bets: Vec<FourDBet>) -> Self {
        Self {
            game_type: GameType::FourD,
            draw_date,
            ticket_price,
            fourd_bets: bets,
            toto_entries: Vec::new(),
        }
    }

    pub fn toto(draw_date: NaiveDate, ticket_price: f64, entries: Vec<TotoEntry>) -> Self {
        Self {
            game_type: GameType::Toto,
            draw_date,
            ticket_price,
            fourd_bets: Vec::new(),
            toto_entries: entries,
        }
    }

    /// 4D bet lines, whether or not 4D is the active game.
    pub fn fourd_bets(&self) -> &[FourDBet] {
        &self.fourd_bets
    }

    /// TOTO entries, whether or not TOTO is the active game.
    pub fn toto_entries(&self) -> &[TotoEntry] {
        &self.toto_entries
    }

    pub fn active(&self) -> ActiveBets<'_> {
        match self.game_type {
            GameType::FourD => ActiveBets::FourD(&self.fourd_bets),
            GameType::Toto => ActiveBets::Toto(&self.toto_entries),
        }
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<i32>>::deserialize(deserializer)?.unwrap_or_default())
}
