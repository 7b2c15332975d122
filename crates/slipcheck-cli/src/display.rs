//! Vertical card display for tickets, history rows, and notifications.

use std::fmt::Write;

use chrono::NaiveDate;
use slipcheck_core::derive::{
    display_label, display_number, entry_label, fourd_stake_total, system_combinations,
};
use slipcheck_core::{
    ActiveBets, FourDBet, GameType, Notification, NotificationKind, StoredTicket, TicketRecord,
    TicketStatus, TotoBetType, TotoEntry, ValidationReport, derive_bet_type,
};

// ── Public API ──

/// Print a ticket as a card, followed by any validation findings.
pub fn print_ticket_card(record: &TicketRecord, report: &ValidationReport) {
    print!("{}", render_ticket_card(record, report));
}

pub fn print_history(rows: &[StoredTicket]) {
    print!("{}", render_history(rows));
}

pub fn print_notifications(notifications: &[&Notification], unread: usize) {
    print!("{}", render_notifications(notifications, unread));
}

// ── Ticket card ──

pub fn render_ticket_card(record: &TicketRecord, report: &ValidationReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== {} ticket ===", record.game_type);
    let _ = writeln!(out, "  {:<14} {}", "Draw date", long_date(record.draw_date));
    if record.game_type == GameType::FourD {
        let _ = writeln!(
            out,
            "  {:<14} {}",
            "Bet type",
            derive_bet_type(record).to_uppercase()
        );
    }
    out.push('\n');

    match record.active() {
        ActiveBets::FourD(bets) => render_fourd(&mut out, bets),
        ActiveBets::Toto(entries) => render_toto(&mut out, entries),
    }

    // Only shown when set, like the slip itself.
    if record.ticket_price > 0.0 {
        out.push('\n');
        let _ = writeln!(out, "  {:<14} {}", "Total price", money(record.ticket_price));
        if record.game_type == GameType::FourD {
            let stakes = fourd_stake_total(record);
            if (stakes - record.ticket_price).abs() > 0.005 {
                let _ = writeln!(out, "  {:<14} {} (not the entered price)", "Stakes", money(stakes));
            }
        }
    }

    if !report.is_valid() {
        out.push('\n');
        out.push_str("Problems\n");
        for v in &report.violations {
            let _ = writeln!(out, "  - {v}");
        }
    }
    out
}

fn render_fourd(out: &mut String, bets: &[FourDBet]) {
    out.push_str("4D Entries\n");
    if bets.is_empty() {
        out.push_str("  No entries found\n");
        return;
    }
    for (i, bet) in bets.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:<3} {:<6} {:<10} BIG {:>8}  SML {:>8}",
            entry_label(i),
            display_number(bet),
            bet.entry_type.as_str().to_uppercase(),
            money(bet.big_amount),
            money(bet.small_amount),
        );
    }
}

fn render_toto(out: &mut String, entries: &[TotoEntry]) {
    out.push_str("TOTO Entries\n");
    if entries.is_empty() {
        out.push_str("  No entries found\n");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let mut heading = entry.bet_type.as_str().to_uppercase();
        if entry.bet_type == TotoBetType::System
            && let Some(size) = entry.system_size
        {
            let _ = write!(
                heading,
                " (System {size}, {} lines)",
                system_combinations(size)
            );
        }
        let _ = writeln!(out, "  {:<3} {}", display_label(entry, i), heading);

        if !entry.numbers.is_empty() {
            let _ = writeln!(out, "      {}", join_numbers(&entry.numbers));
        }
        if entry.bet_type == TotoBetType::SystemRoll
            && let Some(roll) = &entry.system_roll
        {
            let _ = writeln!(out, "      Fixed numbers: {}", join_numbers(&roll.fixed_numbers));
            let _ = writeln!(out, "      Roll range:    {} - {}", roll.roll_from, roll.roll_to);
        }
    }
}

// ── History ──

pub fn render_history(rows: &[StoredTicket]) -> String {
    if rows.is_empty() {
        return "No tickets yet. Upload your first ticket to get started.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<38} {:<5} {:<11} {:>9} {:<8} {}",
        "ID", "GAME", "DRAW", "PRICE", "STATUS", "BET TYPE"
    );
    for row in rows {
        let (game, draw, bet_type) = match row.record() {
            Ok(record) => (
                record.game_type.to_string(),
                record.draw_date.to_string(),
                derive_bet_type(&record),
            ),
            Err(e) => (
                row.game_type.map(|g| g.to_string()).unwrap_or_default(),
                row.draw_date.map(|d| d.to_string()).unwrap_or_default(),
                format!("<{e}>"),
            ),
        };
        let _ = writeln!(
            out,
            "{:<38} {:<5} {:<11} {:>9} {:<8} {}",
            row.id,
            game,
            draw,
            row.ticket_price.map(money).unwrap_or_default(),
            row.status,
            bet_type,
        );
    }
    let pending = rows
        .iter()
        .filter(|r| r.status == TicketStatus::Pending)
        .count();
    let wins = rows
        .iter()
        .filter(|r| r.status == TicketStatus::Win)
        .count();
    let _ = writeln!(out, "\n{} tickets, {pending} pending, {wins} wins", rows.len());
    out
}

// ── Notifications ──

pub fn render_notifications(notifications: &[&Notification], unread: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Notifications ({unread} unread)");
    if notifications.is_empty() {
        out.push_str("  Nothing here.\n");
        return out;
    }
    for n in notifications {
        let marker = if n.is_read { " " } else { "*" };
        let kind = match &n.kind {
            NotificationKind::Win => "WIN",
            NotificationKind::Loss => "LOSS",
            NotificationKind::DrawAnnouncement => "DRAW",
            NotificationKind::General => "INFO",
            NotificationKind::Other(s) => s.as_str(),
        };
        let _ = writeln!(out, "{marker} [{}] {:<5} {}", n.id, kind, n.title);
        if !n.message.is_empty() {
            let _ = writeln!(out, "      {}", n.message);
        }
        if let Some(prize) = n.data_str("prize_amount") {
            let _ = writeln!(out, "      Prize: ${prize}");
        }
        if let Some(created) = &n.created_at {
            let _ = writeln!(out, "      {created}");
        }
    }
    out
}

// ── Formatting helpers ──

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

fn long_date(date: NaiveDate) -> String {
    date.format("%A, %-d %B %Y").to_string()
}

fn join_numbers(numbers: &[i32]) -> String {
    numbers
        .iter()
        .map(|n| format!("{n:>2}"))
        .collect::<Vec<_>>()
        .join(" ")
}
