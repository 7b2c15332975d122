//! Ticket model, edit engine, validation, and payload normalisation for slipcheck.

pub mod boundary;
pub mod derive;
pub mod edit;
mod error;
pub mod model;
pub mod notification;
pub mod session;
pub mod validate;

pub use boundary::{NewTicket, StoredTicket, TicketPayload, TicketStatus};
pub use derive::derive_bet_type;
pub use edit::{EditOp, FourDField, TicketField, apply};
pub use error::CoreError;
pub use model::{
    ActiveBets, FourDBet, FourDEntryType, GameType, SystemRoll, TicketRecord, TotoBetType,
    TotoEntry,
};
pub use notification::{Notification, NotificationFilter, NotificationKind};
pub use session::{SessionError, SessionState, TicketCollaborator, TicketView};
pub use validate::{ValidationReport, Violation, validate};
