//! Viewing/editing state machine for one ticket.
//!
//! ```text
//! Viewing --begin_edit--> Editing        draft = committed.clone()
//! Editing --cancel------> Viewing        draft dropped
//! Editing --save--------> Viewing        committed = draft, on_edit(committed)
//! Viewing --confirm-----> Closed         on_confirm(committed)
//! Viewing --delete------> Closed         on_delete(committed)
//! ```
//!
//! Edits only ever touch the draft. The committed record changes on `save`
//! and nowhere else.

use thiserror::Error;
use tracing::{debug, info};

use crate::derive::derive_bet_type;
use crate::edit::{EditOp, apply};
use crate::model::TicketRecord;
use crate::validate::{ValidationReport, validate};

/// Persistence side of the view. Calls are fire-and-forget: the view does
/// not wait for, or learn about, the outcome.
pub trait TicketCollaborator {
    fn on_confirm(&mut self, record: &TicketRecord);

    fn on_edit(&mut self, _record: &TicketRecord) {}

    fn on_delete(&mut self, _record: &TicketRecord) {}
}

impl<T: TicketCollaborator + ?Sized> TicketCollaborator for &mut T {
    fn on_confirm(&mut self, record: &TicketRecord) {
        (**self).on_confirm(record);
    }

    fn on_edit(&mut self, record: &TicketRecord) {
        (**self).on_edit(record);
    }

    fn on_delete(&mut self, record: &TicketRecord) {
        (**self).on_delete(record);
    }
}

impl<T: TicketCollaborator + ?Sized> TicketCollaborator for Box<T> {
    fn on_confirm(&mut self, record: &TicketRecord) {
        (**self).on_confirm(record);
    }

    fn on_edit(&mut self, record: &TicketRecord) {
        (**self).on_edit(record);
    }

    fn on_delete(&mut self, record: &TicketRecord) {
        (**self).on_delete(record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Viewing,
    Editing,
    Closed,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("ticket failed validation: {0}")]
    Invalid(ValidationReport),
}

pub struct TicketView<C> {
    committed: TicketRecord,
    draft: Option<TicketRecord>,
    closed: bool,
    collaborator: C,
}

impl<C: TicketCollaborator> TicketView<C> {
    pub fn new(record: TicketRecord, collaborator: C) -> Self {
        Self {
            committed: record,
            draft: None,
            closed: false,
            collaborator,
        }
    }

    pub fn state(&self) -> SessionState {
        match (self.closed, &self.draft) {
            (true, _) => SessionState::Closed,
            (false, Some(_)) => SessionState::Editing,
            (false, None) => SessionState::Viewing,
        }
    }

    pub fn committed(&self) -> &TicketRecord {
        &self.committed
    }

    pub fn draft(&self) -> Option<&TicketRecord> {
        self.draft.as_ref()
    }

    /// The record on screen: the draft while editing, else the committed one.
    pub fn current(&self) -> &TicketRecord {
        self.draft.as_ref().unwrap_or(&self.committed)
    }

    pub fn bet_type(&self) -> String {
        derive_bet_type(self.current())
    }

    pub fn validate(&self) -> ValidationReport {
        validate(self.current())
    }

    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    pub fn into_parts(self) -> (TicketRecord, C) {
        (self.committed, self.collaborator)
    }

    pub fn begin_edit(&mut self) -> Result<(), SessionError> {
        self.expect_state("edit", SessionState::Viewing)?;
        self.draft = Some(self.committed.clone());
        info!(game_type = %self.committed.game_type, "editing ticket");
        Ok(())
    }

    /// Apply one edit to the draft. Returns whether the draft changed.
    pub fn apply(&mut self, op: &EditOp) -> Result<bool, SessionError> {
        let state = self.state();
        let Some(draft) = self.draft.as_mut() else {
            return Err(SessionError::InvalidTransition {
                action: "apply an edit",
                state,
            });
        };
        let next = apply(draft, op);
        let changed = next != *draft;
        if changed {
            *draft = next;
        } else {
            debug!(?op, "edit left the draft unchanged");
        }
        Ok(changed)
    }

    pub fn cancel(&mut self) -> Result<(), SessionError> {
        self.expect_state("cancel", SessionState::Editing)?;
        self.draft = None;
        info!("discarded ticket edits");
        Ok(())
    }

    pub fn save(&mut self) -> Result<(), SessionError> {
        self.expect_state("save", SessionState::Editing)?;
        if let Some(draft) = self.draft.take() {
            self.committed = draft;
        }
        info!(game_type = %self.committed.game_type, "saved ticket edits");
        self.collaborator.on_edit(&self.committed);
        Ok(())
    }

    pub fn confirm(&mut self) -> Result<(), SessionError> {
        self.expect_state("confirm", SessionState::Viewing)?;
        self.closed = true;
        info!(game_type = %self.committed.game_type, "confirmed ticket");
        self.collaborator.on_confirm(&self.committed);
        Ok(())
    }

    /// Confirm only if the committed record has no violations.
    pub fn confirm_checked(&mut self) -> Result<(), SessionError> {
        self.expect_state("confirm", SessionState::Viewing)?;
        let report = validate(&self.committed);
        if !report.is_valid() {
            info!(violations = report.violations.len(), "confirmation blocked");
            return Err(SessionError::Invalid(report));
        }
        self.confirm()
    }

    pub fn delete(&mut self) -> Result<(), SessionError> {
        self.expect_state("delete", SessionState::Viewing)?;
        self.closed = true;
        info!(game_type = %self.committed.game_type, "deleting ticket");
        self.collaborator.on_delete(&self.committed);
        Ok(())
    }

    fn expect_state(&self, action: &'static str, wanted: SessionState) -> Result<(), SessionError> {
        let state = self.state();
        if state == wanted {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition { action, state })
        }
    }
}
