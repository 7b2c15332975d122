//! Plugs [`ApiClient`] into the edit session as its persistence collaborator.
//!
//! Each callback spawns one request on the tokio runtime and returns at
//! once. There is no retry and no de-duplication: two confirms send two
//! requests. Callers that need to know the outcome (the CLI, before it
//! exits) can [`finish`](SpawningCollaborator::finish) the pending tasks.

use std::future::Future;
use std::sync::Arc;

use slipcheck_core::{TicketCollaborator, TicketRecord};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{ApiClient, SyncError};

pub struct SpawningCollaborator {
    client: Arc<ApiClient>,
    handle: Handle,
    /// Backend id when the ticket came from history; `None` for a fresh upload.
    ticket_id: Option<String>,
    pending: Vec<JoinHandle<Result<(), SyncError>>>,
}

impl SpawningCollaborator {
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<ApiClient>, ticket_id: Option<String>) -> Self {
        Self::with_handle(client, ticket_id, Handle::current())
    }

    pub fn with_handle(client: Arc<ApiClient>, ticket_id: Option<String>, handle: Handle) -> Self {
        Self {
            client,
            handle,
            ticket_id,
            pending: Vec::new(),
        }
    }

    /// Wait for every spawned request and collect their outcomes in issue order.
    pub async fn finish(&mut self) -> Vec<Result<(), SyncError>> {
        let mut results = Vec::with_capacity(self.pending.len());
        for handle in self.pending.drain(..) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(SyncError::Task(e.to_string())),
            };
            results.push(result);
        }
        results
    }

    fn spawn<F>(&mut self, action: &'static str, fut: F)
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        let task = self.handle.spawn(async move {
            let result = fut.await;
            if let Err(e) = &result {
                warn!(action, error = %e, "ticket request failed");
            }
            result
        });
        self.pending.push(task);
    }
}

impl TicketCollaborator for SpawningCollaborator {
    fn on_confirm(&mut self, record: &TicketRecord) {
        let client = Arc::clone(&self.client);
        let record = record.clone();
        self.spawn("save", async move { client.save_ticket(&record).await });
    }

    fn on_edit(&mut self, record: &TicketRecord) {
        let Some(id) = self.ticket_id.clone() else {
            debug!("ticket not stored yet, edit stays local until confirm");
            return;
        };
        let client = Arc::clone(&self.client);
        let record = record.clone();
        self.spawn("update", async move { client.update_ticket(&id, &record).await });
    }

    fn on_delete(&mut self, _record: &TicketRecord) {
        let Some(id) = self.ticket_id.clone() else {
            debug!("ticket not stored yet, nothing to delete");
            return;
        };
        let client = Arc::clone(&self.client);
        self.spawn("delete", async move { client.delete_ticket(&id).await });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StaticSession;
    use slipcheck_core::TicketView;

    fn signed_out_client() -> Arc<ApiClient> {
        Arc::new(ApiClient::new(
            "http://localhost:8000/api".into(),
            Arc::new(StaticSession::signed_out()),
        ))
    }

    fn record() -> TicketRecord {
        serde_json::from_value(serde_json::json!({
            "game_type": "4D",
            "draw_date": "2026-01-15",
            "ticket_price": 2.0,
            "fourd_bets": [{"entry_type": "Ordinary", "number": "1234", "big_amount": 1.0, "small_amount": 1.0}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn confirm_spawns_a_save() {
        let collaborator = SpawningCollaborator::new(signed_out_client(), None);
        let mut view = TicketView::new(record(), collaborator);
        view.confirm().unwrap();

        let (_, mut collaborator) = view.into_parts();
        let results = collaborator.finish().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(SyncError::Unauthenticated)));
    }

    #[tokio::test]
    async fn unsaved_ticket_edit_and_delete_stay_local() {
        let mut collaborator = SpawningCollaborator::new(signed_out_client(), None);
        collaborator.on_edit(&record());
        collaborator.on_delete(&record());
        assert!(collaborator.finish().await.is_empty());
    }

    #[tokio::test]
    async fn stored_ticket_edit_and_delete_send_requests() {
        let mut collaborator =
            SpawningCollaborator::new(signed_out_client(), Some("t-1".into()));
        let mut edited = record();
        edited.ticket_price = 3.0;
        collaborator.on_edit(&edited);
        collaborator.on_delete(&edited);
        let results = collaborator.finish().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r, Err(SyncError::Unauthenticated))));
    }
}
