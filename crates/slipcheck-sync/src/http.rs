//! HTTP client for the slipcheck backend: ticket upload and history, notifications.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;
use slipcheck_core::{CoreError, NewTicket, Notification, StoredTicket, TicketRecord};
use thiserror::Error;
use tracing::{debug, info};

use crate::SessionProvider;

/// Image types the OCR endpoint accepts.
pub const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/webp", "image/bmp"];
/// Largest image the OCR endpoint accepts.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ticket payload rejected: {0}")]
    Decode(#[from] CoreError),
    #[error("not signed in")]
    Unauthenticated,
    #[error("unsupported image type {0}; expected PNG, JPEG, WEBP or BMP")]
    UnsupportedMedia(String),
    #[error("image is {size} bytes, limit is {max}")]
    TooLarge { size: usize, max: usize },
    #[error("background task failed: {0}")]
    Task(String),
}

/// Client for the backend's `/tickets` and `/notifications` endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

#[derive(Deserialize)]
struct TicketList {
    #[serde(default)]
    tickets: Vec<StoredTicket>,
}

#[derive(Deserialize)]
struct NotificationList {
    #[serde(default)]
    notifications: Vec<Notification>,
}

impl ApiClient {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `http://localhost:8000/api`; a trailing
    /// slash is dropped.
    pub fn new(base_url: String, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn bearer(&self) -> Result<String, SyncError> {
        self.session
            .access_token()
            .map(|token| format!("Bearer {token}"))
            .ok_or(SyncError::Unauthenticated)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Send an image for OCR and decode the extracted ticket.
    ///
    /// Type and size are checked locally before anything is sent.
    pub async fn upload_ticket(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        mime: &str,
    ) -> Result<TicketRecord, SyncError> {
        if !ALLOWED_MIME.contains(&mime) {
            return Err(SyncError::UnsupportedMedia(mime.to_string()));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(SyncError::TooLarge {
                size: bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        let auth = self.bearer()?;

        let url = self.url("tickets/upload");
        info!(url = %url, size = bytes.len(), mime, "uploading ticket image");
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        let body: Value = Self::check(resp).await?.json().await?;

        let record = TicketRecord::from_upload_value(body)?;
        info!(game_type = %record.game_type, draw_date = %record.draw_date, "ticket extracted");
        Ok(record)
    }

    /// Ticket history for the signed-in user, newest first.
    pub async fn list_tickets(&self) -> Result<Vec<StoredTicket>, SyncError> {
        let url = self.url("tickets/");
        info!(url = %url, "fetching ticket history");
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        let list: TicketList = Self::check(resp).await?.json().await?;
        info!(count = list.tickets.len(), "fetched ticket history");
        Ok(list.tickets)
    }

    /// Persist a confirmed ticket.
    pub async fn save_ticket(&self, record: &TicketRecord) -> Result<(), SyncError> {
        let url = self.url("tickets/");
        let payload = NewTicket::from(record);
        info!(url = %url, game_type = %payload.game_type, "saving ticket");
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .json(&payload)
            .send()
            .await?;
        Self::check(resp).await?;
        info!("ticket saved");
        Ok(())
    }

    /// Replace the stored details of an existing ticket.
    pub async fn update_ticket(&self, id: &str, record: &TicketRecord) -> Result<(), SyncError> {
        let url = self.url(&format!("tickets/{id}"));
        info!(url = %url, "updating ticket");
        let resp = self
            .client
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .json(&NewTicket::from(record))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn delete_ticket(&self, id: &str) -> Result<(), SyncError> {
        let url = self.url(&format!("tickets/{id}"));
        info!(url = %url, "deleting ticket");
        let resp = self
            .client
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn list_notifications(&self) -> Result<Vec<Notification>, SyncError> {
        let url = self.url("notifications");
        debug!(url = %url, "fetching notifications");
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        let list: NotificationList = Self::check(resp).await?.json().await?;
        info!(count = list.notifications.len(), "fetched notifications");
        Ok(list.notifications)
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), SyncError> {
        self.patch(&format!("notifications/{id}/read")).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), SyncError> {
        self.patch("notifications/mark-all-read").await
    }

    pub async fn delete_notification(&self, id: &str) -> Result<(), SyncError> {
        let url = self.url(&format!("notifications/{id}"));
        info!(url = %url, "deleting notification");
        let resp = self
            .client
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn patch(&self, path: &str) -> Result<(), SyncError> {
        let url = self.url(path);
        info!(url = %url, "patching");
        let resp = self
            .client
            .patch(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}
