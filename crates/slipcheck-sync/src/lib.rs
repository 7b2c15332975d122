//! Sync layer: backend HTTP client, injected session provider, and the
//! persistence collaborator used by the ticket edit session.

mod session;
pub use session::{SessionProvider, StaticSession};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
mod collaborator;

#[cfg(feature = "http")]
pub use collaborator::SpawningCollaborator;
#[cfg(feature = "http")]
pub use http::{ApiClient, SyncError};
