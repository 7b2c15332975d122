use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown game type: {0}")]
    UnknownGameType(String),

    #[error("unknown TOTO bet type: {0}")]
    UnknownBetType(String),

    #[error("stored ticket {0} has no details payload")]
    MissingDetails(String),

    #[error("upload response reported {status}: {message}")]
    UploadRejected { status: String, message: String },
}
