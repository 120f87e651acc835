use thiserror::Error;

#[derive(Debug, Error)]
pub enum SereboError {
    // ── Insertion protocol ───────────────────────────────────────────────────
    #[error("duplicate record: datalog already holds (dtstamp, hash) for {dtstamp}")]
    DuplicateRecord { dtstamp: String },

    // ── Store ────────────────────────────────────────────────────────────────
    #[error("store I/O error: {0}")]
    StoreIo(String),

    #[error("store is malformed: {0}")]
    Corruption(String),

    // ── Notary ───────────────────────────────────────────────────────────────
    #[error("black box {blackbox_id} is already registered with this notary")]
    AlreadyRegistered { blackbox_id: String },

    #[error("black box is not registered with the notary at {url}")]
    NotRegistered { url: String },

    #[error("notary at {url} unavailable: {detail}")]
    RemoteUnavailable { url: String, detail: String },

    // ── Queries ──────────────────────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),
}

impl SereboError {
    /// Wrap a transport-level failure against a notary endpoint.
    pub fn remote(url: &str, detail: impl ToString) -> Self {
        SereboError::RemoteUnavailable {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }
}
