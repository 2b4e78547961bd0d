#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Status { status: u16, message: String },

    /// The server accepted the request but refused it (`success: false`).
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("not signed in")]
    NotAuthenticated,

    #[error("session storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("configuration: {0}")]
    Config(#[from] envy::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Status { status: 404, .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
