use axum::extract::{Extension, FromRequestParts};

use crate::DB;

/// Everything a handler needs besides its own arguments.
///
/// Ownership is taken from the request path or body; there is no session to resolve here.
#[derive(Clone, FromRequestParts)]
pub struct BaseParams {
    #[from_request(via(Extension))]
    pub db: DB,
}

impl BaseParams {
    pub fn new(db: DB) -> Self {
        Self { db }
    }
}
