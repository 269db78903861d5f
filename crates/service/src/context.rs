//! Per-call context: who is acting, which language they read in, and the
//! cancellation signal shared with the caller.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Debug, Clone)]
pub struct Context {
    actor_id: u64,
    request_id: Uuid,
    language: Option<String>,
    cancel: CancellationToken,
}

impl Context {
    pub fn new(actor_id: u64) -> Self {
        Self { actor_id, request_id: Uuid::new_v4(), language: None, cancel: CancellationToken::new() }
    }

    /// Context for system-initiated work (actor 0).
    pub fn system() -> Self { Self::new(0) }

    /// Takes the primary tag of an `Accept-Language` style value, e.g. `de-DE,de;q=0.9` -> `de-DE`.
    pub fn with_accept_language(mut self, header: &str) -> Self {
        let tag = header
            .split(',')
            .next()
            .and_then(|first| first.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        self.language = if tag.is_empty() || tag == "*" { None } else { Some(tag.to_string()) };
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn actor_id(&self) -> u64 { self.actor_id }
    pub fn request_id(&self) -> Uuid { self.request_id }
    pub fn language(&self) -> Option<&str> { self.language.as_deref() }
    pub fn cancellation(&self) -> &CancellationToken { &self.cancel }

    /// Fails with [`ServiceError::Cancelled`] once the caller gave up.
    pub fn check(&self) -> Result<(), ServiceError> {
        if self.cancel.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        Ok(())
    }
}
