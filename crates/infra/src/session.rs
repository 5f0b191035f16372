use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use growthwatch_auth::{Principal, SessionError, SessionStore, SessionValidator};

use crate::store::{EntityStore, ManagerRepository};

/// Resolves bearer tokens against the entity store.
///
/// The token only carries the manager id; role and supervisor are read from
/// the store on every call so edits take effect on the next request.
#[derive(Clone)]
pub struct StoreSessionStore {
    codec: Arc<dyn SessionValidator>,
    store: Arc<dyn EntityStore>,
}

impl StoreSessionStore {
    pub fn new(codec: Arc<dyn SessionValidator>, store: Arc<dyn EntityStore>) -> Self {
        Self { codec, store }
    }
}

#[async_trait]
impl SessionStore for StoreSessionStore {
    async fn resolve_principal(&self, token: &str) -> Result<Option<Principal>, SessionError> {
        let claims = match self.codec.validate(token, Utc::now()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                return Ok(None);
            }
        };

        let manager = self
            .store
            .get_manager(claims.sub)
            .await
            .map_err(|e| SessionError::Lookup(e.to_string()))?;

        if manager.is_none() {
            tracing::debug!(manager_id = %claims.sub, "session names a deleted manager");
        }
        Ok(manager.map(Principal::from))
    }
}
