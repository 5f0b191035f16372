//! Resource operation handlers.
//!
//! Every operation takes the request principal explicitly, resolves its target
//! (404), asks the authorization engine, and only then touches the store.
//! Nothing is cached between calls.

use std::sync::Arc;

use growthwatch_auth::{
    Action, AuthzError, CredentialStore, Hs256SessionCodec, Owner, Principal, Resource,
    SessionStore, authorize,
};
use growthwatch_infra::{EntityStore, HierarchyResolver, StoreSessionStore};

use crate::app::errors::ServiceError;
use crate::config::Config;

mod auth;
mod children;
mod families;
mod growth_records;
mod managers;

#[cfg(test)]
mod scenarios;

#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn EntityStore>,
    hierarchy: HierarchyResolver,
    credentials: Arc<dyn CredentialStore>,
    codec: Arc<Hs256SessionCodec>,
    sessions: Arc<dyn SessionStore>,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn EntityStore>,
        credentials: Arc<dyn CredentialStore>,
        codec: Arc<Hs256SessionCodec>,
    ) -> Self {
        let sessions = Arc::new(StoreSessionStore::new(codec.clone(), store.clone()));
        Self {
            hierarchy: HierarchyResolver::new(store.clone()),
            store,
            credentials,
            codec,
            sessions,
        }
    }

    /// In-memory wiring for dev and tests.
    pub fn in_memory(codec: Hs256SessionCodec) -> Self {
        let store: Arc<dyn EntityStore> = Arc::new(growthwatch_infra::InMemoryEntityStore::new());
        let credentials = Arc::new(growthwatch_infra::InMemoryCredentialStore::new(store.clone()));
        Self::new(store, credentials, Arc::new(codec))
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }
}

/// Wire services from configuration and seed the bootstrap boss.
pub async fn build_services(config: &Config) -> Result<AppServices, ServiceError> {
    let codec = Hs256SessionCodec::new(config.session_secret(), config.session_ttl());

    #[cfg(feature = "postgres")]
    let services = {
        let store = growthwatch_infra::PostgresEntityStore::connect(&config.database_url).await?;
        store.migrate().await?;
        let credentials = Arc::new(growthwatch_infra::PostgresCredentialStore::new(store.clone()));
        AppServices::new(Arc::new(store), credentials, Arc::new(codec))
    };

    #[cfg(not(feature = "postgres"))]
    let services = AppServices::in_memory(codec);

    if let Some(boss) = config.bootstrap_boss() {
        services
            .bootstrap_boss(&boss.username, &boss.password, &boss.name)
            .await?;
    }

    Ok(services)
}

/// Log an authorization outcome and convert a denial.
pub(crate) fn enforce<T>(
    principal: &Principal,
    resource: Resource,
    action: Action,
    decision: Result<T, AuthzError>,
) -> Result<T, ServiceError> {
    match decision {
        Ok(granted) => {
            tracing::debug!(
                principal_id = %principal.id,
                role = %principal.role,
                %resource,
                %action,
                "access granted"
            );
            Ok(granted)
        }
        Err(e) => {
            tracing::info!(
                principal_id = %principal.id,
                role = %principal.role,
                %resource,
                %action,
                reason = %e,
                "access denied"
            );
            Err(e.into())
        }
    }
}

/// [`authorize`] for families, children and growth records, logged.
pub(crate) fn guard(
    principal: &Principal,
    resource: Resource,
    action: Action,
    owner: Option<&Owner>,
) -> Result<(), ServiceError> {
    enforce(
        principal,
        resource,
        action,
        authorize(principal, resource, action, owner),
    )
}
