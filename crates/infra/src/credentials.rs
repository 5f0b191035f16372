use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use growthwatch_auth::credentials::normalize_username;
use growthwatch_auth::{CredentialError, CredentialStore, Principal};
use growthwatch_core::ManagerId;

use crate::password::{blocking, hash_password, verify_password};
use crate::store::{EntityStore, ManagerRepository};

#[derive(Debug, Clone)]
struct Login {
    manager_id: ManagerId,
    password_hash: String,
}

/// In-memory login table backed by Argon2 hashes.
///
/// Principals are loaded from the entity store after the password checks out,
/// so a deleted manager can no longer log in.
pub struct InMemoryCredentialStore {
    store: Arc<dyn EntityStore>,
    logins: RwLock<HashMap<String, Login>>,
}

impl InMemoryCredentialStore {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self {
            store,
            logins: RwLock::new(HashMap::new()),
        }
    }

    fn lookup(&self, username: &str) -> Result<Option<Login>, CredentialError> {
        let logins = self
            .logins
            .read()
            .map_err(|_| CredentialError::Backend("lock poisoned".to_string()))?;
        Ok(logins.get(&normalize_username(username)).cloned())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, CredentialError> {
        let Some(login) = self.lookup(username)? else {
            return Ok(None);
        };

        let password = password.to_string();
        let hash = login.password_hash.clone();
        if !blocking(move || verify_password(&password, &hash)).await? {
            return Ok(None);
        }

        let manager = self
            .store
            .get_manager(login.manager_id)
            .await
            .map_err(|e| CredentialError::Backend(e.to_string()))?;
        Ok(manager.map(Principal::from))
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        manager_id: ManagerId,
    ) -> Result<(), CredentialError> {
        let key = normalize_username(username);
        if self.lookup(&key)?.is_some() {
            return Err(CredentialError::UsernameTaken);
        }

        let password = password.to_string();
        let password_hash = blocking(move || hash_password(&password)).await?;

        let mut logins = self
            .logins
            .write()
            .map_err(|_| CredentialError::Backend("lock poisoned".to_string()))?;
        // Re-check under the write lock; another registration may have won.
        if logins.contains_key(&key) {
            return Err(CredentialError::UsernameTaken);
        }
        logins.insert(
            key,
            Login {
                manager_id,
                password_hash,
            },
        );
        Ok(())
    }

    async fn forget(&self, manager_id: ManagerId) -> Result<(), CredentialError> {
        let mut logins = self
            .logins
            .write()
            .map_err(|_| CredentialError::Backend("lock poisoned".to_string()))?;
        logins.retain(|_, login| login.manager_id != manager_id);
        Ok(())
    }
}
