use chrono::Utc;

use growthwatch_auth::{
    Action, CredentialError, Manager, Principal, Resource, Role, explain, validate_registration,
};
use growthwatch_core::ManagerId;
use growthwatch_infra::store::ManagerRepository;

use super::AppServices;
use crate::app::dto::{MeResponse, SessionResponse};
use crate::app::errors::ServiceError;

impl AppServices {
    /// Self-registration: always a plain manager without supervisor.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<SessionResponse, ServiceError> {
        validate_registration(username, password)?;
        let manager = Manager::register(ManagerId::new(), name)?;
        self.create_account(manager.clone(), username, password).await?;

        tracing::info!(manager_id = %manager.id, "manager registered");
        self.open_session(Principal::from(manager))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<SessionResponse, ServiceError> {
        match self.credentials.authenticate(username, password).await? {
            Some(principal) => {
                tracing::info!(manager_id = %principal.id, "login succeeded");
                self.open_session(principal)
            }
            None => {
                tracing::info!("login rejected");
                Err(ServiceError::Unauthenticated)
            }
        }
    }

    /// The principal plus the role-level decision for every resource/action.
    pub fn me(&self, principal: &Principal) -> MeResponse {
        let permissions = Resource::ALL
            .iter()
            .flat_map(|&resource| {
                Action::ALL
                    .iter()
                    .map(move |&action| explain(principal, resource, action, None))
            })
            .collect();
        MeResponse {
            principal: principal.clone(),
            permissions,
        }
    }

    /// Seed the boss account. An existing login with that username is left
    /// untouched.
    pub async fn bootstrap_boss(
        &self,
        username: &str,
        password: &str,
        name: &str,
    ) -> Result<(), ServiceError> {
        validate_registration(username, password)?;
        let boss = Manager::seeded(ManagerId::new(), name, Role::Boss)?;
        match self.create_account(boss.clone(), username, password).await {
            Ok(()) => {
                tracing::info!(manager_id = %boss.id, "bootstrap boss created");
                Ok(())
            }
            Err(ServiceError::Conflict(_)) => {
                tracing::info!("bootstrap boss already present");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Insert the manager, then its login; undo the insert if the login fails.
    async fn create_account(
        &self,
        manager: Manager,
        username: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        let id = manager.id;
        self.store.insert_manager(manager).await?;

        if let Err(e) = self.credentials.register(username, password, id).await {
            if let Err(undo) = self.store.delete_manager(id).await {
                tracing::error!(manager_id = %id, error = %undo, "failed to roll back manager insert");
            }
            return Err(match e {
                CredentialError::UsernameTaken => {
                    ServiceError::Conflict("username is already taken".to_string())
                }
                other => other.into(),
            });
        }
        Ok(())
    }

    fn open_session(&self, principal: Principal) -> Result<SessionResponse, ServiceError> {
        let token = self.codec.issue(principal.id, Utc::now())?;
        Ok(SessionResponse { token, principal })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use growthwatch_auth::Hs256SessionCodec;

    fn services() -> AppServices {
        AppServices::in_memory(Hs256SessionCodec::new(b"test", Duration::minutes(5)))
    }

    #[tokio::test]
    async fn register_then_login_resolves_same_principal() {
        let svc = services();
        let registered = svc.register("Amara", "long-password", "Amara O.").await.unwrap();
        assert_eq!(registered.principal.role, Role::Manager);
        assert_eq!(registered.principal.supervisor_id, None);

        let session = svc.login("amara", "long-password").await.unwrap();
        assert_eq!(session.principal.id, registered.principal.id);

        let resolved = svc.sessions().resolve_principal(&session.token).await.unwrap();
        assert_eq!(resolved.map(|p| p.id), Some(registered.principal.id));
    }

    #[tokio::test]
    async fn duplicate_username_conflicts_and_leaves_no_orphan() {
        let svc = services();
        svc.register("dup", "long-password", "First").await.unwrap();
        let err = svc.register("DUP", "long-password", "Second").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let everyone = svc
            .store
            .list_managers(&growthwatch_auth::Scope::All)
            .await
            .unwrap();
        assert_eq!(everyone.len(), 1);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthenticated() {
        let svc = services();
        svc.register("kofi", "long-password", "Kofi").await.unwrap();
        assert!(matches!(
            svc.login("kofi", "wrong-password").await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            svc.login("nobody", "long-password").await,
            Err(ServiceError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let svc = services();
        assert!(matches!(
            svc.register("kofi", "short", "Kofi").await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let svc = services();
        svc.bootstrap_boss("chief", "long-password", "Chief").await.unwrap();
        svc.bootstrap_boss("chief", "long-password", "Chief").await.unwrap();

        let boss = svc.login("chief", "long-password").await.unwrap().principal;
        assert!(boss.is_boss());

        let bosses = svc
            .store
            .list_managers(&growthwatch_auth::Scope::All)
            .await
            .unwrap();
        assert_eq!(bosses.len(), 1);
    }

    #[tokio::test]
    async fn me_lists_role_level_permissions() {
        let svc = services();
        let boss = Principal {
            id: ManagerId::new(),
            name: "Chief".into(),
            role: Role::Boss,
            supervisor_id: None,
        };
        let me = svc.me(&boss);
        assert_eq!(me.permissions.len(), Resource::ALL.len() * Action::ALL.len());
        let family_create = me
            .permissions
            .iter()
            .find(|p| p.resource == Resource::Family && p.action == Action::Create)
            .unwrap();
        assert!(!family_create.granted);
    }
}
