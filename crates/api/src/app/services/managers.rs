use growthwatch_auth::{
    Action, HierarchyFacts, Manager, ManagerChanges, Principal, Resource, Role,
    authorize_manager_delete,
    authorize_manager_read, authorize_subordinate_listing, filter_manager_changes,
};
use growthwatch_core::ManagerId;
use growthwatch_infra::store::{FamilyRepository, ManagerRepository};

use super::{AppServices, enforce};
use crate::app::errors::ServiceError;

impl AppServices {
    async fn load_manager(&self, id: ManagerId) -> Result<Manager, ServiceError> {
        self.store
            .get_manager(id)
            .await?
            .ok_or(ServiceError::NotFound("manager"))
    }

    /// Boss: everyone. Supervisor: self and direct subordinates. Manager: self.
    pub async fn list_managers(&self, principal: &Principal) -> Result<Vec<Manager>, ServiceError> {
        let scope = self.hierarchy.staff_scope(principal).await?;
        Ok(self.store.list_managers(&scope).await?)
    }

    pub async fn get_manager(
        &self,
        principal: &Principal,
        id: ManagerId,
    ) -> Result<Manager, ServiceError> {
        let target = self.load_manager(id).await?;
        enforce(
            principal,
            Resource::Manager,
            Action::Read,
            authorize_manager_read(principal, &target),
        )?;
        Ok(target)
    }

    /// Direct subordinates of `supervisor_id`; unknown ids give an empty list.
    pub async fn list_subordinates(
        &self,
        principal: &Principal,
        supervisor_id: ManagerId,
    ) -> Result<Vec<Manager>, ServiceError> {
        enforce(
            principal,
            Resource::Manager,
            Action::List,
            authorize_subordinate_listing(principal, supervisor_id),
        )?;
        Ok(self.hierarchy.subordinates_of(supervisor_id).await?)
    }

    /// Apply a manager edit.
    ///
    /// Non-boss callers may only rename themselves; any role or supervisor in
    /// their request is dropped and the rest applies.
    pub async fn update_manager(
        &self,
        principal: &Principal,
        id: ManagerId,
        changes: ManagerChanges,
    ) -> Result<Manager, ServiceError> {
        let target = self.load_manager(id).await?;
        let filtered = enforce(
            principal,
            Resource::Manager,
            Action::Update,
            filter_manager_changes(principal, &target, changes),
        )?;

        if !filtered.dropped.is_empty() {
            tracing::warn!(
                principal_id = %principal.id,
                target_id = %target.id,
                dropped = ?filtered.dropped,
                "ignored manager fields the caller may not change"
            );
        }

        let changes = filtered.changes;
        if changes.is_empty() {
            return Ok(target);
        }

        // The store re-checks these under its own lock; reading them here
        // gives the precise error for the common uncontended case.
        let new_supervisor = match changes.supervisor_id {
            Some(Some(supervisor_id)) => self.store.get_manager(supervisor_id).await?,
            _ => None,
        };
        let has_subordinates = target.role == Role::Supervisor
            && !self.hierarchy.subordinates_of(target.id).await?.is_empty();
        let owns_families = changes.role == Some(Role::Boss)
            && self.store.count_families_owned_by(target.id).await? > 0;

        let next = target.with_changes(
            changes,
            HierarchyFacts {
                new_supervisor: new_supervisor.as_ref(),
                has_subordinates,
                owns_families,
            },
        )?;
        if next != target {
            self.store.update_manager(next.clone()).await?;
            tracing::info!(
                principal_id = %principal.id,
                manager_id = %next.id,
                role = %next.role,
                "manager updated"
            );
        }
        Ok(next)
    }

    /// Boss only, never self, and only while the target owns no families.
    /// Subordinates lose their supervisor; the login is removed.
    pub async fn delete_manager(&self, principal: &Principal, id: ManagerId) -> Result<(), ServiceError> {
        let target = self.load_manager(id).await?;
        enforce(
            principal,
            Resource::Manager,
            Action::Delete,
            authorize_manager_delete(principal, &target),
        )?;

        let owned = self.store.count_families_owned_by(target.id).await?;
        if owned > 0 {
            return Err(ServiceError::Conflict(format!(
                "manager still owns {owned} families; reassign or delete them first"
            )));
        }

        self.store.delete_manager(target.id).await?;
        self.credentials.forget(target.id).await?;
        tracing::info!(principal_id = %principal.id, manager_id = %target.id, "manager deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::scenarios::Org;

    #[tokio::test]
    async fn staff_visibility_by_role() {
        let org = Org::build().await;

        let all = org.svc.list_managers(&org.boss).await.unwrap();
        assert_eq!(all.len(), 7);

        let mut seen: Vec<ManagerId> = org
            .svc
            .list_managers(&org.s1)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        seen.sort();
        let mut expected = vec![org.s1.id, org.m1.id, org.m2.id];
        expected.sort();
        assert_eq!(seen, expected);

        let own = org.svc.list_managers(&org.m1).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, org.m1.id);
    }

    #[tokio::test]
    async fn reading_other_staff() {
        let org = Org::build().await;
        assert!(org.svc.get_manager(&org.boss, org.m3.id).await.is_ok());
        assert!(org.svc.get_manager(&org.s1, org.m1.id).await.is_ok());
        assert!(matches!(
            org.svc.get_manager(&org.s1, org.m3.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.get_manager(&org.m1, org.m2.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.get_manager(&org.boss, ManagerId::new()).await,
            Err(ServiceError::NotFound("manager"))
        ));
    }

    #[tokio::test]
    async fn subordinate_listing_rules() {
        let org = Org::build().await;
        assert_eq!(org.svc.list_subordinates(&org.boss, org.s2.id).await.unwrap().len(), 2);
        assert_eq!(org.svc.list_subordinates(&org.s1, org.s1.id).await.unwrap().len(), 2);
        assert!(
            org.svc
                .list_subordinates(&org.boss, ManagerId::new())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(matches!(
            org.svc.list_subordinates(&org.s1, org.s2.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.list_subordinates(&org.m1, org.s1.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn manager_self_edit_drops_hierarchy_fields() {
        let org = Org::build().await;
        let updated = org
            .svc
            .update_manager(
                &org.m1,
                org.m1.id,
                ManagerChanges {
                    name: Some("Renamed".into()),
                    role: Some(Role::Boss),
                    supervisor_id: Some(None),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.role, Role::Manager);
        assert_eq!(updated.supervisor_id, Some(org.s1.id));
    }

    #[tokio::test]
    async fn editing_someone_else_needs_boss() {
        let org = Org::build().await;
        let rename = ManagerChanges {
            name: Some("X".into()),
            ..Default::default()
        };
        assert!(matches!(
            org.svc.update_manager(&org.s1, org.m1.id, rename.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.update_manager(&org.m1, org.m2.id, rename).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn boss_moves_manager_between_supervisors() {
        let org = Org::build().await;
        let moved = org
            .svc
            .update_manager(
                &org.boss,
                org.m1.id,
                ManagerChanges {
                    supervisor_id: Some(Some(org.s2.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.supervisor_id, Some(org.s2.id));
        assert_eq!(org.svc.list_subordinates(&org.s2, org.s2.id).await.unwrap().len(), 3);

        // Now outside S1's reach.
        assert!(matches!(
            org.svc.list_families_of_manager(&org.s1, org.m1.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn hierarchy_integrity_on_boss_edits() {
        let org = Org::build().await;

        let demote = ManagerChanges {
            role: Some(Role::Manager),
            ..Default::default()
        };
        assert!(matches!(
            org.svc.update_manager(&org.boss, org.s1.id, demote).await,
            Err(ServiceError::Conflict(_))
        ));

        let under_manager = ManagerChanges {
            supervisor_id: Some(Some(org.m2.id)),
            ..Default::default()
        };
        assert!(matches!(
            org.svc.update_manager(&org.boss, org.m1.id, under_manager).await,
            Err(ServiceError::Validation(_))
        ));

        let dangling = ManagerChanges {
            supervisor_id: Some(Some(ManagerId::new())),
            ..Default::default()
        };
        assert!(matches!(
            org.svc.update_manager(&org.boss, org.m1.id, dangling).await,
            Err(ServiceError::NotFound("supervisor"))
        ));

        let promoted = org
            .svc
            .update_manager(
                &org.boss,
                org.m3.id,
                ManagerChanges {
                    role: Some(Role::Supervisor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Supervisor);
        assert_eq!(promoted.supervisor_id, None);
    }

    #[tokio::test]
    async fn family_owner_cannot_be_promoted_to_boss() {
        let org = Org::build().await;
        let to_boss = ManagerChanges {
            role: Some(Role::Boss),
            ..Default::default()
        };

        assert!(matches!(
            org.svc.update_manager(&org.boss, org.m1.id, to_boss.clone()).await,
            Err(ServiceError::Conflict(_))
        ));
        let owner = org.svc.get_manager(&org.boss, org.f1.manager_id).await.unwrap();
        assert_eq!(owner.role, Role::Manager);

        // Once the family is gone the promotion goes through.
        org.svc.delete_family(&org.m1, org.f1.id).await.unwrap();
        let promoted = org
            .svc
            .update_manager(&org.boss, org.m1.id, to_boss)
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Boss);
        assert_eq!(promoted.supervisor_id, None);
    }

    #[tokio::test]
    async fn boss_cannot_change_own_role() {
        let org = Org::build().await;
        let me = org
            .svc
            .update_manager(
                &org.boss,
                org.boss.id,
                ManagerChanges {
                    role: Some(Role::Manager),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(me.role, Role::Boss);
    }

    #[tokio::test]
    async fn delete_requires_no_families() {
        let org = Org::build().await;

        let err = org.svc.delete_manager(&org.boss, org.m1.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(org.svc.get_manager(&org.boss, org.m1.id).await.is_ok());

        assert!(matches!(
            org.svc.delete_manager(&org.s1, org.m1.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.delete_manager(&org.boss, org.boss.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_supervisor_detaches_subordinates() {
        let org = Org::build().await;
        org.svc.delete_manager(&org.boss, org.s1.id).await.unwrap();

        let m1 = org.svc.get_manager(&org.boss, org.m1.id).await.unwrap();
        assert_eq!(m1.supervisor_id, None);
        assert!(matches!(
            org.svc.get_manager(&org.boss, org.s1.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
