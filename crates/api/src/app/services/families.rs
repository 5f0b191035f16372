use std::collections::BTreeSet;

use growthwatch_auth::{Action, Owner, Principal, Resource, Scope, family_owner_for};
use growthwatch_core::{Family, FamilyChanges, FamilyId, ManagerId, NewFamily};
use growthwatch_infra::store::{FamilyRepository, ManagerRepository};

use super::{AppServices, guard};
use crate::app::errors::ServiceError;

impl AppServices {
    /// Family plus the owner record that scope decisions need.
    pub(crate) async fn load_family(&self, id: FamilyId) -> Result<(Family, Owner), ServiceError> {
        let family = self
            .store
            .get_family(id)
            .await?
            .ok_or(ServiceError::NotFound("family"))?;
        let owner = self.hierarchy.owner_of_family(&family).await?;
        Ok((family, owner))
    }

    pub async fn list_families(&self, principal: &Principal) -> Result<Vec<Family>, ServiceError> {
        guard(principal, Resource::Family, Action::List, None)?;
        let scope = self.hierarchy.resource_scope(principal).await?;
        Ok(self.store.list_families(&scope).await?)
    }

    /// Families of one manager, who must be inside the caller's scope.
    pub async fn list_families_of_manager(
        &self,
        principal: &Principal,
        manager_id: ManagerId,
    ) -> Result<Vec<Family>, ServiceError> {
        let owner = self
            .hierarchy
            .owner_by_id(manager_id)
            .await?
            .ok_or(ServiceError::NotFound("manager"))?;
        guard(principal, Resource::Family, Action::List, Some(&owner))?;

        let scope = Scope::Managers(BTreeSet::from([manager_id]));
        Ok(self.store.list_families(&scope).await?)
    }

    pub async fn get_family(&self, principal: &Principal, id: FamilyId) -> Result<Family, ServiceError> {
        let (family, owner) = self.load_family(id).await?;
        guard(principal, Resource::Family, Action::Read, Some(&owner))?;
        Ok(family)
    }

    /// Managers always own what they create. Supervisors must name one of
    /// their subordinates. Bosses never create.
    pub async fn create_family(
        &self,
        principal: &Principal,
        requested_owner: Option<ManagerId>,
        input: NewFamily,
    ) -> Result<Family, ServiceError> {
        guard(principal, Resource::Family, Action::Create, None)?;

        if principal.role == growthwatch_auth::Role::Manager
            && requested_owner.is_some_and(|id| id != principal.id)
        {
            tracing::warn!(
                principal_id = %principal.id,
                "ignoring manager_id on family created by a manager"
            );
        }
        let owner_id = family_owner_for(principal, requested_owner)
            .ok_or_else(|| ServiceError::Validation("manager_id is required".to_string()))?;
        let owner = self
            .hierarchy
            .owner_by_id(owner_id)
            .await?
            .ok_or(ServiceError::NotFound("manager"))?;
        guard(principal, Resource::Family, Action::Create, Some(&owner))?;

        let family = Family::create(FamilyId::new(), owner_id, input)?;
        self.store.insert_family(family.clone()).await?;
        tracing::info!(
            principal_id = %principal.id,
            family_id = %family.id,
            manager_id = %family.manager_id,
            "family created"
        );
        Ok(family)
    }

    /// Owner-only edit. A requested owner change is ignored.
    ///
    /// `body` is the decoded request and is only inspected once the caller
    /// is allowed to update, so a denied caller gets 403 whatever it sent.
    pub async fn update_family(
        &self,
        principal: &Principal,
        id: FamilyId,
        body: Result<(Option<ManagerId>, FamilyChanges), ServiceError>,
    ) -> Result<Family, ServiceError> {
        let (family, owner) = self.load_family(id).await?;
        guard(principal, Resource::Family, Action::Update, Some(&owner))?;
        let (requested_owner, changes) = body?;

        if requested_owner.is_some_and(|requested| requested != family.manager_id) {
            tracing::warn!(
                principal_id = %principal.id,
                family_id = %family.id,
                "ignoring manager_id change on family update"
            );
        }

        let next = family.with_changes(changes)?;
        self.store.update_family(next.clone()).await?;
        Ok(next)
    }

    /// Removes the family with its children and their growth records.
    pub async fn delete_family(&self, principal: &Principal, id: FamilyId) -> Result<(), ServiceError> {
        let (family, owner) = self.load_family(id).await?;
        guard(principal, Resource::Family, Action::Delete, Some(&owner))?;

        self.store.delete_family(family.id).await?;
        tracing::info!(principal_id = %principal.id, family_id = %family.id, "family deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::services::scenarios::{Org, new_family};
    use growthwatch_core::ComplianceStatus;

    #[tokio::test]
    async fn list_scope_by_role() {
        let org = Org::build().await;
        assert_eq!(org.svc.list_families(&org.boss).await.unwrap().len(), 4);

        let mut s1: Vec<FamilyId> = org
            .svc
            .list_families(&org.s1)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        s1.sort();
        let mut expected = vec![org.f1.id, org.f2.id];
        expected.sort();
        assert_eq!(s1, expected);

        let m1 = org.svc.list_families(&org.m1).await.unwrap();
        assert_eq!(m1.len(), 1);
        assert_eq!(m1[0].id, org.f1.id);
    }

    #[tokio::test]
    async fn families_of_manager_requires_scope() {
        let org = Org::build().await;
        assert_eq!(
            org.svc.list_families_of_manager(&org.s1, org.m2.id).await.unwrap().len(),
            1
        );
        assert_eq!(
            org.svc.list_families_of_manager(&org.boss, org.m4.id).await.unwrap().len(),
            1
        );
        assert!(matches!(
            org.svc.list_families_of_manager(&org.s1, org.m3.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.list_families_of_manager(&org.m1, org.m2.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.list_families_of_manager(&org.boss, ManagerId::new()).await,
            Err(ServiceError::NotFound("manager"))
        ));
    }

    #[tokio::test]
    async fn manager_create_forces_self_as_owner() {
        let org = Org::build().await;
        let family = org
            .svc
            .create_family(&org.m1, Some(org.m3.id), new_family("Okafor"))
            .await
            .unwrap();
        assert_eq!(family.manager_id, org.m1.id);
        assert_eq!(family.compliance_status, ComplianceStatus::Green);
    }

    #[tokio::test]
    async fn supervisor_create_targets_subordinates_only() {
        let org = Org::build().await;
        let family = org
            .svc
            .create_family(&org.s1, Some(org.m2.id), new_family("Mensah"))
            .await
            .unwrap();
        assert_eq!(family.manager_id, org.m2.id);

        assert!(matches!(
            org.svc.create_family(&org.s1, Some(org.m3.id), new_family("X")).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.create_family(&org.s1, Some(org.s1.id), new_family("X")).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.create_family(&org.s1, None, new_family("X")).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            org.svc.create_family(&org.s1, Some(ManagerId::new()), new_family("X")).await,
            Err(ServiceError::NotFound("manager"))
        ));
    }

    #[tokio::test]
    async fn boss_never_creates_families() {
        let org = Org::build().await;
        assert!(matches!(
            org.svc.create_family(&org.boss, Some(org.m1.id), new_family("X")).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn only_the_owning_manager_updates() {
        let org = Org::build().await;
        let rename = FamilyChanges {
            family_name: Some("Renamed".into()),
            ..Default::default()
        };

        for outsider in [&org.boss, &org.s1, &org.m2] {
            assert!(matches!(
                org.svc.update_family(outsider, org.f1.id, Ok((None, rename.clone()))).await,
                Err(ServiceError::Forbidden(_))
            ));
        }

        let updated = org
            .svc
            .update_family(&org.m1, org.f1.id, Ok((None, rename)))
            .await
            .unwrap();
        assert_eq!(updated.family_name, "Renamed");
    }

    #[tokio::test]
    async fn boss_update_is_forbidden_whatever_the_body() {
        let org = Org::build().await;
        assert!(matches!(
            org.svc
                .update_family(&org.boss, org.f1.id, Ok((None, FamilyChanges::default())))
                .await,
            Err(ServiceError::Forbidden(_))
        ));

        let undecodable = || -> Result<(Option<ManagerId>, FamilyChanges), ServiceError> {
            Err(ServiceError::Validation("unknown variant `purple`".into()))
        };
        assert!(matches!(
            org.svc.update_family(&org.boss, org.f1.id, undecodable()).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.update_family(&org.m2, org.f1.id, undecodable()).await,
            Err(ServiceError::Forbidden(_))
        ));

        // The owner is allowed in, so the body error surfaces.
        assert!(matches!(
            org.svc.update_family(&org.m1, org.f1.id, undecodable()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn owner_reassignment_is_ignored() {
        let org = Org::build().await;
        let updated = org
            .svc
            .update_family(
                &org.m1,
                org.f1.id,
                Ok((
                    Some(org.m2.id),
                    FamilyChanges {
                        compliance_status: Some(ComplianceStatus::Red),
                        ..Default::default()
                    },
                )),
            )
            .await
            .unwrap();
        assert_eq!(updated.manager_id, org.m1.id);
        assert_eq!(updated.compliance_status, ComplianceStatus::Red);

        let stored = org.svc.get_family(&org.boss, org.f1.id).await.unwrap();
        assert_eq!(stored.manager_id, org.m1.id);
    }

    #[tokio::test]
    async fn delete_rules() {
        let org = Org::build().await;
        assert!(matches!(
            org.svc.delete_family(&org.boss, org.f1.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            org.svc.delete_family(&org.s2, org.f1.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        org.svc.delete_family(&org.s1, org.f2.id).await.unwrap();
        org.svc.delete_family(&org.m1, org.f1.id).await.unwrap();
        assert!(matches!(
            org.svc.delete_family(&org.m1, org.f1.id).await,
            Err(ServiceError::NotFound("family"))
        ));
    }
}
