//! Hierarchy resolution: who reports to whom, and who owns what.
//!
//! The hierarchy is at most two levels (supervisor → manager), so subordinate
//! lookups are single-level; there is no transitive closure.

use std::sync::Arc;

use growthwatch_auth::{Manager, Owner, Principal, Role, Scope, resource_scope, staff_scope};
use growthwatch_core::{Child, Family, GrowthRecord, ManagerId};

use crate::store::{ChildRepository, EntityStore, FamilyRepository, ManagerRepository, StoreError};

#[derive(Clone)]
pub struct HierarchyResolver {
    store: Arc<dyn EntityStore>,
}

impl HierarchyResolver {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Managers whose `supervisor_id` is `manager_id`. Unknown ids yield an
    /// empty list.
    pub async fn subordinates_of(&self, manager_id: ManagerId) -> Result<Vec<Manager>, StoreError> {
        self.store.list_subordinates(manager_id).await
    }

    pub async fn is_subordinate_of(
        &self,
        candidate: ManagerId,
        supervisor_id: ManagerId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .subordinates_of(supervisor_id)
            .await?
            .iter()
            .any(|m| m.id == candidate))
    }

    async fn subordinate_ids(&self, principal: &Principal) -> Result<Vec<ManagerId>, StoreError> {
        if principal.role != Role::Supervisor {
            return Ok(Vec::new());
        }
        Ok(self
            .subordinates_of(principal.id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect())
    }

    /// Owners whose families, children and records `principal` may list.
    pub async fn resource_scope(&self, principal: &Principal) -> Result<Scope, StoreError> {
        let subordinates = self.subordinate_ids(principal).await?;
        Ok(resource_scope(principal, subordinates))
    }

    /// Staff records `principal` may list.
    pub async fn staff_scope(&self, principal: &Principal) -> Result<Scope, StoreError> {
        let subordinates = self.subordinate_ids(principal).await?;
        Ok(staff_scope(principal, subordinates))
    }

    pub async fn owner_by_id(&self, manager_id: ManagerId) -> Result<Option<Owner>, StoreError> {
        Ok(self
            .store
            .get_manager(manager_id)
            .await?
            .as_ref()
            .map(Owner::of))
    }

    pub async fn owner_of_family(&self, family: &Family) -> Result<Owner, StoreError> {
        self.owner_by_id(family.manager_id)
            .await?
            .ok_or(StoreError::NotFound("manager"))
    }

    /// The child's family together with its owner.
    pub async fn owner_of_child(&self, child: &Child) -> Result<(Family, Owner), StoreError> {
        let family = self
            .store
            .get_family(child.family_id)
            .await?
            .ok_or(StoreError::NotFound("family"))?;
        let owner = self.owner_of_family(&family).await?;
        Ok((family, owner))
    }

    pub async fn owner_of_growth_record(&self, record: &GrowthRecord) -> Result<Owner, StoreError> {
        let child = self
            .store
            .get_child(record.child_id)
            .await?
            .ok_or(StoreError::NotFound("child"))?;
        let (_, owner) = self.owner_of_child(&child).await?;
        Ok(owner)
    }
}
