use chrono::Utc;

use growthwatch_auth::{Action, Owner, Principal, Resource};
use growthwatch_core::{Child, ChildId, FamilyId, NewChild};
use growthwatch_infra::store::ChildRepository;

use super::{AppServices, guard};
use crate::app::errors::ServiceError;

impl AppServices {
    pub(crate) async fn load_child(&self, id: ChildId) -> Result<(Child, Owner), ServiceError> {
        let child = self
            .store
            .get_child(id)
            .await?
            .ok_or(ServiceError::NotFound("child"))?;
        let (_, owner) = self.hierarchy.owner_of_child(&child).await?;
        Ok((child, owner))
    }

    pub async fn list_children(&self, principal: &Principal) -> Result<Vec<Child>, ServiceError> {
        guard(principal, Resource::Child, Action::List, None)?;
        let scope = self.hierarchy.resource_scope(principal).await?;
        Ok(self.store.list_children(&scope).await?)
    }

    pub async fn list_children_of_family(
        &self,
        principal: &Principal,
        family_id: FamilyId,
    ) -> Result<Vec<Child>, ServiceError> {
        let (family, owner) = self.load_family(family_id).await?;
        guard(principal, Resource::Child, Action::List, Some(&owner))?;
        Ok(self.store.list_children_of_family(family.id).await?)
    }

    pub async fn get_child(&self, principal: &Principal, id: ChildId) -> Result<Child, ServiceError> {
        let (child, owner) = self.load_child(id).await?;
        guard(principal, Resource::Child, Action::Read, Some(&owner))?;
        Ok(child)
    }

    pub async fn create_child(&self, principal: &Principal, input: NewChild) -> Result<Child, ServiceError> {
        guard(principal, Resource::Child, Action::Create, None)?;
        let (family, owner) = self.load_family(input.family_id).await?;
        guard(principal, Resource::Child, Action::Create, Some(&owner))?;

        let child = Child::create(ChildId::new(), input, Utc::now().date_naive())?;
        self.store.insert_child(child.clone()).await?;
        tracing::info!(
            principal_id = %principal.id,
            child_id = %child.id,
            family_id = %family.id,
            "child created"
        );
        Ok(child)
    }

    /// Removes the child with its growth records.
    pub async fn delete_child(&self, principal: &Principal, id: ChildId) -> Result<(), ServiceError> {
        let (child, owner) = self.load_child(id).await?;
        guard(principal, Resource::Child, Action::Delete, Some(&owner))?;

        self.store.delete_child(child.id).await?;
        tracing::info!(principal_id = %principal.id, child_id = %child.id, "child deleted");
        Ok(())
    }
}
