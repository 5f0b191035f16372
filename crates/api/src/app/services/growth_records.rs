use growthwatch_auth::{Action, Owner, Principal, Resource};
use growthwatch_core::{ChildId, GrowthRecord, GrowthRecordChanges, GrowthRecordId, NewGrowthRecord};
use growthwatch_infra::store::GrowthRecordRepository;

use super::{AppServices, guard};
use crate::app::errors::ServiceError;

impl AppServices {
    async fn load_growth_record(
        &self,
        id: GrowthRecordId,
    ) -> Result<(GrowthRecord, Owner), ServiceError> {
        let record = self
            .store
            .get_growth_record(id)
            .await?
            .ok_or(ServiceError::NotFound("growth record"))?;
        let owner = self.hierarchy.owner_of_growth_record(&record).await?;
        Ok((record, owner))
    }

    pub async fn list_growth_records(
        &self,
        principal: &Principal,
    ) -> Result<Vec<GrowthRecord>, ServiceError> {
        guard(principal, Resource::GrowthRecord, Action::List, None)?;
        let scope = self.hierarchy.resource_scope(principal).await?;
        Ok(self.store.list_growth_records(&scope).await?)
    }

    pub async fn list_growth_records_of_child(
        &self,
        principal: &Principal,
        child_id: ChildId,
    ) -> Result<Vec<GrowthRecord>, ServiceError> {
        let (child, owner) = self.load_child(child_id).await?;
        guard(principal, Resource::GrowthRecord, Action::List, Some(&owner))?;
        Ok(self.store.list_growth_records_of_child(child.id).await?)
    }

    pub async fn get_growth_record(
        &self,
        principal: &Principal,
        id: GrowthRecordId,
    ) -> Result<GrowthRecord, ServiceError> {
        let (record, owner) = self.load_growth_record(id).await?;
        guard(principal, Resource::GrowthRecord, Action::Read, Some(&owner))?;
        Ok(record)
    }

    pub async fn create_growth_record(
        &self,
        principal: &Principal,
        input: NewGrowthRecord,
    ) -> Result<GrowthRecord, ServiceError> {
        guard(principal, Resource::GrowthRecord, Action::Create, None)?;
        let (child, owner) = self.load_child(input.child_id).await?;
        guard(principal, Resource::GrowthRecord, Action::Create, Some(&owner))?;

        let record = GrowthRecord::create(GrowthRecordId::new(), input)?;
        self.store.insert_growth_record(record.clone()).await?;
        tracing::info!(
            principal_id = %principal.id,
            record_id = %record.id,
            child_id = %child.id,
            "growth record created"
        );
        Ok(record)
    }

    pub async fn update_growth_record(
        &self,
        principal: &Principal,
        id: GrowthRecordId,
        changes: GrowthRecordChanges,
    ) -> Result<GrowthRecord, ServiceError> {
        let (record, owner) = self.load_growth_record(id).await?;
        guard(principal, Resource::GrowthRecord, Action::Update, Some(&owner))?;

        let next = record.with_changes(changes)?;
        self.store.update_growth_record(next.clone()).await?;
        Ok(next)
    }

    pub async fn delete_growth_record(
        &self,
        principal: &Principal,
        id: GrowthRecordId,
    ) -> Result<(), ServiceError> {
        let (record, owner) = self.load_growth_record(id).await?;
        guard(principal, Resource::GrowthRecord, Action::Delete, Some(&owner))?;

        self.store.delete_growth_record(record.id).await?;
        tracing::info!(principal_id = %principal.id, record_id = %record.id, "growth record deleted");
        Ok(())
    }
}
