//! Entity repositories.
//!
//! One repository trait per entity plus the [`EntityStore`] umbrella. Every
//! call is atomic on its own; cascading deletes run as one transaction.

use async_trait::async_trait;
use thiserror::Error;

use growthwatch_auth::{Manager, Scope};
use growthwatch_core::{
    Child, ChildId, Family, FamilyId, GrowthRecord, GrowthRecordId, ManagerId,
};

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryEntityStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A referenced row is missing (insert with dangling parent, update of a
    /// deleted row).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Referential guard or uniqueness violation.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ManagerRepository: Send + Sync {
    async fn get_manager(&self, id: ManagerId) -> Result<Option<Manager>, StoreError>;

    async fn list_managers(&self, scope: &Scope) -> Result<Vec<Manager>, StoreError>;

    /// Managers whose `supervisor_id` equals `supervisor_id`.
    async fn list_subordinates(&self, supervisor_id: ManagerId) -> Result<Vec<Manager>, StoreError>;

    async fn insert_manager(&self, manager: Manager) -> Result<(), StoreError>;

    async fn update_manager(&self, manager: Manager) -> Result<(), StoreError>;

    /// Delete a manager that owns no families. Subordinates lose their
    /// supervisor in the same transaction.
    async fn delete_manager(&self, id: ManagerId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn get_family(&self, id: FamilyId) -> Result<Option<Family>, StoreError>;

    /// Families whose owner is in `scope`.
    async fn list_families(&self, scope: &Scope) -> Result<Vec<Family>, StoreError>;

    async fn count_families_owned_by(&self, manager_id: ManagerId) -> Result<usize, StoreError>;

    async fn insert_family(&self, family: Family) -> Result<(), StoreError>;

    async fn update_family(&self, family: Family) -> Result<(), StoreError>;

    /// Delete a family with its children and their growth records.
    async fn delete_family(&self, id: FamilyId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ChildRepository: Send + Sync {
    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, StoreError>;

    /// Children of families whose owner is in `scope`.
    async fn list_children(&self, scope: &Scope) -> Result<Vec<Child>, StoreError>;

    async fn list_children_of_family(&self, family_id: FamilyId) -> Result<Vec<Child>, StoreError>;

    async fn insert_child(&self, child: Child) -> Result<(), StoreError>;

    /// Delete a child with its growth records.
    async fn delete_child(&self, id: ChildId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait GrowthRecordRepository: Send + Sync {
    async fn get_growth_record(&self, id: GrowthRecordId) -> Result<Option<GrowthRecord>, StoreError>;

    /// Records of children whose family owner is in `scope`.
    async fn list_growth_records(&self, scope: &Scope) -> Result<Vec<GrowthRecord>, StoreError>;

    async fn list_growth_records_of_child(
        &self,
        child_id: ChildId,
    ) -> Result<Vec<GrowthRecord>, StoreError>;

    async fn insert_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError>;

    async fn update_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError>;

    async fn delete_growth_record(&self, id: GrowthRecordId) -> Result<(), StoreError>;
}

/// The full persistence boundary used by the API layer.
pub trait EntityStore:
    ManagerRepository + FamilyRepository + ChildRepository + GrowthRecordRepository
{
}

impl<T> EntityStore for T where
    T: ManagerRepository + FamilyRepository + ChildRepository + GrowthRecordRepository
{
}
