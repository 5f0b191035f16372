use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use growthwatch_auth::{Manager, Role, Scope};
use growthwatch_core::{
    Child, ChildId, Entity, Family, FamilyId, GrowthRecord, GrowthRecordId, ManagerId,
};

use super::{
    ChildRepository, FamilyRepository, GrowthRecordRepository, ManagerRepository, StoreError,
};

#[derive(Debug, Default)]
struct Tables {
    managers: BTreeMap<ManagerId, Manager>,
    families: BTreeMap<FamilyId, Family>,
    children: BTreeMap<ChildId, Child>,
    records: BTreeMap<GrowthRecordId, GrowthRecord>,
}

impl Tables {
    fn scoped_family_ids(&self, scope: &Scope) -> BTreeSet<FamilyId> {
        self.families
            .values()
            .filter(|f| scope.contains(f.manager_id))
            .map(|f| f.id)
            .collect()
    }

    fn scoped_child_ids(&self, scope: &Scope) -> BTreeSet<ChildId> {
        let families = self.scoped_family_ids(scope);
        self.children
            .values()
            .filter(|c| families.contains(&c.family_id))
            .map(|c| c.id)
            .collect()
    }

    /// Re-check the hierarchy rules for `manager` against current rows.
    fn check_hierarchy(&self, manager: &Manager) -> Result<(), StoreError> {
        if let Some(sup) = manager.supervisor_id {
            match self.managers.get(&sup) {
                None => return Err(StoreError::NotFound("supervisor")),
                Some(s) if s.role != Role::Supervisor => {
                    return Err(StoreError::Conflict(format!(
                        "supervisor {sup} is a {}, not a supervisor",
                        s.role
                    )));
                }
                Some(_) => {}
            }
        }
        if manager.role != Role::Supervisor
            && self
                .managers
                .values()
                .any(|m| m.id != manager.id && m.supervisor_id == Some(manager.id))
        {
            return Err(StoreError::Conflict(format!(
                "{} still has subordinates",
                manager.id
            )));
        }
        if manager.role == Role::Boss
            && self.families.values().any(|f| f.manager_id == manager.id)
        {
            return Err(StoreError::Conflict(format!("{} still owns families", manager.id)));
        }
        Ok(())
    }

    fn check_family_owner(&self, owner: ManagerId) -> Result<(), StoreError> {
        match self.managers.get(&owner) {
            None => Err(StoreError::NotFound(Manager::KIND)),
            Some(m) if m.role == Role::Boss => {
                Err(StoreError::Conflict(format!("{owner} is a boss and cannot own families")))
            }
            Some(_) => Ok(()),
        }
    }

    fn remove_child_cascade(&mut self, id: ChildId) {
        self.records.retain(|_, r| r.child_id != id);
        self.children.remove(&id);
    }
}

fn insert_new<E>(table: &mut BTreeMap<E::Id, E>, entity: E) -> Result<(), StoreError>
where
    E: Entity,
    E::Id: Ord,
{
    let id = entity.id();
    if table.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{} {:?} already exists", E::KIND, id)));
    }
    table.insert(id, entity);
    Ok(())
}

fn replace_existing<E>(table: &mut BTreeMap<E::Id, E>, entity: E) -> Result<(), StoreError>
where
    E: Entity,
    E::Id: Ord,
{
    match table.get_mut(&entity.id()) {
        Some(slot) => {
            *slot = entity;
            Ok(())
        }
        None => Err(StoreError::NotFound(E::KIND)),
    }
}

/// In-memory entity store for tests/dev.
///
/// All tables sit behind one lock, so every call (including cascades) is a
/// single critical section.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl ManagerRepository for InMemoryEntityStore {
    async fn get_manager(&self, id: ManagerId) -> Result<Option<Manager>, StoreError> {
        Ok(self.read()?.managers.get(&id).cloned())
    }

    async fn list_managers(&self, scope: &Scope) -> Result<Vec<Manager>, StoreError> {
        Ok(self
            .read()?
            .managers
            .values()
            .filter(|m| scope.contains(m.id))
            .cloned()
            .collect())
    }

    async fn list_subordinates(&self, supervisor_id: ManagerId) -> Result<Vec<Manager>, StoreError> {
        Ok(self
            .read()?
            .managers
            .values()
            .filter(|m| m.supervisor_id == Some(supervisor_id))
            .cloned()
            .collect())
    }

    async fn insert_manager(&self, manager: Manager) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_hierarchy(&manager)?;
        insert_new(&mut tables.managers, manager)
    }

    async fn update_manager(&self, manager: Manager) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_hierarchy(&manager)?;
        replace_existing(&mut tables.managers, manager)
    }

    async fn delete_manager(&self, id: ManagerId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.managers.contains_key(&id) {
            return Err(StoreError::NotFound(Manager::KIND));
        }
        let owned = tables.families.values().filter(|f| f.manager_id == id).count();
        if owned > 0 {
            return Err(StoreError::Conflict(format!(
                "manager still owns {owned} families"
            )));
        }
        for m in tables.managers.values_mut() {
            if m.supervisor_id == Some(id) {
                m.supervisor_id = None;
            }
        }
        tables.managers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FamilyRepository for InMemoryEntityStore {
    async fn get_family(&self, id: FamilyId) -> Result<Option<Family>, StoreError> {
        Ok(self.read()?.families.get(&id).cloned())
    }

    async fn list_families(&self, scope: &Scope) -> Result<Vec<Family>, StoreError> {
        Ok(self
            .read()?
            .families
            .values()
            .filter(|f| scope.contains(f.manager_id))
            .cloned()
            .collect())
    }

    async fn count_families_owned_by(&self, manager_id: ManagerId) -> Result<usize, StoreError> {
        Ok(self
            .read()?
            .families
            .values()
            .filter(|f| f.manager_id == manager_id)
            .count())
    }

    async fn insert_family(&self, family: Family) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_family_owner(family.manager_id)?;
        insert_new(&mut tables.families, family)
    }

    async fn update_family(&self, family: Family) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables.check_family_owner(family.manager_id)?;
        replace_existing(&mut tables.families, family)
    }

    async fn delete_family(&self, id: FamilyId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.families.remove(&id).is_none() {
            return Err(StoreError::NotFound(Family::KIND));
        }
        let orphaned: Vec<ChildId> = tables
            .children
            .values()
            .filter(|c| c.family_id == id)
            .map(|c| c.id)
            .collect();
        for child_id in orphaned {
            tables.remove_child_cascade(child_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ChildRepository for InMemoryEntityStore {
    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, StoreError> {
        Ok(self.read()?.children.get(&id).cloned())
    }

    async fn list_children(&self, scope: &Scope) -> Result<Vec<Child>, StoreError> {
        let tables = self.read()?;
        let families = tables.scoped_family_ids(scope);
        Ok(tables
            .children
            .values()
            .filter(|c| families.contains(&c.family_id))
            .cloned()
            .collect())
    }

    async fn list_children_of_family(&self, family_id: FamilyId) -> Result<Vec<Child>, StoreError> {
        Ok(self
            .read()?
            .children
            .values()
            .filter(|c| c.family_id == family_id)
            .cloned()
            .collect())
    }

    async fn insert_child(&self, child: Child) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.families.contains_key(&child.family_id) {
            return Err(StoreError::NotFound(Family::KIND));
        }
        insert_new(&mut tables.children, child)
    }

    async fn delete_child(&self, id: ChildId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.children.contains_key(&id) {
            return Err(StoreError::NotFound(Child::KIND));
        }
        tables.remove_child_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl GrowthRecordRepository for InMemoryEntityStore {
    async fn get_growth_record(&self, id: GrowthRecordId) -> Result<Option<GrowthRecord>, StoreError> {
        Ok(self.read()?.records.get(&id).cloned())
    }

    async fn list_growth_records(&self, scope: &Scope) -> Result<Vec<GrowthRecord>, StoreError> {
        let tables = self.read()?;
        let children = tables.scoped_child_ids(scope);
        Ok(tables
            .records
            .values()
            .filter(|r| children.contains(&r.child_id))
            .cloned()
            .collect())
    }

    async fn list_growth_records_of_child(
        &self,
        child_id: ChildId,
    ) -> Result<Vec<GrowthRecord>, StoreError> {
        Ok(self
            .read()?
            .records
            .values()
            .filter(|r| r.child_id == child_id)
            .cloned()
            .collect())
    }

    async fn insert_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.children.contains_key(&record.child_id) {
            return Err(StoreError::NotFound(Child::KIND));
        }
        insert_new(&mut tables.records, record)
    }

    async fn update_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        replace_existing(&mut tables.records, record)
    }

    async fn delete_growth_record(&self, id: GrowthRecordId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        tables
            .records
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(GrowthRecord::KIND))
    }
}
