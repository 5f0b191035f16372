//! Postgres-backed entity and credential stores.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |-----------------------|------------|----------|
//! | `23505` | `Conflict` | Duplicate id or username |
//! | `23503` | `Conflict` | Row still referenced (e.g. manager owning families) |
//! | other / pool / network | `Backend` | Anything else |
//!
//! Cascading deletes use `ON DELETE CASCADE` foreign keys; detaching
//! subordinates from a deleted supervisor runs in the same transaction as the
//! delete. Manager updates and family inserts re-check the hierarchy rules
//! under row locks.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use growthwatch_auth::credentials::normalize_username;
use growthwatch_auth::{CredentialError, CredentialStore, Manager, Principal, Role, Scope};
use growthwatch_core::{
    Child, ChildId, ComplianceStatus, Family, FamilyId, GrowthRecord, GrowthRecordId, ManagerId,
};

use super::{
    ChildRepository, FamilyRepository, GrowthRecordRepository, ManagerRepository, StoreError,
};
use crate::password::{blocking, hash_password, verify_password};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS managers (
        id            UUID PRIMARY KEY,
        name          TEXT NOT NULL,
        role          TEXT NOT NULL CHECK (role IN ('boss', 'supervisor', 'manager')),
        supervisor_id UUID NULL REFERENCES managers (id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS credentials (
        username      TEXT PRIMARY KEY,
        manager_id    UUID NOT NULL UNIQUE REFERENCES managers (id) ON DELETE CASCADE,
        password_hash TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS families (
        id                UUID PRIMARY KEY,
        family_name       TEXT NOT NULL,
        country           TEXT NOT NULL,
        manager_id        UUID NOT NULL REFERENCES managers (id) ON DELETE RESTRICT,
        compliance_status TEXT NOT NULL CHECK (compliance_status IN ('red', 'yellow', 'green')),
        manager_notes     TEXT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS children (
        id        UUID PRIMARY KEY,
        name      TEXT NOT NULL,
        birthday  DATE NOT NULL,
        family_id UUID NOT NULL REFERENCES families (id) ON DELETE CASCADE,
        bone_age  DOUBLE PRECISION NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS growth_records (
        id          UUID PRIMARY KEY,
        child_id    UUID NOT NULL REFERENCES children (id) ON DELETE CASCADE,
        record_date DATE NOT NULL,
        height      DOUBLE PRECISION NOT NULL,
        weight      DOUBLE PRECISION NOT NULL,
        notes       TEXT NOT NULL DEFAULT ''
    )
    "#,
];

/// Postgres-backed [`crate::EntityStore`].
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: Arc<PgPool>,
}

impl PostgresEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the tables if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tracing::info!("postgres schema ready");
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

/// `None` means unrestricted; bound as a nullable `uuid[]`.
fn scope_ids(scope: &Scope) -> Option<Vec<Uuid>> {
    match scope {
        Scope::All => None,
        Scope::Managers(ids) => Some(ids.iter().map(|id| *id.as_uuid()).collect()),
    }
}

fn decode_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("row decode: {e}"))
}

fn manager_from_row(row: &PgRow) -> Result<Manager, StoreError> {
    let role: String = row.try_get("role").map_err(decode_err)?;
    let supervisor_id: Option<Uuid> = row.try_get("supervisor_id").map_err(decode_err)?;
    Ok(Manager {
        id: ManagerId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        role: Role::parse(&role)
            .ok_or_else(|| StoreError::Backend(format!("unknown role in storage: {role}")))?,
        supervisor_id: supervisor_id.map(ManagerId::from_uuid),
    })
}

fn family_from_row(row: &PgRow) -> Result<Family, StoreError> {
    let status: String = row.try_get("compliance_status").map_err(decode_err)?;
    Ok(Family {
        id: FamilyId::from_uuid(row.try_get("id").map_err(decode_err)?),
        family_name: row.try_get("family_name").map_err(decode_err)?,
        country: row.try_get("country").map_err(decode_err)?,
        manager_id: ManagerId::from_uuid(row.try_get("manager_id").map_err(decode_err)?),
        compliance_status: ComplianceStatus::parse(&status).ok_or_else(|| {
            StoreError::Backend(format!("unknown compliance status in storage: {status}"))
        })?,
        manager_notes: row.try_get("manager_notes").map_err(decode_err)?,
    })
}

fn child_from_row(row: &PgRow) -> Result<Child, StoreError> {
    Ok(Child {
        id: ChildId::from_uuid(row.try_get("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        birthday: row.try_get("birthday").map_err(decode_err)?,
        family_id: FamilyId::from_uuid(row.try_get("family_id").map_err(decode_err)?),
        bone_age: row.try_get("bone_age").map_err(decode_err)?,
    })
}

fn record_from_row(row: &PgRow) -> Result<GrowthRecord, StoreError> {
    Ok(GrowthRecord {
        id: GrowthRecordId::from_uuid(row.try_get("id").map_err(decode_err)?),
        child_id: ChildId::from_uuid(row.try_get("child_id").map_err(decode_err)?),
        record_date: row.try_get("record_date").map_err(decode_err)?,
        height: row.try_get("height").map_err(decode_err)?,
        weight: row.try_get("weight").map_err(decode_err)?,
        notes: row.try_get("notes").map_err(decode_err)?,
    })
}

fn collect<T>(
    rows: Vec<PgRow>,
    decode: fn(&PgRow) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(decode).collect()
}

/// Roll back `tx` and surface `err`.
async fn rollback<T>(tx: Transaction<'_, Postgres>, err: StoreError) -> Result<T, StoreError> {
    tx.rollback()
        .await
        .map_err(|e| map_sqlx_error("rollback", e))?;
    Err(err)
}

/// Turns "zero rows affected" into `NotFound`.
fn expect_affected(kind: &'static str, affected: u64) -> Result<(), StoreError> {
    if affected == 0 {
        Err(StoreError::NotFound(kind))
    } else {
        Ok(())
    }
}

#[async_trait]
impl ManagerRepository for PostgresEntityStore {
    async fn get_manager(&self, id: ManagerId) -> Result<Option<Manager>, StoreError> {
        sqlx::query("SELECT id, name, role, supervisor_id FROM managers WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_manager", e))?
            .as_ref()
            .map(manager_from_row)
            .transpose()
    }

    async fn list_managers(&self, scope: &Scope) -> Result<Vec<Manager>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, role, supervisor_id FROM managers
            WHERE ($1::uuid[] IS NULL OR id = ANY($1))
            ORDER BY id
            "#,
        )
        .bind(scope_ids(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_managers", e))?;
        collect(rows, manager_from_row)
    }

    async fn list_subordinates(&self, supervisor_id: ManagerId) -> Result<Vec<Manager>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, role, supervisor_id FROM managers WHERE supervisor_id = $1 ORDER BY id",
        )
        .bind(*supervisor_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_subordinates", e))?;
        collect(rows, manager_from_row)
    }

    async fn insert_manager(&self, manager: Manager) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO managers (id, name, role, supervisor_id) VALUES ($1, $2, $3, $4)")
            .bind(*manager.id.as_uuid())
            .bind(&manager.name)
            .bind(manager.role.as_str())
            .bind(manager.supervisor_id.map(|id| *id.as_uuid()))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_manager", e))?;
        Ok(())
    }

    async fn update_manager(&self, manager: Manager) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock the edited row first; concurrent edits that read it as a
        // supervisor or family owner wait for this transaction.
        let exists = sqlx::query("SELECT id FROM managers WHERE id = $1 FOR UPDATE")
            .bind(*manager.id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_manager", e))?;
        if exists.is_none() {
            return rollback(tx, StoreError::NotFound("manager")).await;
        }

        if let Some(sup) = manager.supervisor_id {
            let role: Option<String> =
                sqlx::query_scalar("SELECT role FROM managers WHERE id = $1 FOR SHARE")
                    .bind(*sup.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_manager", e))?;
            match role.as_deref() {
                None => return rollback(tx, StoreError::NotFound("supervisor")).await,
                Some(role) if role != Role::Supervisor.as_str() => {
                    let err = StoreError::Conflict(format!(
                        "supervisor {sup} is a {role}, not a supervisor"
                    ));
                    return rollback(tx, err).await;
                }
                Some(_) => {}
            }
        }

        if manager.role != Role::Supervisor {
            let subordinates: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM managers WHERE supervisor_id = $1 AND id <> $1",
            )
            .bind(*manager.id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_manager", e))?;
            if subordinates > 0 {
                let err = StoreError::Conflict(format!("{} still has subordinates", manager.id));
                return rollback(tx, err).await;
            }
        }

        if manager.role == Role::Boss {
            let owned: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE manager_id = $1")
                    .bind(*manager.id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_manager", e))?;
            if owned > 0 {
                let err = StoreError::Conflict(format!("{} still owns families", manager.id));
                return rollback(tx, err).await;
            }
        }

        sqlx::query("UPDATE managers SET name = $2, role = $3, supervisor_id = $4 WHERE id = $1")
            .bind(*manager.id.as_uuid())
            .bind(&manager.name)
            .bind(manager.role.as_str())
            .bind(manager.supervisor_id.map(|id| *id.as_uuid()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_manager", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn delete_manager(&self, id: ManagerId) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let owned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE manager_id = $1")
            .bind(*id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_manager", e))?;
        if owned > 0 {
            let err = StoreError::Conflict(format!(
                "manager still owns {owned} families; reassign them first"
            ));
            return rollback(tx, err).await;
        }

        sqlx::query("UPDATE managers SET supervisor_id = NULL WHERE supervisor_id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_manager", e))?;

        let result = sqlx::query("DELETE FROM managers WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_manager", e))?;
        if result.rows_affected() == 0 {
            return rollback(tx, StoreError::NotFound("manager")).await;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl FamilyRepository for PostgresEntityStore {
    async fn get_family(&self, id: FamilyId) -> Result<Option<Family>, StoreError> {
        sqlx::query(
            r#"
            SELECT id, family_name, country, manager_id, compliance_status, manager_notes
            FROM families WHERE id = $1
            "#,
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_family", e))?
        .as_ref()
        .map(family_from_row)
        .transpose()
    }

    async fn list_families(&self, scope: &Scope) -> Result<Vec<Family>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, family_name, country, manager_id, compliance_status, manager_notes
            FROM families
            WHERE ($1::uuid[] IS NULL OR manager_id = ANY($1))
            ORDER BY id
            "#,
        )
        .bind(scope_ids(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_families", e))?;
        collect(rows, family_from_row)
    }

    async fn count_families_owned_by(&self, manager_id: ManagerId) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM families WHERE manager_id = $1")
            .bind(*manager_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_families_owned_by", e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn insert_family(&self, family: Family) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let owner_role: Option<String> =
            sqlx::query_scalar("SELECT role FROM managers WHERE id = $1 FOR SHARE")
                .bind(*family.manager_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_family", e))?;
        match owner_role.as_deref() {
            None => return rollback(tx, StoreError::NotFound("manager")).await,
            Some(role) if role == Role::Boss.as_str() => {
                let err = StoreError::Conflict(format!(
                    "{} is a boss and cannot own families",
                    family.manager_id
                ));
                return rollback(tx, err).await;
            }
            Some(_) => {}
        }

        sqlx::query(
            r#"
            INSERT INTO families (id, family_name, country, manager_id, compliance_status, manager_notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*family.id.as_uuid())
        .bind(&family.family_name)
        .bind(&family.country)
        .bind(*family.manager_id.as_uuid())
        .bind(family.compliance_status.as_str())
        .bind(&family.manager_notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_family", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }

    async fn update_family(&self, family: Family) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE families
            SET family_name = $2, country = $3, manager_id = $4,
                compliance_status = $5, manager_notes = $6
            WHERE id = $1
            "#,
        )
        .bind(*family.id.as_uuid())
        .bind(&family.family_name)
        .bind(&family.country)
        .bind(*family.manager_id.as_uuid())
        .bind(family.compliance_status.as_str())
        .bind(&family.manager_notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_family", e))?;
        expect_affected("family", result.rows_affected())
    }

    async fn delete_family(&self, id: FamilyId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM families WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_family", e))?;
        expect_affected("family", result.rows_affected())
    }
}

#[async_trait]
impl ChildRepository for PostgresEntityStore {
    async fn get_child(&self, id: ChildId) -> Result<Option<Child>, StoreError> {
        sqlx::query("SELECT id, name, birthday, family_id, bone_age FROM children WHERE id = $1")
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_child", e))?
            .as_ref()
            .map(child_from_row)
            .transpose()
    }

    async fn list_children(&self, scope: &Scope) -> Result<Vec<Child>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.birthday, c.family_id, c.bone_age
            FROM children c
            JOIN families f ON f.id = c.family_id
            WHERE ($1::uuid[] IS NULL OR f.manager_id = ANY($1))
            ORDER BY c.id
            "#,
        )
        .bind(scope_ids(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_children", e))?;
        collect(rows, child_from_row)
    }

    async fn list_children_of_family(&self, family_id: FamilyId) -> Result<Vec<Child>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, birthday, family_id, bone_age FROM children WHERE family_id = $1 ORDER BY id",
        )
        .bind(*family_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_children_of_family", e))?;
        collect(rows, child_from_row)
    }

    async fn insert_child(&self, child: Child) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO children (id, name, birthday, family_id, bone_age) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*child.id.as_uuid())
        .bind(&child.name)
        .bind(child.birthday)
        .bind(*child.family_id.as_uuid())
        .bind(child.bone_age)
        .execute(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_child", e) {
            StoreError::Conflict(msg) if msg.contains("foreign key") => StoreError::NotFound("family"),
            other => other,
        })?;
        Ok(())
    }

    async fn delete_child(&self, id: ChildId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_child", e))?;
        expect_affected("child", result.rows_affected())
    }
}

#[async_trait]
impl GrowthRecordRepository for PostgresEntityStore {
    async fn get_growth_record(&self, id: GrowthRecordId) -> Result<Option<GrowthRecord>, StoreError> {
        sqlx::query(
            "SELECT id, child_id, record_date, height, weight, notes FROM growth_records WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_growth_record", e))?
        .as_ref()
        .map(record_from_row)
        .transpose()
    }

    async fn list_growth_records(&self, scope: &Scope) -> Result<Vec<GrowthRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.child_id, g.record_date, g.height, g.weight, g.notes
            FROM growth_records g
            JOIN children c ON c.id = g.child_id
            JOIN families f ON f.id = c.family_id
            WHERE ($1::uuid[] IS NULL OR f.manager_id = ANY($1))
            ORDER BY g.id
            "#,
        )
        .bind(scope_ids(scope))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_growth_records", e))?;
        collect(rows, record_from_row)
    }

    async fn list_growth_records_of_child(
        &self,
        child_id: ChildId,
    ) -> Result<Vec<GrowthRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, child_id, record_date, height, weight, notes
            FROM growth_records WHERE child_id = $1
            ORDER BY record_date, id
            "#,
        )
        .bind(*child_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_growth_records_of_child", e))?;
        collect(rows, record_from_row)
    }

    async fn insert_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO growth_records (id, child_id, record_date, height, weight, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(*record.child_id.as_uuid())
        .bind(record.record_date)
        .bind(record.height)
        .bind(record.weight)
        .bind(&record.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| match map_sqlx_error("insert_growth_record", e) {
            StoreError::Conflict(msg) if msg.contains("foreign key") => StoreError::NotFound("child"),
            other => other,
        })?;
        Ok(())
    }

    async fn update_growth_record(&self, record: GrowthRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE growth_records
            SET record_date = $2, height = $3, weight = $4, notes = $5
            WHERE id = $1
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(record.record_date)
        .bind(record.height)
        .bind(record.weight)
        .bind(&record.notes)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_growth_record", e))?;
        expect_affected("growth record", result.rows_affected())
    }

    async fn delete_growth_record(&self, id: GrowthRecordId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM growth_records WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_growth_record", e))?;
        expect_affected("growth record", result.rows_affected())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Credentials kept next to the managers table (shares its pool).
#[derive(Clone)]
pub struct PostgresCredentialStore {
    store: PostgresEntityStore,
}

impl PostgresCredentialStore {
    pub fn new(store: PostgresEntityStore) -> Self {
        Self { store }
    }
}

fn backend(e: sqlx::Error) -> CredentialError {
    CredentialError::Backend(e.to_string())
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, CredentialError> {
        let row = sqlx::query("SELECT manager_id, password_hash FROM credentials WHERE username = $1")
            .bind(normalize_username(username))
            .fetch_optional(self.store.pool())
            .await
            .map_err(backend)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let manager_id: Uuid = row.try_get("manager_id").map_err(backend)?;
        let hash: String = row.try_get("password_hash").map_err(backend)?;
        let password = password.to_string();
        if !blocking(move || verify_password(&password, &hash)).await? {
            return Ok(None);
        }

        let manager = self
            .store
            .get_manager(ManagerId::from_uuid(manager_id))
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
        let password = password.to_string();
        let hash = blocking(move || hash_password(&password)).await?;

        sqlx::query("INSERT INTO credentials (username, manager_id, password_hash) VALUES ($1, $2, $3)")
            .bind(normalize_username(username))
            .bind(*manager_id.as_uuid())
            .bind(hash)
            .execute(self.store.pool())
            .await
            .map_err(|e| match map_sqlx_error("register", e) {
                StoreError::Conflict(_) => CredentialError::UsernameTaken,
                other => CredentialError::Backend(other.to_string()),
            })?;
        Ok(())
    }

    async fn forget(&self, manager_id: ManagerId) -> Result<(), CredentialError> {
        sqlx::query("DELETE FROM credentials WHERE manager_id = $1")
            .bind(*manager_id.as_uuid())
            .execute(self.store.pool())
            .await
            .map_err(backend)?;
        Ok(())
    }
}
