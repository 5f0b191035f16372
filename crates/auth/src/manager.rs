//! Staff member record (boss, supervisor or manager).
//!
//! A `Manager` is both an entity (families are owned by one) and the identity
//! behind a [`crate::Principal`]. This module owns the hierarchy integrity rules
//! applied when a boss edits role or supervisor.

use serde::{Deserialize, Serialize};

use growthwatch_core::validate::{MAX_NAME_LEN, required_text};
use growthwatch_core::{DomainError, DomainResult, Entity, ManagerId};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Manager
// ─────────────────────────────────────────────────────────────────────────────

/// A staff member.
///
/// # Invariants
/// - Only `Role::Manager` carries a `supervisor_id`, and it points at a
///   `Role::Supervisor`. The hierarchy is therefore at most two levels deep.
/// - Nobody supervises themselves.
/// - A supervisor with subordinates cannot change role.
/// - A manager or supervisor who owns families cannot become boss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    pub name: String,
    pub role: Role,
    pub supervisor_id: Option<ManagerId>,
}

/// Requested edits to a manager. Which of these survive depends on the
/// caller's role (see [`crate::filter_manager_changes`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerChanges {
    pub name: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` removes the supervisor.
    pub supervisor_id: Option<Option<ManagerId>>,
}

impl ManagerChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.supervisor_id.is_none()
    }
}

/// Stored state around the edited record that the integrity rules depend on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyFacts<'a> {
    /// The record referenced by `changes.supervisor_id` when that sets a
    /// supervisor; `None` if it does not exist.
    pub new_supervisor: Option<&'a Manager>,
    /// Someone currently names the edited record as supervisor.
    pub has_subordinates: bool,
    /// The edited record owns at least one family.
    pub owns_families: bool,
}

impl Manager {
    /// Self-service registration always yields a plain manager without supervisor.
    pub fn register(id: ManagerId, name: &str) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required_text("name", name, MAX_NAME_LEN)?,
            role: Role::Manager,
            supervisor_id: None,
        })
    }

    /// Seed a staff member with an explicit role (bootstrap/fixtures).
    pub fn seeded(id: ManagerId, name: &str, role: Role) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: required_text("name", name, MAX_NAME_LEN)?,
            role,
            supervisor_id: None,
        })
    }

    /// Apply already-authorized changes, enforcing hierarchy integrity.
    pub fn with_changes(
        &self,
        changes: ManagerChanges,
        facts: HierarchyFacts<'_>,
    ) -> DomainResult<Self> {
        let mut next = self.clone();

        if let Some(name) = changes.name {
            next.name = required_text("name", &name, MAX_NAME_LEN)?;
        }

        if let Some(role) = changes.role {
            if self.role == Role::Supervisor && role != Role::Supervisor && facts.has_subordinates {
                return Err(DomainError::conflict(
                    "supervisor still has subordinates; reassign them first",
                ));
            }
            if role == Role::Boss && self.role != Role::Boss && facts.owns_families {
                return Err(DomainError::conflict(
                    "a boss cannot own families; reassign or delete them first",
                ));
            }
            next.role = role;
        }

        match changes.supervisor_id {
            Some(Some(supervisor_id)) => {
                if !next.role.may_have_supervisor() {
                    return Err(DomainError::validation(format!(
                        "a {} cannot have a supervisor",
                        next.role
                    )));
                }
                if supervisor_id == self.id {
                    return Err(DomainError::validation("a manager cannot supervise itself"));
                }
                let supervisor = facts
                    .new_supervisor
                    .filter(|s| s.id == supervisor_id)
                    .ok_or(DomainError::not_found("supervisor"))?;
                if supervisor.role != Role::Supervisor {
                    return Err(DomainError::validation(format!(
                        "supervisor_id must reference a supervisor, not a {}",
                        supervisor.role
                    )));
                }
                next.supervisor_id = Some(supervisor_id);
            }
            Some(None) => next.supervisor_id = None,
            None => {}
        }

        // Promotion out of the manager tier detaches from the old supervisor.
        if !next.role.may_have_supervisor() {
            next.supervisor_id = None;
        }

        Ok(next)
    }
}

impl Entity for Manager {
    type Id = ManagerId;
    const KIND: &'static str = "manager";

    fn id(&self) -> ManagerId {
        self.id
    }
}
