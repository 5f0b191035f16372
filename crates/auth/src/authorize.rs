use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use growthwatch_core::ManagerId;

use crate::{Manager, ManagerChanges, Principal, Role};

/// Resource kinds governed by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Manager,
    Family,
    Child,
    GrowthRecord,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Manager,
        Resource::Family,
        Resource::Child,
        Resource::GrowthRecord,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Manager => "manager",
            Resource::Family => "family",
            Resource::Child => "child",
            Resource::GrowthRecord => "growth record",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Read,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The manager that (transitively) owns a resource, reduced to what scope
/// decisions need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub manager_id: ManagerId,
    pub supervisor_id: Option<ManagerId>,
}

impl Owner {
    pub fn of(manager: &Manager) -> Self {
        Self {
            manager_id: manager.id,
            supervisor_id: manager.supervisor_id,
        }
    }
}

/// Which owners' resources a principal may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Managers(BTreeSet<ManagerId>),
}

impl Scope {
    pub fn contains(&self, manager_id: ManagerId) -> bool {
        match self {
            Scope::All => true,
            Scope::Managers(ids) => ids.contains(&manager_id),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: a {role} may not {action} a {resource}")]
    RoleDenied {
        role: Role,
        resource: Resource,
        action: Action,
    },

    #[error("forbidden: this {resource} is outside your span of control")]
    OutOfScope { resource: Resource },

    #[error("forbidden: {0}")]
    Rule(&'static str),
}

// ─────────────────────────────────────────────────────────────────────────────
// Role matrix
// ─────────────────────────────────────────────────────────────────────────────

/// Role-level permission matrix, before any ownership check.
///
/// Manager creation is self-registration and never goes through a principal.
/// Children have no update path. Supervisors create families but never edit
/// them; bosses are read-only on families, children and growth records.
pub fn role_permits(role: Role, resource: Resource, action: Action) -> bool {
    use Action as A;
    use Resource as R;

    match (role, resource, action) {
        (_, R::Manager, A::Create) => false,
        (_, R::Child, A::Update) => false,
        (_, _, A::List | A::Read) => true,

        (Role::Boss, R::Manager, A::Update | A::Delete) => true,
        (Role::Boss, _, _) => false,

        (Role::Supervisor | Role::Manager, R::Manager, A::Update) => true,
        (Role::Supervisor | Role::Manager, R::Manager, _) => false,

        (Role::Supervisor, R::Family, A::Update) => false,
        (Role::Supervisor | Role::Manager, R::Family | R::Child | R::GrowthRecord, _) => true,
    }
}

/// Whether `owner`'s resources fall within `principal`'s span of control.
///
/// Supervisors reach only their direct subordinates (single level); they do
/// not reach resources they own themselves.
fn owner_in_scope(principal: &Principal, owner: &Owner) -> bool {
    match principal.role {
        Role::Boss => true,
        Role::Supervisor => owner.supervisor_id == Some(principal.id),
        Role::Manager => owner.manager_id == principal.id,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Family / Child / GrowthRecord
// ─────────────────────────────────────────────────────────────────────────────

/// Central decision for families, children and growth records.
///
/// `owner` is the owning manager of the target (for create: of the parent or
/// the requested owner). Pass `None` only for collection-level checks, whose
/// rows are then restricted with [`resource_scope`].
///
/// - No IO
/// - No panics
pub fn authorize(
    principal: &Principal,
    resource: Resource,
    action: Action,
    owner: Option<&Owner>,
) -> Result<(), AuthzError> {
    if !role_permits(principal.role, resource, action) {
        return Err(AuthzError::RoleDenied {
            role: principal.role,
            resource,
            action,
        });
    }

    match owner {
        Some(owner) if !owner_in_scope(principal, owner) => {
            Err(AuthzError::OutOfScope { resource })
        }
        _ => Ok(()),
    }
}

/// Row scope for family/child/growth-record listings.
pub fn resource_scope(
    principal: &Principal,
    subordinates: impl IntoIterator<Item = ManagerId>,
) -> Scope {
    match principal.role {
        Role::Boss => Scope::All,
        Role::Supervisor => Scope::Managers(subordinates.into_iter().collect()),
        Role::Manager => Scope::Managers(BTreeSet::from([principal.id])),
    }
}

/// Owner a new family gets when `principal` creates it.
///
/// Managers always own what they create; any requested owner is ignored.
/// Supervisors must name one (then checked by [`authorize`]).
pub fn family_owner_for(principal: &Principal, requested: Option<ManagerId>) -> Option<ManagerId> {
    match principal.role {
        Role::Manager => Some(principal.id),
        Role::Supervisor | Role::Boss => requested,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manager records
// ─────────────────────────────────────────────────────────────────────────────

/// Row scope for staff listings: supervisors also see themselves.
pub fn staff_scope(
    principal: &Principal,
    subordinates: impl IntoIterator<Item = ManagerId>,
) -> Scope {
    match principal.role {
        Role::Boss => Scope::All,
        Role::Supervisor => {
            let mut ids: BTreeSet<ManagerId> = subordinates.into_iter().collect();
            ids.insert(principal.id);
            Scope::Managers(ids)
        }
        Role::Manager => Scope::Managers(BTreeSet::from([principal.id])),
    }
}

pub fn authorize_manager_read(principal: &Principal, target: &Manager) -> Result<(), AuthzError> {
    let visible = match principal.role {
        Role::Boss => true,
        Role::Supervisor => {
            target.id == principal.id || target.supervisor_id == Some(principal.id)
        }
        Role::Manager => target.id == principal.id,
    };
    if visible {
        Ok(())
    } else {
        Err(AuthzError::OutOfScope {
            resource: Resource::Manager,
        })
    }
}

/// Who may list the subordinates of `supervisor_id`.
pub fn authorize_subordinate_listing(
    principal: &Principal,
    supervisor_id: ManagerId,
) -> Result<(), AuthzError> {
    match principal.role {
        Role::Boss => Ok(()),
        Role::Supervisor if supervisor_id == principal.id => Ok(()),
        Role::Supervisor => Err(AuthzError::OutOfScope {
            resource: Resource::Manager,
        }),
        Role::Manager => Err(AuthzError::RoleDenied {
            role: Role::Manager,
            resource: Resource::Manager,
            action: Action::List,
        }),
    }
}

/// Changes that survived filtering plus the names of dropped fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredChanges {
    pub changes: ManagerChanges,
    pub dropped: Vec<&'static str>,
}

/// Filter a manager edit down to what `principal` may change.
///
/// This is the one place that filters instead of rejecting: fields outside
/// the caller's rights are dropped and the remainder applies. Editing another
/// person's record without being boss is still rejected outright.
pub fn filter_manager_changes(
    principal: &Principal,
    target: &Manager,
    changes: ManagerChanges,
) -> Result<FilteredChanges, AuthzError> {
    let mut dropped = Vec::new();

    let keep_hierarchy = match principal.role {
        Role::Boss => target.id != principal.id,
        Role::Supervisor | Role::Manager => {
            if target.id != principal.id {
                return Err(AuthzError::OutOfScope {
                    resource: Resource::Manager,
                });
            }
            false
        }
    };

    let mut changes = changes;
    if !keep_hierarchy {
        if changes.role.take().is_some() {
            dropped.push("role");
        }
        if changes.supervisor_id.take().is_some() {
            dropped.push("supervisor_id");
        }
    }

    Ok(FilteredChanges { changes, dropped })
}

pub fn authorize_manager_delete(principal: &Principal, target: &Manager) -> Result<(), AuthzError> {
    if !role_permits(principal.role, Resource::Manager, Action::Delete) {
        return Err(AuthzError::RoleDenied {
            role: principal.role,
            resource: Resource::Manager,
            action: Action::Delete,
        });
    }
    if target.id == principal.id {
        return Err(AuthzError::Rule("you cannot delete your own account"));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Explanation of a family/child/growth-record decision, for logs and the
/// `/auth/me` capability listing.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub principal_id: ManagerId,
    pub role: Role,
    pub resource: Resource,
    pub action: Action,
    pub granted: bool,
    pub reason: String,
}

pub fn explain(
    principal: &Principal,
    resource: Resource,
    action: Action,
    owner: Option<&Owner>,
) -> AuthorizationExplanation {
    let (granted, reason) = match authorize(principal, resource, action, owner) {
        Ok(()) => {
            let reason = match (principal.role, owner) {
                (Role::Boss, _) => "boss has organisation-wide read access".to_string(),
                (_, None) => format!("a {} may {} {} records", principal.role, action, resource),
                (Role::Supervisor, Some(o)) => {
                    format!("owner {} reports to this supervisor", o.manager_id)
                }
                (Role::Manager, Some(_)) => "principal owns the resource".to_string(),
            };
            (true, reason)
        }
        Err(e) => (false, e.to_string()),
    };

    AuthorizationExplanation {
        principal_id: principal.id,
        role: principal.role,
        resource,
        action,
        granted,
        reason,
    }
}
