use serde::Serialize;

use growthwatch_core::ManagerId;

use crate::{Manager, Role};

/// The authenticated actor of a request.
///
/// Resolved fresh from the store for every request and passed explicitly down
/// the call chain; never cached between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: ManagerId,
    pub name: String,
    pub role: Role,
    pub supervisor_id: Option<ManagerId>,
}

impl Principal {
    pub fn is_boss(&self) -> bool {
        self.role == Role::Boss
    }
}

impl From<&Manager> for Principal {
    fn from(manager: &Manager) -> Self {
        Self {
            id: manager.id,
            name: manager.name.clone(),
            role: manager.role,
            supervisor_id: manager.supervisor_id,
        }
    }
}

impl From<Manager> for Principal {
    fn from(manager: Manager) -> Self {
        Self {
            id: manager.id,
            name: manager.name,
            role: manager.role,
            supervisor_id: manager.supervisor_id,
        }
    }
}
