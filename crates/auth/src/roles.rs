use serde::{Deserialize, Serialize};

/// Staff role. The hierarchy is boss (implicit root) → supervisor → manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Boss,
    Supervisor,
    Manager,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Boss, Role::Supervisor, Role::Manager];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Boss => "boss",
            Role::Supervisor => "supervisor",
            Role::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "boss" => Some(Role::Boss),
            "supervisor" => Some(Role::Supervisor),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    /// Only plain managers sit under a supervisor.
    pub fn may_have_supervisor(&self) -> bool {
        matches!(self, Role::Manager)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
