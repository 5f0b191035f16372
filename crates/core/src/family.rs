//! Family entity: the unit of ownership a manager is responsible for.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::{FamilyId, ManagerId};
use crate::validate::{MAX_NAME_LEN, optional_text, required_text};

/// Manager's compliance assessment of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    Red,
    Yellow,
    #[default]
    Green,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Red => "red",
            ComplianceStatus::Yellow => "yellow",
            ComplianceStatus::Green => "green",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "red" => Some(ComplianceStatus::Red),
            "yellow" => Some(ComplianceStatus::Yellow),
            "green" => Some(ComplianceStatus::Green),
            _ => None,
        }
    }
}

impl core::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A family owned by exactly one manager (role manager or supervisor).
///
/// # Invariants
/// - `manager_id` references an existing staff member that is not a boss.
/// - `manager_id` is fixed at creation; no update path changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub family_name: String,
    pub country: String,
    pub manager_id: ManagerId,
    pub compliance_status: ComplianceStatus,
    pub manager_notes: Option<String>,
}

/// Input for creating a family. The owner is decided by the caller's policy.
#[derive(Debug, Clone, Default)]
pub struct NewFamily {
    pub family_name: String,
    pub country: String,
    pub compliance_status: Option<ComplianceStatus>,
    pub manager_notes: Option<String>,
}

/// Field changes a manager may apply to one of their families.
///
/// Has no owner field; ownership is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct FamilyChanges {
    pub family_name: Option<String>,
    pub country: Option<String>,
    pub compliance_status: Option<ComplianceStatus>,
    /// `Some(None)` clears the notes.
    pub manager_notes: Option<Option<String>>,
}

impl Family {
    pub fn create(id: FamilyId, owner: ManagerId, input: NewFamily) -> DomainResult<Self> {
        Ok(Self {
            id,
            family_name: required_text("family_name", &input.family_name, MAX_NAME_LEN)?,
            country: required_text("country", &input.country, MAX_NAME_LEN)?,
            manager_id: owner,
            compliance_status: input.compliance_status.unwrap_or_default(),
            manager_notes: optional_text(input.manager_notes),
        })
    }

    /// Apply `changes`, returning the updated family. `self` is untouched on error.
    pub fn with_changes(&self, changes: FamilyChanges) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(name) = changes.family_name {
            next.family_name = required_text("family_name", &name, MAX_NAME_LEN)?;
        }
        if let Some(country) = changes.country {
            next.country = required_text("country", &country, MAX_NAME_LEN)?;
        }
        if let Some(status) = changes.compliance_status {
            next.compliance_status = status;
        }
        if let Some(notes) = changes.manager_notes {
            next.manager_notes = optional_text(notes);
        }
        Ok(next)
    }
}

impl Entity for Family {
    type Id = FamilyId;
    const KIND: &'static str = "family";

    fn id(&self) -> FamilyId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;

    fn input() -> NewFamily {
        NewFamily {
            family_name: " Okafor ".into(),
            country: "Nigeria".into(),
            compliance_status: None,
            manager_notes: Some("   ".into()),
        }
    }

    #[test]
    fn create_normalizes_fields_and_defaults_status() {
        let owner = ManagerId::new();
        let family = Family::create(FamilyId::new(), owner, input()).unwrap();
        assert_eq!(family.family_name, "Okafor");
        assert_eq!(family.manager_id, owner);
        assert_eq!(family.compliance_status, ComplianceStatus::Green);
        assert_eq!(family.manager_notes, None);
    }

    #[test]
    fn create_requires_country() {
        let mut bad = input();
        bad.country = String::new();
        let err = Family::create(FamilyId::new(), ManagerId::new(), bad).unwrap_err();
        assert_eq!(err, DomainError::validation("country is required"));
    }

    #[test]
    fn changes_keep_owner_and_can_clear_notes() {
        let owner = ManagerId::new();
        let mut family = Family::create(FamilyId::new(), owner, input()).unwrap();
        family.manager_notes = Some("follow up".into());

        let updated = family
            .with_changes(FamilyChanges {
                compliance_status: Some(ComplianceStatus::Red),
                manager_notes: Some(None),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.manager_id, owner);
        assert_eq!(updated.compliance_status, ComplianceStatus::Red);
        assert_eq!(updated.manager_notes, None);
        assert_eq!(updated.family_name, family.family_name);
    }

    #[test]
    fn compliance_status_parses_case_insensitively() {
        assert_eq!(ComplianceStatus::parse("YELLOW"), Some(ComplianceStatus::Yellow));
        assert_eq!(ComplianceStatus::parse("blue"), None);
        let json = serde_json::to_string(&ComplianceStatus::Red).unwrap();
        assert_eq!(json, "\"red\"");
    }
}
