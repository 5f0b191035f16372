//! Child entity. Children are immutable after creation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::{ChildId, FamilyId};
use crate::validate::{MAX_NAME_LEN, non_negative, not_in_future, required_text};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub name: String,
    pub birthday: NaiveDate,
    pub family_id: FamilyId,
    /// Bone age in years, when assessed.
    pub bone_age: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewChild {
    pub name: String,
    pub birthday: NaiveDate,
    pub family_id: FamilyId,
    pub bone_age: Option<f64>,
}

impl Child {
    pub fn create(id: ChildId, input: NewChild, today: NaiveDate) -> DomainResult<Self> {
        let bone_age = match input.bone_age {
            Some(v) => Some(non_negative("bone_age", v)?),
            None => None,
        };
        Ok(Self {
            id,
            name: required_text("name", &input.name, MAX_NAME_LEN)?,
            birthday: not_in_future("birthday", input.birthday, today)?,
            family_id: input.family_id,
            bone_age,
        })
    }
}

impl Entity for Child {
    type Id = ChildId;
    const KIND: &'static str = "child";

    fn id(&self) -> ChildId {
        self.id
    }
}
