//! Growth measurements taken for a child on a given date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::{ChildId, GrowthRecordId};
use crate::validate::positive_measure;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRecord {
    pub id: GrowthRecordId,
    pub child_id: ChildId,
    pub record_date: NaiveDate,
    /// Centimetres.
    pub height: f64,
    /// Kilograms.
    pub weight: f64,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct NewGrowthRecord {
    pub child_id: ChildId,
    pub record_date: NaiveDate,
    pub height: f64,
    pub weight: f64,
    pub notes: Option<String>,
}

/// Editable measurement fields. The owning child never changes.
#[derive(Debug, Clone, Default)]
pub struct GrowthRecordChanges {
    pub record_date: Option<NaiveDate>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

impl GrowthRecord {
    pub fn create(id: GrowthRecordId, input: NewGrowthRecord) -> DomainResult<Self> {
        Ok(Self {
            id,
            child_id: input.child_id,
            record_date: input.record_date,
            height: positive_measure("height", input.height)?,
            weight: positive_measure("weight", input.weight)?,
            notes: input.notes.unwrap_or_default(),
        })
    }

    pub fn with_changes(&self, changes: GrowthRecordChanges) -> DomainResult<Self> {
        let mut next = self.clone();
        if let Some(date) = changes.record_date {
            next.record_date = date;
        }
        if let Some(height) = changes.height {
            next.height = positive_measure("height", height)?;
        }
        if let Some(weight) = changes.weight {
            next.weight = positive_measure("weight", weight)?;
        }
        if let Some(notes) = changes.notes {
            next.notes = notes;
        }
        Ok(next)
    }
}

impl Entity for GrowthRecord {
    type Id = GrowthRecordId;
    const KIND: &'static str = "growth record";

    fn id(&self) -> GrowthRecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> GrowthRecord {
        GrowthRecord::create(
            GrowthRecordId::new(),
            NewGrowthRecord {
                child_id: ChildId::new(),
                record_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                height: 102.3,
                weight: 16.1,
                notes: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn notes_default_to_empty() {
        assert_eq!(record().notes, "");
    }

    #[test]
    fn invalid_change_leaves_record_untouched() {
        let original = record();
        let err = original.with_changes(GrowthRecordChanges {
            height: Some(110.0),
            weight: Some(0.0),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(original.height, 102.3);
    }
}
