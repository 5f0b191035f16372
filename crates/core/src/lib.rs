//! `growthwatch-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** types (no infrastructure concerns):
//! identifiers, the domain error model, and the family/child/growth-record
//! entities with their field validation.

pub mod child;
pub mod entity;
pub mod error;
pub mod family;
pub mod growth_record;
pub mod id;
pub mod validate;

pub use child::{Child, NewChild};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use family::{ComplianceStatus, Family, FamilyChanges, NewFamily};
pub use growth_record::{GrowthRecord, GrowthRecordChanges, NewGrowthRecord};
pub use id::{ChildId, FamilyId, GrowthRecordId, ManagerId};
