//! Request/response DTOs and JSON mapping helpers.
//!
//! Field names are snake_case; ids are UUID strings; dates are ISO `YYYY-MM-DD`.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use growthwatch_auth::{AuthorizationExplanation, ManagerChanges, Principal, Role};
use growthwatch_core::{
    ChildId, ComplianceStatus, FamilyChanges, FamilyId, GrowthRecordChanges, ManagerId, NewChild,
    NewFamily, NewGrowthRecord,
};

use crate::app::errors::ServiceError;

/// Unwrap a JSON body, turning extractor rejections into `validation_error`.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

/// Parse a path segment into a typed id (400 `invalid_id` on failure).
pub fn parse_id<T>(raw: &str) -> Result<T, ServiceError>
where
    T: std::str::FromStr<Err = growthwatch_core::DomainError>,
{
    raw.parse::<T>().map_err(ServiceError::from)
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Auth
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub principal: Principal,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub principal: Principal,
    pub permissions: Vec<AuthorizationExplanation>,
}

// -------------------------
// Managers
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct UpdateManagerRequest {
    pub name: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "double_option")]
    pub supervisor_id: Option<Option<ManagerId>>,
}

impl From<UpdateManagerRequest> for ManagerChanges {
    fn from(req: UpdateManagerRequest) -> Self {
        ManagerChanges {
            name: req.name,
            role: req.role,
            supervisor_id: req.supervisor_id,
        }
    }
}

// -------------------------
// Families
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    pub family_name: String,
    pub country: String,
    /// Required for supervisors; ignored for managers.
    pub manager_id: Option<ManagerId>,
    pub compliance_status: Option<ComplianceStatus>,
    pub manager_notes: Option<String>,
}

impl CreateFamilyRequest {
    pub fn into_parts(self) -> (Option<ManagerId>, NewFamily) {
        (
            self.manager_id,
            NewFamily {
                family_name: self.family_name,
                country: self.country,
                compliance_status: self.compliance_status,
                manager_notes: self.manager_notes,
            },
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFamilyRequest {
    pub family_name: Option<String>,
    pub country: Option<String>,
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub manager_notes: Option<Option<String>>,
    /// Accepted for compatibility; ownership never changes through an update.
    pub manager_id: Option<ManagerId>,
}

impl UpdateFamilyRequest {
    pub fn into_parts(self) -> (Option<ManagerId>, FamilyChanges) {
        (
            self.manager_id,
            FamilyChanges {
                family_name: self.family_name,
                country: self.country,
                compliance_status: self.compliance_status,
                manager_notes: self.manager_notes,
            },
        )
    }
}

// -------------------------
// Children
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateChildRequest {
    pub name: String,
    pub birthday: NaiveDate,
    pub family_id: FamilyId,
    pub bone_age: Option<f64>,
}

impl From<CreateChildRequest> for NewChild {
    fn from(req: CreateChildRequest) -> Self {
        NewChild {
            name: req.name,
            birthday: req.birthday,
            family_id: req.family_id,
            bone_age: req.bone_age,
        }
    }
}

// -------------------------
// Growth records
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateGrowthRecordRequest {
    pub child_id: ChildId,
    pub record_date: NaiveDate,
    pub height: f64,
    pub weight: f64,
    pub notes: Option<String>,
}

impl From<CreateGrowthRecordRequest> for NewGrowthRecord {
    fn from(req: CreateGrowthRecordRequest) -> Self {
        NewGrowthRecord {
            child_id: req.child_id,
            record_date: req.record_date,
            height: req.height,
            weight: req.weight,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGrowthRecordRequest {
    pub record_date: Option<NaiveDate>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

impl From<UpdateGrowthRecordRequest> for GrowthRecordChanges {
    fn from(req: UpdateGrowthRecordRequest) -> Self {
        GrowthRecordChanges {
            record_date: req.record_date,
            height: req.height,
            weight: req.weight,
            notes: req.notes,
        }
    }
}
