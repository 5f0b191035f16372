//! `growthwatch-auth`: authentication/authorization boundary.
//!
//! The authorization engine in [`authorize`] is pure: callers resolve the
//! principal and the owning manager of a target, the engine decides. This crate
//! is decoupled from HTTP and storage; stores only appear as traits.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod manager;
pub mod principal;
pub mod roles;
pub mod session;

pub use authorize::{
    Action, AuthorizationExplanation, AuthzError, FilteredChanges, Owner, Resource, Scope,
    authorize, authorize_manager_delete, authorize_manager_read, authorize_subordinate_listing,
    explain, family_owner_for, filter_manager_changes, resource_scope, role_permits, staff_scope,
};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use credentials::{CredentialError, CredentialStore, validate_registration};
pub use manager::{HierarchyFacts, Manager, ManagerChanges};
pub use principal::Principal;
pub use roles::Role;
pub use session::{Hs256SessionCodec, SessionError, SessionStore, SessionValidator};
