//! Infrastructure layer: entity storage, hierarchy lookups, credentials and
//! session resolution.

pub mod credentials;
pub mod hierarchy;
pub mod password;
pub mod session;
pub mod store;

pub use credentials::InMemoryCredentialStore;
pub use hierarchy::HierarchyResolver;
pub use session::StoreSessionStore;
pub use store::{EntityStore, InMemoryEntityStore, StoreError};
#[cfg(feature = "postgres")]
pub use store::postgres::{PostgresCredentialStore, PostgresEntityStore};
