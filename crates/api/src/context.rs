use growthwatch_auth::Principal;

/// Principal context for a request.
///
/// Inserted by the auth middleware after the session resolves; handlers take
/// it as an explicit parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
