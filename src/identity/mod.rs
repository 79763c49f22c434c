//! Central identity and session handling for gatehouse.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod issuer;
mod provider;
mod request_context;

pub use principal::Principal;
pub use issuer::{SessionClaims, SessionCredential, SessionIssuer};
pub use provider::{AuthProvider, ClaimsAuthProvider, GrantAllRoles, LoginRequest, LoginResponse, RolePolicy};
pub use request_context::RequestContext;
