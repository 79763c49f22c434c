use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::error::AppError;

use super::issuer::{SessionCredential, SessionIssuer};
use super::principal::Principal;

/// Claims posted by the login form. The user name is optional; the email is
/// the one required claim.
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub user_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub principal: Principal,
    pub credential: SessionCredential,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;
}

/// Derives the role labels granted to a principal at login.
///
/// Role derivation is deliberately a seam rather than a constant in the
/// login handler; swapping the policy changes what a session carries without
/// touching issuer or gate.
pub trait RolePolicy: Send + Sync {
    fn roles_for(&self, name: &str, email: &str) -> Vec<String>;
}

/// Default policy: every authenticated principal receives both the "User"
/// and "Admin" labels.
pub struct GrantAllRoles;

impl RolePolicy for GrantAllRoles {
    fn roles_for(&self, _name: &str, _email: &str) -> Vec<String> {
        vec!["User".to_string(), "Admin".to_string()]
    }
}

/// Provider that trusts the submitted claims: no credential verification
/// happens here, only claim validation and role derivation.
pub struct ClaimsAuthProvider {
    pub issuer: Arc<SessionIssuer>,
    pub policy: Arc<dyn RolePolicy>,
}

impl ClaimsAuthProvider {
    pub fn new(issuer: Arc<SessionIssuer>, policy: Arc<dyn RolePolicy>) -> Self {
        Self { issuer, policy }
    }
}

impl AuthProvider for ClaimsAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let email = req.email.trim();
        if email.is_empty() {
            return Err(AppError::user("email_required", "an email address is required to sign in").into());
        }
        let principal = Principal::from_claims(req.user_name.as_deref(), email, Vec::new());
        let roles = self.policy.roles_for(&principal.name, &principal.email);
        let principal = Principal { roles, ..principal };
        let credential = self.issuer.issue(&principal)?;
        info!(user = %principal.name, "auth.login issued session");
        Ok(LoginResponse { principal, credential })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn provider() -> ClaimsAuthProvider {
        let issuer = Arc::new(SessionIssuer::new([7u8; 32], Duration::minutes(20)));
        ClaimsAuthProvider::new(issuer, Arc::new(GrantAllRoles))
    }

    #[test]
    fn login_grants_policy_roles_and_verifiable_credential() {
        let p = provider();
        let resp = p
            .login(&LoginRequest { user_name: Some("bob".into()), email: "a@b.com".into() })
            .unwrap();
        assert_eq!(resp.principal.name, "bob");
        assert_eq!(resp.principal.email, "a@b.com");
        assert_eq!(resp.principal.roles, vec!["User".to_string(), "Admin".to_string()]);
        let got = p.issuer.verify(&resp.credential).expect("issued credential verifies");
        assert_eq!(got, resp.principal);
    }

    #[test]
    fn login_without_user_name_uses_email_as_display_name() {
        let p = provider();
        let resp = p.login(&LoginRequest { user_name: None, email: "a@b.com".into() }).unwrap();
        assert_eq!(resp.principal.name, "a@b.com");
    }

    #[test]
    fn login_without_email_is_rejected() {
        let p = provider();
        let err = p
            .login(&LoginRequest { user_name: Some("bob".into()), email: "   ".into() })
            .unwrap_err();
        let app = AppError::from(err);
        assert_eq!(app.http_status(), 400);
        assert_eq!(app.code_str(), "email_required");
    }

    struct ViewerOnly;
    impl RolePolicy for ViewerOnly {
        fn roles_for(&self, _name: &str, _email: &str) -> Vec<String> {
            vec!["Viewer".to_string()]
        }
    }

    #[test]
    fn role_policy_is_pluggable() {
        let issuer = Arc::new(SessionIssuer::new([7u8; 32], Duration::minutes(20)));
        let p = ClaimsAuthProvider::new(issuer, Arc::new(ViewerOnly));
        let resp = p.login(&LoginRequest { user_name: None, email: "a@b.com".into() }).unwrap();
        assert_eq!(resp.principal.roles, vec!["Viewer".to_string()]);
    }
}
