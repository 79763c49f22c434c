use super::Principal;

/// Per-request identity context built by the session gate and attached to
/// request extensions. Handlers receive this explicitly; there is no ambient
/// current-user lookup.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub request_id: String,
}

impl RequestContext {
    pub fn anonymous(request_id: String) -> Self {
        Self { principal: None, request_id }
    }

    pub fn authenticated(principal: Principal, request_id: String) -> Self {
        Self { principal: Some(principal), request_id }
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
