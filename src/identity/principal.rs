use serde::{Deserialize, Serialize};

/// Identity asserted for a request. Built from claims on login; absent on
/// anonymous requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    /// Build a principal from submitted claims. The display name falls back
    /// to the email when no user name was given.
    pub fn from_claims(user_name: Option<&str>, email: &str, roles: Vec<String>) -> Self {
        let name = user_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(email);
        Self { name: name.to_string(), email: email.to_string(), roles }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
