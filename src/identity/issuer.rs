use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::principal::Principal;

pub type SessionCredential = String;

/// Fixed scheme identifier carried as the credential prefix. Tokens from any
/// other scheme (or a future format revision) fail verification.
const SCHEME: &str = "gh1";

/// Claims payload carried inside a session credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

impl SessionClaims {
    pub fn new(principal: &Principal, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            name: principal.name.clone(),
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            iat: now,
            exp: now + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.exp
    }
}

/// Issues and verifies signed, stateless session credentials.
///
/// A credential is `gh1.<payload>.<sig>` where payload is the base64url
/// (no pad) JSON claims and sig is HMAC-SHA256 over the encoded payload.
/// Verification is stateless: the same credential reconstructs the same
/// principal until expiry, and there is no revocation list.
pub struct SessionIssuer {
    key: [u8; 32],
    pub ttl: Duration,
}

impl SessionIssuer {
    pub fn new(key: [u8; 32], ttl: Duration) -> Self {
        Self { key, ttl }
    }

    pub fn issue(&self, principal: &Principal) -> anyhow::Result<SessionCredential> {
        let claims = SessionClaims::new(principal, self.ttl);
        let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let sig = self.sign(payload.as_bytes());
        let sig_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(sig);
        Ok(format!("{}.{}.{}", SCHEME, payload, sig_b64))
    }

    /// Verify a credential and reconstruct its principal.
    ///
    /// Any failure (wrong scheme, malformed encoding, bad signature, expiry)
    /// yields `None`; the caller downgrades to anonymous.
    pub fn verify(&self, token: &str) -> Option<Principal> {
        let rest = token.strip_prefix(SCHEME)?.strip_prefix('.')?;
        let (payload, sig_b64) = rest.split_once('.')?;
        let sig = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(sig_b64).ok()?;
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).ok()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).ok()?;
        let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&raw).ok()?;
        if claims.is_expired() {
            return None;
        }
        Some(Principal { name: claims.name, email: claims.email, roles: claims.roles })
    }

    fn sign(&self, data: &[u8]) -> [u8; 32] {
        // Hmac accepts any key length, so new_from_slice cannot fail here
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key).unwrap();
        mac.update(data);
        mac.finalize().into_bytes().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new([7u8; 32], Duration::minutes(20))
    }

    fn principal() -> Principal {
        Principal::from_claims(Some("bob"), "a@b.com", vec!["User".into(), "Admin".into()])
    }

    #[test]
    fn issue_then_verify_reconstructs_principal() {
        let iss = issuer();
        let token = iss.issue(&principal()).unwrap();
        assert!(token.starts_with("gh1."));
        let got = iss.verify(&token).expect("credential should verify");
        assert_eq!(got, principal());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let iss = issuer();
        let token = iss.issue(&principal()).unwrap();
        // Flip a character inside the payload segment
        let mut parts: Vec<String> = token.split('.').map(|s| s.to_string()).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");
        assert!(iss.verify(&tampered).is_none());
    }

    #[test]
    fn truncated_signature_is_rejected() {
        let iss = issuer();
        let token = iss.issue(&principal()).unwrap();
        let truncated = &token[..token.len() - 4];
        assert!(iss.verify(truncated).is_none());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = issuer().issue(&principal()).unwrap();
        let other = SessionIssuer::new([8u8; 32], Duration::minutes(20));
        assert!(other.verify(&token).is_none());
    }

    #[test]
    fn expired_credential_is_rejected() {
        let iss = SessionIssuer::new([7u8; 32], Duration::minutes(-1));
        let token = iss.issue(&principal()).unwrap();
        assert!(iss.verify(&token).is_none());
    }

    #[test]
    fn foreign_scheme_is_rejected() {
        let iss = issuer();
        let token = iss.issue(&principal()).unwrap();
        let renamed = token.replacen("gh1.", "xx9.", 1);
        assert!(iss.verify(&renamed).is_none());
        assert!(iss.verify("garbage").is_none());
        assert!(iss.verify("").is_none());
    }
}
