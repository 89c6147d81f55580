//! GitHub App Authentication
//!
//! Builds the RS256 JWT that identifies the App to the GitHub API. The
//! header and claims are serialized and base64url-encoded here; only the
//! signature itself is delegated to `jsonwebtoken`.

use crate::error::{Result, SyncError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{crypto, Algorithm, EncodingKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// JWT header for RS256-signed App tokens
pub const JWT_HEADER: &str = r#"{"alg":"RS256","typ":"JWT"}"#;

/// Lifetime of an App JWT in seconds (GitHub's maximum)
pub const JWT_LIFETIME_SECS: i64 = 600;

/// JWT claims for GitHub App authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubAppClaims {
    /// Issued at time (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer (GitHub App ID)
    pub iss: String,
}

impl GitHubAppClaims {
    pub fn new(app_id: &str, issued_at: i64) -> Self {
        Self {
            iat: issued_at,
            exp: issued_at + JWT_LIFETIME_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Generate a JWT for GitHub App authentication
///
/// # Arguments
/// * `app_id` - The GitHub App ID
/// * `private_key_path` - Path to the private key in PEM format
///
/// # Returns
/// A JWT string valid for 10 minutes
pub fn generate_jwt(app_id: &str, private_key_path: &Path) -> Result<String> {
    let key_data = fs::read(private_key_path).map_err(|e| {
        SyncError::Signing(format!(
            "Failed to read private key {}: {}",
            private_key_path.display(),
            e
        ))
    })?;

    sign_jwt(app_id, &key_data, Utc::now().timestamp())
}

/// Sign a JWT with an explicit issue time
pub fn sign_jwt(app_id: &str, private_key_pem: &[u8], issued_at: i64) -> Result<String> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
        .map_err(|e| SyncError::Signing(format!("Failed to parse private key as RSA PEM: {}", e)))?;

    let claims = GitHubAppClaims::new(app_id, issued_at);
    let payload = serde_json::to_vec(&claims)
        .map_err(|e| SyncError::Signing(format!("Failed to serialize claims: {}", e)))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(JWT_HEADER),
        URL_SAFE_NO_PAD.encode(payload)
    );

    let signature = crypto::sign(signing_input.as_bytes(), &encoding_key, Algorithm::RS256)
        .map_err(|e| SyncError::Signing(format!("Failed to sign JWT: {}", e)))?;

    debug!(iss = %app_id, iat = claims.iat, exp = claims.exp, "Signed App JWT");

    Ok(format!("{}.{}", signing_input, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const TEST_KEY: &[u8] = include_bytes!("../tests/fixtures/test-app-key.pem");
    const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../tests/fixtures/test-app-key.pub.pem");

    fn segment(jwt: &str, index: usize) -> Vec<u8> {
        let part = jwt.split('.').nth(index).unwrap();
        URL_SAFE_NO_PAD.decode(part).unwrap()
    }

    #[test]
    fn test_exp_is_iat_plus_600() {
        for issued_at in [0, 1_700_000_000, 1_900_000_123] {
            let claims = GitHubAppClaims::new("42", issued_at);
            assert_eq!(claims.exp, claims.iat + 600);
        }

        let jwt = sign_jwt("42", TEST_KEY, 1_700_000_000).unwrap();
        let claims: GitHubAppClaims = serde_json::from_slice(&segment(&jwt, 1)).unwrap();
        assert_eq!(claims.iat, 1_700_000_000);
        assert_eq!(claims.exp, 1_700_000_600);
        assert_eq!(claims.iss, "42");
    }

    #[test]
    fn test_header_decodes_to_exact_json() {
        let jwt = sign_jwt("42", TEST_KEY, 1_700_000_000).unwrap();
        assert_eq!(jwt.split('.').count(), 3);
        assert_eq!(String::from_utf8(segment(&jwt, 0)).unwrap(), JWT_HEADER);
        assert!(!jwt.contains('='));
    }

    #[test]
    fn test_signature_verifies_with_public_key() {
        let now = Utc::now().timestamp();
        let jwt = sign_jwt("12345", TEST_KEY, now).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&["12345"]);
        let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).unwrap();

        let data = decode::<GitHubAppClaims>(&jwt, &key, &validation).unwrap();
        assert_eq!(data.claims, GitHubAppClaims::new("12345", now));
    }

    #[test]
    fn test_invalid_key_is_signing_error() {
        let invalid = include_bytes!("../tests/fixtures/invalid-key.pem");
        let err = sign_jwt("42", invalid, 0).unwrap_err();
        assert!(matches!(err, SyncError::Signing(_)));
    }

    #[test]
    fn test_unreadable_key_file_is_signing_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_jwt("42", &dir.path().join("missing.pem")).unwrap_err();
        assert!(matches!(err, SyncError::Signing(msg) if msg.contains("missing.pem")));
    }
}
