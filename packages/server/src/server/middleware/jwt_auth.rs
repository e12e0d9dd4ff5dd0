//! JWT authentication middleware for the Mutation API boundary.
//!
//! Spec §6: "JWT signing key and algorithm (consumed by the boundary, not
//! the core)". The core never inspects a token; it only ever receives a
//! plain `subject_id`/`is_admin` pair once this middleware has verified one.

use axum::{middleware::Next, response::Response};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// JWT claims this boundary expects. `sub` is the user id the core's
/// `UserDirectory`/`ReplanRequest` calls key off of.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iss: String,
}

/// Verifies bearer tokens against one signing secret/issuer pair.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    pub fn verify(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}

/// Authenticated caller identity, inserted into request extensions when a
/// bearer token verifies. Absent on unauthenticated requests — route
/// handlers that require a caller reject the request themselves.
#[derive(Clone, Debug)]
pub struct CallerContext {
    pub user_id: String,
    pub is_admin: bool,
}

pub async fn jwt_auth_middleware(
    verifier: Arc<JwtVerifier>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(caller) = extract_caller(&request, &verifier) {
        debug!(user_id = %caller.user_id, is_admin = caller.is_admin, "authenticated Mutation API caller");
        request.extensions_mut().insert(caller);
    } else {
        debug!("no valid bearer token on request");
    }
    next.run(request).await
}

fn extract_caller(
    request: &axum::http::Request<axum::body::Body>,
    verifier: &JwtVerifier,
) -> Option<CallerContext> {
    let header = request.headers().get("authorization")?;
    let raw = header.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    let claims = verifier.verify(token)?;
    Some(CallerContext {
        user_id: claims.sub,
        is_admin: claims.is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(verifier_secret: &str, issuer: &str, sub: &str, is_admin: bool, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            is_admin,
            exp,
            iss: issuer.to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(verifier_secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn verifies_a_well_formed_token() {
        let verifier = JwtVerifier::new("secret", "helpers-core".to_string());
        let tok = token("secret", "helpers-core", "u1", true, far_future());
        let claims = verifier.verify(&tok).unwrap();
        assert_eq!(claims.sub, "u1");
        assert!(claims.is_admin);
    }

    #[test]
    fn rejects_wrong_secret() {
        let verifier = JwtVerifier::new("secret", "helpers-core".to_string());
        let tok = token("other-secret", "helpers-core", "u1", false, far_future());
        assert!(verifier.verify(&tok).is_none());
    }

    #[test]
    fn rejects_wrong_issuer() {
        let verifier = JwtVerifier::new("secret", "helpers-core".to_string());
        let tok = token("secret", "someone-else", "u1", false, far_future());
        assert!(verifier.verify(&tok).is_none());
    }

    #[test]
    fn extract_caller_handles_missing_header() {
        let verifier = JwtVerifier::new("secret", "helpers-core".to_string());
        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(extract_caller(&request, &verifier).is_none());
    }

    #[test]
    fn extract_caller_accepts_bearer_prefix() {
        let verifier = JwtVerifier::new("secret", "helpers-core".to_string());
        let tok = token("secret", "helpers-core", "u2", false, far_future());
        let request = axum::http::Request::builder()
            .header("authorization", format!("Bearer {tok}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let caller = extract_caller(&request, &verifier).unwrap();
        assert_eq!(caller.user_id, "u2");
    }
}
