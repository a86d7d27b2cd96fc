use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub const TEST_JWT_SECRET: &str = "clinic-test-secret-for-hs256-signatures";

/// Config whose JWT secret matches the tokens minted by [`JwtTestUtils`].
pub fn test_config() -> Arc<AppConfig> {
    Arc::new(AppConfig {
        supabase_url: "http://localhost:54321".to_string(),
        supabase_jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    })
}

/// A caller with a fresh id in one of the clinic roles.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub role: String,
}

impl TestUser {
    pub fn with_role(role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient() -> Self {
        Self::with_role("patient")
    }

    pub fn doctor() -> Self {
        Self::with_role("doctor")
    }

    pub fn admin() -> Self {
        Self::with_role("admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).expect("test user ids are uuids")
    }

    pub fn email(&self) -> String {
        format!("{}-{}@clinic.test", self.role, &self.id[..8])
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Valid,
    Expired,
    WrongSignature,
    /// Three segments that are not base64 JSON.
    Malformed,
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn mint(user: &TestUser, secret: &str, kind: TokenKind) -> String {
        let now = Utc::now();
        let exp = match kind {
            TokenKind::Expired => now - Duration::hours(1),
            _ => now + Duration::hours(1),
        };

        let claims = json!({
            "sub": user.id,
            "email": user.email(),
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        match kind {
            TokenKind::Malformed => "invalid.token.format".to_string(),
            TokenKind::WrongSignature => sign(&claims, "not-the-clinic-secret"),
            TokenKind::Valid | TokenKind::Expired => sign(&claims, secret),
        }
    }

    /// `Authorization` header value for `user` signed against `config`.
    pub fn header(user: &TestUser, config: &AppConfig, kind: TokenKind) -> String {
        format!("Bearer {}", Self::mint(user, &config.supabase_jwt_secret, kind))
    }

    pub fn bearer(user: &TestUser, config: &AppConfig) -> String {
        Self::header(user, config, TokenKind::Valid)
    }
}

fn sign(claims: &Value, secret: &str) -> String {
    let header = json!({ "alg": "HS256", "typ": "JWT" });
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    format!("{}.{}", signing_input, signature)
}
