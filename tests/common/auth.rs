use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use quiz_backend::auth::Claims;

/// Tokens are minted by the external account service in production; tests
/// sign them directly with the app's configured secret.
pub fn sign_user_token(user_id: &str, secret: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        token_type: "user".to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(24)).timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("sign test token")
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
