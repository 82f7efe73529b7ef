use anyhow::{Context, Result};
use contracts::system::auth::TokenClaims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

/// Проверить access-токен (HS256) и извлечь claims
pub fn validate_token(token: &str, secret: &str) -> Result<TokenClaims> {
    let token_data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .context("Failed to decode JWT token")?;

    Ok(token_data.claims)
}

#[cfg(test)]
pub(crate) fn issue_test_token(sub: &str, secret: &str, lifetime_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp();
    let claims = TokenClaims {
        sub: sub.to_string(),
        username: format!("{}-login", sub),
        is_admin: false,
        exp: (now + lifetime_secs) as usize,
        iat: now as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}
