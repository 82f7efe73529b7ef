use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};

use crate::shared::config;

/// Middleware that requires valid JWT authentication
pub async fn require_auth(mut req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Check Bearer prefix
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let secret = match config::get() {
        Ok(cfg) => cfg.auth.jwt_secret.as_str(),
        Err(e) => {
            tracing::error!("Auth check without configuration: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let claims = super::jwt::validate_token(token, secret).map_err(|e| {
        tracing::debug!("Rejected token: {:#}", e);
        StatusCode::UNAUTHORIZED
    })?;

    // Add claims to request extensions for use in handlers
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
