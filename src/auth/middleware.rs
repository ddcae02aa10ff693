use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};

use crate::auth::jwt;

/// Claims carried by a Kindred access token. `sub` is the user id every
/// notification route acts on behalf of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Extractor: a handler taking `Claims` only runs for requests with a valid
/// `Authorization: Bearer` token. The signing secret arrives through request
/// extensions, placed there by the router's `inject_jwt_secret` layer.
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;

        let secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        jwt::validate_access_token(&secret.0, token).map_err(|_| StatusCode::UNAUTHORIZED)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Signing secret as stored in request extensions for the Claims extractor.
#[derive(Clone)]
pub struct JwtSecret(pub Vec<u8>);
