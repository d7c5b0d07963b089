use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::error::ApiError;
use crate::tenancy::{context, CompanyId};

/// Authenticated caller context extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub company_id: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            company_id: claims.company_id,
            role: claims.role,
        }
    }
}

/// Request-boundary interceptor: validates the caller's credential,
/// resolves their company, and runs the rest of the pipeline inside a
/// tenant scope. This is the only place a tenant scope is opened.
///
/// Failure ordering is a security property: a missing/invalid token (401)
/// or a credential without a company (400) short-circuits before any scope
/// exists, so no data operation in that request can be scoped at all.
/// Errors thrown by the handler propagate normally; the scope ends with the
/// request's call tree either way.
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers).map_err(ApiError::unauthorized)?;

    let claims = auth::verify_jwt(&token).map_err(|e| ApiError::unauthorized(e.to_string()))?;

    // Valid credential but structurally incomplete: distinct status so the
    // two failure classes are observable apart.
    if claims.company_id.trim().is_empty() {
        return Err(ApiError::bad_request("credential does not identify a company"));
    }

    let company = CompanyId::new(claims.company_id.clone());
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(context::scope(company, next.run(request)).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str =
        auth_header.to_str().map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Basic abc".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer  ".parse().unwrap());
        assert!(bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer tok123".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "tok123");
    }
}
