use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::{self, Claims};
use crate::database::models::{Company, User};
use crate::database::{Database, Repository};
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::query::QueryData;
use crate::tenancy::ScopeOverride;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
    pub expires_in: i64,
}

/// POST /auth/login - authenticate and receive a JWT.
///
/// Runs before any tenant scope exists: the caller's company is unknown
/// until the account is found, so the users lookup goes through the
/// audited cross-company override.
pub async fn login(Json(body): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("email and password are required"));
    }

    let pool = Database::pool().await?;

    let users = Repository::<User>::new(pool.clone()).with_scope(ScopeOverride::AllCompanies);
    let user = users
        .select_one(QueryData {
            where_clause: Some(json!({ "email": body.email, "is_active": true })),
            ..Default::default()
        })
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !auth::verify_password(&body.password, &user.password_digest) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let company = Repository::<Company>::new(pool)
        .select_by_id(user.company_id)
        .await
        .map_err(|_| ApiError::forbidden("Company is not active"))?;
    if !company.is_active {
        return Err(ApiError::forbidden("Company is not active"));
    }

    let claims =
        Claims::new(user.id, user.email.clone(), user.company_id.to_string(), user.role.clone());
    let expires_in = claims.exp - claims.iat;
    let token = auth::generate_jwt(&claims).map_err(|e| {
        tracing::error!("failed to issue token: {}", e);
        ApiError::internal_server_error("Failed to issue token")
    })?;

    Ok(ApiResponse::success(LoginResponse { token, user, expires_in }))
}
