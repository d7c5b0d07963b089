use axum::Extension;
use serde_json::{json, Value};

use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::tenancy::context;

/// GET /api/auth/whoami - the caller's identity plus the ambient company id,
/// read back from the tenant context the middleware opened.
pub async fn whoami(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "user_id": auth_user.user_id,
        "email": auth_user.email,
        "role": auth_user.role,
        "company_id": context::current().map(|c| c.as_str().to_string()),
    })))
}
