use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::Employee;
use crate::database::{Database, Record, Repository};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::query::QueryData;

// Handlers never restate the company filter: the repository injects it from
// the ambient tenant scope the auth middleware opened.

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub department: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn repo() -> Result<Repository<Employee>, crate::error::ApiError> {
    Ok(Repository::new(Database::pool().await?))
}

/// GET /api/employees
pub async fn list(Query(params): Query<ListParams>) -> ApiResult<Vec<Employee>> {
    let where_clause = params.department.map(|d| json!({ "department": d }));
    let data = QueryData {
        where_clause,
        order: Some(json!("name asc")),
        limit: params.limit.or(Some(100)),
        offset: params.offset,
        ..Default::default()
    };
    Ok(ApiResponse::success(repo().await?.select_any(data).await?))
}

/// GET /api/employees/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Employee> {
    Ok(ApiResponse::success(repo().await?.select_by_id(id).await?))
}

/// POST /api/employees
pub async fn create(Json(payload): Json<Value>) -> ApiResult<Employee> {
    let record = Record::from_json(payload)?;
    record.validate_required_fields(&["name", "email"])?;
    Ok(ApiResponse::created(repo().await?.insert(record).await?))
}

/// PUT /api/employees/:id
pub async fn update(Path(id): Path<Uuid>, Json(payload): Json<Value>) -> ApiResult<Employee> {
    let changes = Record::from_json(payload)?;
    Ok(ApiResponse::success(repo().await?.update_by_id(id, changes).await?))
}

/// DELETE /api/employees/:id
pub async fn remove(Path(id): Path<Uuid>) -> ApiResult<Value> {
    repo().await?.delete_by_id(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// POST /api/employees/find - filtered search with a query body
pub async fn find(Json(data): Json<QueryData>) -> ApiResult<Vec<Employee>> {
    Ok(ApiResponse::success(repo().await?.select_any(data).await?))
}
