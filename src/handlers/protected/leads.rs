use axum::extract::{Path, Query};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::models::Lead;
use crate::database::{Database, Record, Repository};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::query::{Aggregate, Pipeline, QueryData, Stage};
use crate::tenancy::TenantOwned;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub stage: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

async fn repo() -> Result<Repository<Lead>, crate::error::ApiError> {
    Ok(Repository::new(Database::pool().await?))
}

/// GET /api/leads
pub async fn list(Query(params): Query<ListParams>) -> ApiResult<Vec<Lead>> {
    let where_clause = params.stage.map(|s| json!({ "stage": s }));
    let data = QueryData {
        where_clause,
        order: Some(json!("created_at desc")),
        limit: params.limit.or(Some(100)),
        offset: params.offset,
        ..Default::default()
    };
    Ok(ApiResponse::success(repo().await?.select_any(data).await?))
}

/// GET /api/leads/:id
pub async fn get(Path(id): Path<Uuid>) -> ApiResult<Lead> {
    Ok(ApiResponse::success(repo().await?.select_by_id(id).await?))
}

/// POST /api/leads
pub async fn create(Json(payload): Json<Value>) -> ApiResult<Lead> {
    let mut record = Record::from_json(payload)?;
    record.validate_required_fields(&["name"])?;
    if record.get("stage").is_none() {
        record.set("stage", "new");
    }
    Ok(ApiResponse::created(repo().await?.insert(record).await?))
}

/// PUT /api/leads/:id
pub async fn update(Path(id): Path<Uuid>, Json(payload): Json<Value>) -> ApiResult<Lead> {
    let changes = Record::from_json(payload)?;
    Ok(ApiResponse::success(repo().await?.update_by_id(id, changes).await?))
}

/// DELETE /api/leads/:id
pub async fn remove(Path(id): Path<Uuid>) -> ApiResult<Value> {
    repo().await?.delete_by_id(id).await?;
    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// POST /api/leads/find - filtered search with a query body
pub async fn find(Json(data): Json<QueryData>) -> ApiResult<Vec<Lead>> {
    Ok(ApiResponse::success(repo().await?.select_any(data).await?))
}

#[derive(Debug, Serialize, FromRow)]
pub struct LeadStageStats {
    pub stage: String,
    pub leads: i64,
    pub total_value: Option<Decimal>,
}

/// POST /api/leads/stats - pipeline totals per stage. The stage list is
/// built server-side; the repository prepends the tenant match before the
/// group stage runs.
pub async fn stats() -> ApiResult<Vec<LeadStageStats>> {
    let pipeline = Pipeline::new(Lead::TABLE)?
        .stage(Stage::Group {
            by: vec!["stage".to_string()],
            aggregates: vec![Aggregate::count("leads"), Aggregate::sum("value", "total_value")],
        })
        .stage(Stage::Sort(json!("leads desc")));

    let rows = repo().await?.aggregate::<LeadStageStats>(pipeline).await?;
    Ok(ApiResponse::success(rows))
}
