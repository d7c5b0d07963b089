use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::tenancy::TenantOwned;

/// A tenant. The companies registry itself is global: it is how tenants are
/// looked up in the first place, so it carries no tenant column.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TenantOwned for Company {
    const TABLE: &'static str = "companies";
    const TENANT_COLUMN: Option<&'static str> = None;
}
