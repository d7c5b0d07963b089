use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::tenancy::TenantOwned;

/// A sales lead belonging to one company's pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub stage: String,
    pub value: Option<Decimal>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TenantOwned for Lead {
    const TABLE: &'static str = "leads";
    const TENANT_COLUMN: Option<&'static str> = Some("company_id");
}
