use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseError;
use crate::database::record::Record;
use crate::query::types::validate_identifier;
use crate::query::{Pipeline, Query, QueryData, QueryError};
use crate::tenancy::scope::{scope_pipeline, scope_query};
use crate::tenancy::{OperationKind, ScopeDecision, ScopeOverride, TenancyError, TenantOwned};

/// Data access for one entity type, and the single interception point where
/// tenant scoping is applied. Every operation resolves scope exactly once
/// before touching the database; route handlers never restate the tenant
/// filter. Installed statically per entity type; per-request state lives in
/// the ambient tenant context, never here.
pub struct Repository<T> {
    pool: PgPool,
    scope_override: Option<ScopeOverride>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: TenantOwned + for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    pub fn new(pool: PgPool) -> Self {
        Self { pool, scope_override: None, _phantom: std::marker::PhantomData }
    }

    /// Attach the audited escape hatch to this repository's operations.
    /// For provisioning and system jobs only; every use is logged.
    pub fn with_scope(mut self, scope_override: ScopeOverride) -> Self {
        self.scope_override = Some(scope_override);
        self
    }

    fn scoped_query(&self, data: QueryData, kind: OperationKind) -> Result<Query, DatabaseError> {
        let mut query =
            Query::new(T::TABLE).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        query.assign(data).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        scope_query::<T>(
            &mut query,
            self.scope_override.as_ref(),
            kind,
            config::config().tenancy.unscoped_policy,
        )?;
        Ok(query)
    }

    pub async fn select_any(&self, data: QueryData) -> Result<Vec<T>, DatabaseError> {
        let query = self.scoped_query(data, OperationKind::Select)?;
        let sql = query.to_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let mut stmt = sqlx::query_as::<_, T>(&sql.sql);
        for param in &sql.params {
            stmt = bind_value_as(stmt, param);
        }
        Ok(stmt.fetch_all(&self.pool).await?)
    }

    pub async fn select_one(&self, data: QueryData) -> Result<Option<T>, DatabaseError> {
        let query = self.scoped_query(data, OperationKind::Select)?;
        let sql = query.to_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let mut stmt = sqlx::query_as::<_, T>(&sql.sql);
        for param in &sql.params {
            stmt = bind_value_as(stmt, param);
        }
        Ok(stmt.fetch_optional(&self.pool).await?)
    }

    pub async fn select_404(&self, data: QueryData) -> Result<T, DatabaseError> {
        match self.select_one(data).await? {
            Some(row) => Ok(row),
            None => Err(DatabaseError::NotFound("Record not found".to_string())),
        }
    }

    pub async fn select_by_id(&self, id: Uuid) -> Result<T, DatabaseError> {
        let data = QueryData {
            where_clause: Some(serde_json::json!({ "id": id.to_string() })),
            ..Default::default()
        };
        self.select_404(data).await
    }

    pub async fn count(&self, data: QueryData) -> Result<i64, DatabaseError> {
        let query = self.scoped_query(data, OperationKind::Count)?;
        let sql = query.to_count_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let mut stmt = sqlx::query(&sql.sql);
        for param in &sql.params {
            stmt = bind_value(stmt, param);
        }
        let row = stmt.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    /// Execute a multi-stage aggregation. For company-owned entities the
    /// tenant match is prepended as the first stage, so every later stage
    /// only sees scoped rows.
    pub async fn aggregate<R>(&self, mut pipeline: Pipeline) -> Result<Vec<R>, DatabaseError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        scope_pipeline::<T>(
            &mut pipeline,
            self.scope_override.as_ref(),
            config::config().tenancy.unscoped_policy,
        )?;
        let sql = pipeline.to_sql().map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        let mut stmt = sqlx::query_as::<_, R>(&sql.sql);
        for param in &sql.params {
            stmt = bind_value_as(stmt, param);
        }
        Ok(stmt.fetch_all(&self.pool).await?)
    }

    /// Insert one record. For company-owned entities the tenant column is
    /// stamped from the ambient scope (or the override) when the payload
    /// does not set it; an explicit payload value that differs from the
    /// ambient id wins and is logged by the injector.
    pub async fn insert(&self, mut record: Record) -> Result<T, DatabaseError> {
        let decision = crate::tenancy::scope::resolve(
            config::config().tenancy.unscoped_policy,
            T::TABLE,
            T::TENANT_COLUMN,
            self.scope_override.as_ref(),
            Some(&record.to_json()),
            OperationKind::Insert,
        )?;
        match decision {
            ScopeDecision::Inject { column, company } => {
                record.set(column, Value::String(company.as_str().to_string()));
            }
            ScopeDecision::LeaveUnscoped => {
                if let Some(column) = T::TENANT_COLUMN {
                    if record.get(column).map_or(true, Value::is_null) {
                        return Err(TenancyError::MissingTenantValue(T::TABLE).into());
                    }
                }
            }
        }

        if record.is_empty() {
            return Err(DatabaseError::QueryError("empty insert payload".to_string()));
        }
        for column in record.columns() {
            validate_identifier(column, QueryError::InvalidColumn)
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        }

        let columns: Vec<String> =
            record.columns().iter().map(|c| format!("\"{}\"", c)).collect();
        let placeholders: Vec<String> =
            (1..=record.len()).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            T::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut stmt = sqlx::query_as::<_, T>(&sql);
        for value in record.values() {
            stmt = bind_value_as(stmt, value);
        }
        Ok(stmt.fetch_one(&self.pool).await?)
    }

    /// Update all records matched by `data`. The predicate goes through the
    /// same scope injection as reads; the tenant column itself cannot be
    /// modified.
    pub async fn update_any(&self, data: QueryData, changes: Record) -> Result<Vec<T>, DatabaseError> {
        if changes.is_empty() {
            return Err(DatabaseError::QueryError("empty update payload".to_string()));
        }
        if let Some(column) = T::TENANT_COLUMN {
            if changes.get(column).is_some() {
                return Err(DatabaseError::QueryError(format!(
                    "column '{}' cannot be modified",
                    column
                )));
            }
        }
        for column in changes.columns() {
            validate_identifier(column, QueryError::InvalidColumn)
                .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        }

        let query = self.scoped_query(data, OperationKind::Update)?;
        let where_sql = query
            .to_where_sql(changes.len())
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let assignments: Vec<String> = changes
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| format!("\"{}\" = ${}", c, i + 1))
            .collect();
        let sql = format!(
            "UPDATE \"{}\" SET {}, \"updated_at\" = now() WHERE {} RETURNING *",
            T::TABLE,
            assignments.join(", "),
            where_sql.sql
        );

        let mut stmt = sqlx::query_as::<_, T>(&sql);
        for value in changes.values() {
            stmt = bind_value_as(stmt, value);
        }
        for param in &where_sql.params {
            stmt = bind_value_as(stmt, param);
        }
        Ok(stmt.fetch_all(&self.pool).await?)
    }

    pub async fn update_by_id(&self, id: Uuid, changes: Record) -> Result<T, DatabaseError> {
        let data = QueryData {
            where_clause: Some(serde_json::json!({ "id": id.to_string() })),
            ..Default::default()
        };
        let mut rows = self.update_any(data, changes).await?;
        rows.pop().ok_or_else(|| DatabaseError::NotFound("Record not found".to_string()))
    }

    /// Soft-delete all records matched by `data`; returns how many rows
    /// were affected. Already-deleted rows are never matched.
    pub async fn delete_any(&self, data: QueryData) -> Result<u64, DatabaseError> {
        let query = self.scoped_query(data, OperationKind::Delete)?;
        let where_sql =
            query.to_where_sql(0).map_err(|e| DatabaseError::QueryError(e.to_string()))?;

        let sql = format!(
            "UPDATE \"{}\" SET \"deleted_at\" = now(), \"updated_at\" = now() WHERE {}",
            T::TABLE,
            where_sql.sql
        );

        let mut stmt = sqlx::query(&sql);
        for param in &where_sql.params {
            stmt = bind_value(stmt, param);
        }
        let result = stmt.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), DatabaseError> {
        let data = QueryData {
            where_clause: Some(serde_json::json!({ "id": id.to_string() })),
            ..Default::default()
        };
        match self.delete_any(data).await? {
            0 => Err(DatabaseError::NotFound("Record not found".to_string())),
            _ => Ok(()),
        }
    }
}

fn bind_value<'q>(
    stmt: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match value {
        Value::Null => {
            let none: Option<String> = None;
            stmt.bind(none)
        }
        Value::Bool(b) => stmt.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                stmt.bind(i)
            } else if let Some(f) = n.as_f64() {
                stmt.bind(f)
            } else {
                stmt.bind(n.to_string())
            }
        }
        // Uuid-shaped strings bind as uuid so they compare against uuid columns
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(uuid) => stmt.bind(uuid),
            Err(_) => stmt.bind(s),
        },
        Value::Array(_) | Value::Object(_) => stmt.bind(value.clone()), // JSONB
    }
}

fn bind_value_as<'q, O>(
    stmt: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    value: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match value {
        Value::Null => {
            let none: Option<String> = None;
            stmt.bind(none)
        }
        Value::Bool(b) => stmt.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                stmt.bind(i)
            } else if let Some(f) = n.as_f64() {
                stmt.bind(f)
            } else {
                stmt.bind(n.to_string())
            }
        }
        Value::String(s) => match Uuid::parse_str(s) {
            Ok(uuid) => stmt.bind(uuid),
            Err(_) => stmt.bind(s),
        },
        Value::Array(_) | Value::Object(_) => stmt.bind(value.clone()),
    }
}
