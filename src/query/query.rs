use serde_json::Value;

use super::error::QueryError;
use super::order::OrderClause;
use super::types::{validate_identifier, OrderInfo, QueryData, SqlQuery};
use super::where_clause::WhereClause;

/// A pending read/count/update/delete operation against one table.
///
/// Caller criteria live in `where_data`; the tenant clause is held in a
/// separate slot so injection is idempotent and never rewrites what the
/// caller asked for. When present it is emitted first and AND-combined.
pub struct Query {
    table: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    tenant_clause: Option<(String, String)>,
    order_data: Vec<OrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    include_deleted: bool,
}

impl Query {
    pub fn new(table: impl Into<String>) -> Result<Self, QueryError> {
        let table = table.into();
        validate_identifier(&table, QueryError::InvalidTableName)?;
        Ok(Self {
            table,
            select_columns: vec![],
            where_data: None,
            tenant_clause: None,
            order_data: vec![],
            limit: None,
            offset: None,
            include_deleted: false,
        })
    }

    pub fn assign(&mut self, data: QueryData) -> Result<&mut Self, QueryError> {
        if let Some(select) = data.select {
            self.select(select)?;
        }
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit, data.offset)?;
        }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, QueryError> {
        for column in &columns {
            if column == "*" {
                continue;
            }
            validate_identifier(column, QueryError::InvalidColumn)?;
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, QueryError> {
        WhereClause::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, QueryError> {
        self.order_data = OrderClause::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, QueryError> {
        if limit < 0 {
            return Err(QueryError::InvalidLimit("limit must be non-negative".to_string()));
        }
        if let Some(off) = offset {
            if off < 0 {
                return Err(QueryError::InvalidOffset("offset must be non-negative".to_string()));
            }
        }

        let max_limit = crate::config::config().query.max_limit.unwrap_or(i64::MAX);
        let applied = if limit > max_limit {
            tracing::warn!(limit, max_limit, "limit exceeds maximum, capping");
            max_limit
        } else {
            limit
        };

        self.limit = Some(applied);
        self.offset = offset;
        Ok(self)
    }

    /// Include soft-deleted rows. Off by default.
    pub fn include_deleted(&mut self) -> &mut Self {
        self.include_deleted = true;
        self
    }

    pub fn where_data(&self) -> Option<&Value> {
        self.where_data.as_ref()
    }

    /// Pin this operation to one company. Idempotent: a second call replaces
    /// the clause, it never duplicates it.
    pub fn tenant_eq(&mut self, column: &str, company_id: &str) -> &mut Self {
        self.tenant_clause = Some((column.to_string(), company_id.to_string()));
        self
    }

    pub fn has_tenant_clause(&self) -> bool {
        self.tenant_clause.is_some()
    }

    fn where_parts(&self, starting_param_index: usize) -> Result<(Vec<String>, Vec<Value>), QueryError> {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some((column, id)) = &self.tenant_clause {
            params.push(Value::String(id.clone()));
            conditions.push(format!("\"{}\" = ${}", column, starting_param_index + params.len()));
        }
        if !self.include_deleted {
            conditions.push("\"deleted_at\" IS NULL".to_string());
        }
        if let Some(where_data) = &self.where_data {
            let (sql, more) =
                WhereClause::generate(where_data, starting_param_index + params.len())?;
            if sql != "1=1" {
                conditions.push(format!("({})", sql));
            }
            params.extend(more);
        }

        Ok((conditions, params))
    }

    pub fn to_sql(&self) -> Result<SqlQuery, QueryError> {
        let (conditions, params) = self.where_parts(0)?;

        let sql = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table),
            if conditions.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", conditions.join(" AND "))
            },
            OrderClause::generate(&self.order_data),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlQuery { sql, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlQuery, QueryError> {
        let (conditions, params) = self.where_parts(0)?;
        let sql = if conditions.is_empty() {
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table)
        } else {
            format!(
                "SELECT COUNT(*) AS count FROM \"{}\" WHERE {}",
                self.table,
                conditions.join(" AND ")
            )
        };
        Ok(SqlQuery { sql, params })
    }

    /// Predicate only, with placeholders starting after
    /// `starting_param_index` already-bound values. Used by UPDATE/DELETE
    /// assembly where SET parameters come first.
    pub fn to_where_sql(&self, starting_param_index: usize) -> Result<SqlQuery, QueryError> {
        let (conditions, params) = self.where_parts(starting_param_index)?;
        let sql =
            if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") };
        Ok(SqlQuery { sql, params })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_select_excludes_deleted() {
        let q = Query::new("employees").unwrap();
        let sql = q.to_sql().unwrap();
        assert_eq!(sql.sql, "SELECT * FROM \"employees\" WHERE \"deleted_at\" IS NULL");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn tenant_clause_comes_first_and_combines_with_caller_filter() {
        let mut q = Query::new("leads").unwrap();
        q.where_clause(json!({ "stage": "open" })).unwrap();
        q.tenant_eq("company_id", "c-1");
        let sql = q.to_sql().unwrap();
        assert_eq!(
            sql.sql,
            "SELECT * FROM \"leads\" WHERE \"company_id\" = $1 AND \"deleted_at\" IS NULL AND (\"stage\" = $2)"
        );
        assert_eq!(sql.params, vec![json!("c-1"), json!("open")]);
    }

    #[test]
    fn tenant_eq_is_idempotent() {
        let mut q = Query::new("leads").unwrap();
        q.tenant_eq("company_id", "c-1");
        q.tenant_eq("company_id", "c-1");
        let sql = q.to_sql().unwrap();
        assert_eq!(sql.sql.matches("company_id").count(), 1);
        assert_eq!(sql.params.len(), 1);
    }

    #[test]
    fn count_sql_carries_same_predicate() {
        let mut q = Query::new("leads").unwrap();
        q.tenant_eq("company_id", "c-1");
        let sql = q.to_count_sql().unwrap();
        assert_eq!(
            sql.sql,
            "SELECT COUNT(*) AS count FROM \"leads\" WHERE \"company_id\" = $1 AND \"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn where_sql_offsets_placeholders_for_update() {
        let mut q = Query::new("leads").unwrap();
        q.where_clause(json!({ "stage": "open" })).unwrap();
        q.tenant_eq("company_id", "c-1");
        let sql = q.to_where_sql(2).unwrap();
        assert_eq!(sql.sql, "\"company_id\" = $3 AND \"deleted_at\" IS NULL AND (\"stage\" = $4)");
    }

    #[test]
    fn rejects_invalid_table() {
        assert!(Query::new("bad table").is_err());
        assert!(Query::new("1users").is_err());
    }
}
