use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::QueryError;

/// Client-supplied description of a read operation: column projection,
/// filter criteria, ordering, paging. The tenant clause is never part of
/// this structure; it is injected by the scoping layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryData {
    pub select: Option<Vec<String>>,
    #[serde(rename = "where")]
    pub where_clause: Option<Value>,
    pub order: Option<Value>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Compiled SQL plus its positional parameters.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Validate a SQL identifier before it is quoted into generated SQL.
/// Alphanumerics and underscores only, must not start with a digit.
pub(crate) fn validate_identifier(name: &str, make_err: fn(String) -> QueryError) -> Result<(), QueryError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(make_err(name.to_string()))
    }
}
