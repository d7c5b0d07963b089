use serde_json::Value;

use super::error::QueryError;
use super::types::{validate_identifier, OrderInfo, SortDirection};

pub struct OrderClause;

impl OrderClause {
    /// Accepts `"created_at desc"`, `["created_at desc", "name"]`, or
    /// `{ "created_at": "desc", "name": "asc" }`.
    pub fn validate_and_parse(order: &Value) -> Result<Vec<OrderInfo>, QueryError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s)?,
            Value::Array(arr) => {
                let mut out = Vec::new();
                for v in arr {
                    let Value::String(s) = v else {
                        return Err(QueryError::InvalidOperatorData(
                            "order array entries must be strings".to_string(),
                        ));
                    };
                    out.extend(Self::parse_order_string(s)?);
                }
                out
            }
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (column, dir) in obj {
                    let sort = match dir.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(OrderInfo { column: column.clone(), sort });
                }
                out
            }
            _ => Vec::new(),
        };

        for info in &infos {
            validate_identifier(&info.column, QueryError::InvalidColumn)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Result<Vec<OrderInfo>, QueryError> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(column) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                out.push(OrderInfo { column: column.to_string(), sort });
            }
        }
        Ok(out)
    }

    pub fn generate(infos: &[OrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> =
            infos.iter().map(|i| format!("\"{}\" {}", i.column, i.sort.to_sql())).collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
