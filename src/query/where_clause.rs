use serde_json::Value;

use super::error::QueryError;
use super::types::validate_identifier;

/// Compiles JSON filter criteria into a parameterized SQL predicate.
///
/// Top-level object keys combine with AND. Field values are either a scalar
/// (implicit equality) or an operator object like `{"$gte": 5}`. Logical
/// composition via `$and` / `$or` / `$not`.
pub struct WhereClause {
    params: Vec<Value>,
    start: usize,
}

impl WhereClause {
    /// Render `where_data` into a predicate whose placeholders begin at
    /// `$<starting_param_index + 1>`. Returns the predicate and the values
    /// to bind, in placeholder order.
    pub fn generate(
        where_data: &Value,
        starting_param_index: usize,
    ) -> Result<(String, Vec<Value>), QueryError> {
        let mut builder = Self { params: Vec::new(), start: starting_param_index };
        let sql = builder.render(where_data)?;
        Ok((sql, builder.params))
    }

    pub fn validate(where_data: &Value) -> Result<(), QueryError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(QueryError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn render(&mut self, data: &Value) -> Result<String, QueryError> {
        let Value::Object(map) = data else {
            return Err(QueryError::InvalidWhereClause("expected JSON object".to_string()));
        };

        let mut parts = Vec::new();
        for (key, value) in map {
            if key.starts_with('$') {
                parts.push(self.render_logical(key, value)?);
            } else {
                parts.push(self.render_field(key, value)?);
            }
        }

        if parts.is_empty() {
            Ok("1=1".to_string())
        } else {
            Ok(parts.join(" AND "))
        }
    }

    fn render_logical(&mut self, op: &str, value: &Value) -> Result<String, QueryError> {
        match op {
            "$and" | "$or" => {
                let arr = value.as_array().ok_or_else(|| {
                    QueryError::InvalidOperatorData(format!("{} requires an array", op))
                })?;
                if arr.is_empty() {
                    return Err(QueryError::InvalidOperatorData(format!(
                        "{} requires a non-empty array",
                        op
                    )));
                }
                let mut parts = Vec::new();
                for sub in arr {
                    parts.push(format!("({})", self.render(sub)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                // Outer parens so a $or never rebinds against sibling
                // conditions joined with AND.
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.render(value)?)),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }

    fn render_field(&mut self, column: &str, value: &Value) -> Result<String, QueryError> {
        validate_identifier(column, QueryError::InvalidColumn)?;

        if let Value::Object(ops) = value {
            let mut parts = Vec::new();
            for (op, operand) in ops {
                parts.push(self.render_op(column, op, operand)?);
            }
            if parts.is_empty() {
                return Err(QueryError::InvalidOperatorData(format!(
                    "empty operator object for column {}",
                    column
                )));
            }
            Ok(parts.join(" AND "))
        } else if value.is_null() {
            Ok(format!("\"{}\" IS NULL", column))
        } else {
            // Implicit equality: { field: value }
            Ok(format!("\"{}\" = {}", column, self.param(value.clone())))
        }
    }

    fn render_op(&mut self, column: &str, op: &str, operand: &Value) -> Result<String, QueryError> {
        let col = format!("\"{}\"", column);
        match op {
            "$eq" => {
                if operand.is_null() {
                    Ok(format!("{} IS NULL", col))
                } else {
                    Ok(format!("{} = {}", col, self.param(operand.clone())))
                }
            }
            "$ne" | "$neq" => {
                if operand.is_null() {
                    Ok(format!("{} IS NOT NULL", col))
                } else {
                    Ok(format!("{} <> {}", col, self.param(operand.clone())))
                }
            }
            "$gt" => Ok(format!("{} > {}", col, self.param(operand.clone()))),
            "$gte" => Ok(format!("{} >= {}", col, self.param(operand.clone()))),
            "$lt" => Ok(format!("{} < {}", col, self.param(operand.clone()))),
            "$lte" => Ok(format!("{} <= {}", col, self.param(operand.clone()))),
            "$like" => Ok(format!("{} LIKE {}", col, self.param(operand.clone()))),
            "$ilike" => Ok(format!("{} ILIKE {}", col, self.param(operand.clone()))),
            "$in" => self.render_in(&col, operand, false),
            "$nin" => self.render_in(&col, operand, true),
            "$between" => {
                let Value::Array(values) = operand else {
                    return Err(QueryError::InvalidOperatorData(
                        "$between requires an array of two values".to_string(),
                    ));
                };
                if values.len() != 2 {
                    return Err(QueryError::InvalidOperatorData(
                        "$between requires exactly two values".to_string(),
                    ));
                }
                Ok(format!(
                    "{} BETWEEN {} AND {}",
                    col,
                    self.param(values[0].clone()),
                    self.param(values[1].clone())
                ))
            }
            "$null" => match operand.as_bool() {
                Some(true) => Ok(format!("{} IS NULL", col)),
                Some(false) => Ok(format!("{} IS NOT NULL", col)),
                None => Err(QueryError::InvalidOperatorData("$null requires a boolean".to_string())),
            },
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }

    fn render_in(&mut self, col: &str, operand: &Value, negate: bool) -> Result<String, QueryError> {
        let Value::Array(values) = operand else {
            return Err(QueryError::InvalidOperatorData("$in/$nin require an array".to_string()));
        };
        if values.is_empty() {
            // Empty IN matches nothing; empty NOT IN matches everything.
            return Ok(if negate { "1=1".to_string() } else { "1=0".to_string() });
        }
        let placeholders: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
        let keyword = if negate { "NOT IN" } else { "IN" };
        Ok(format!("{} {} ({})", col, keyword, placeholders.join(", ")))
    }

    fn param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.start + self.params.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_combination() {
        let (sql, params) =
            WhereClause::generate(&json!({ "stage": "open", "name": "x" }), 0).unwrap();
        assert_eq!(sql, "\"name\" = $1 AND \"stage\" = $2");
        assert_eq!(params, vec![json!("x"), json!("open")]);
    }

    #[test]
    fn operator_object() {
        let (sql, params) =
            WhereClause::generate(&json!({ "value": { "$gte": 100, "$lt": 500 } }), 0).unwrap();
        assert_eq!(sql, "\"value\" >= $1 AND \"value\" < $2");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn starting_param_index_offsets_placeholders() {
        let (sql, _) = WhereClause::generate(&json!({ "stage": "open" }), 3).unwrap();
        assert_eq!(sql, "\"stage\" = $4");
    }

    #[test]
    fn logical_or() {
        let (sql, params) = WhereClause::generate(
            &json!({ "$or": [{ "stage": "open" }, { "stage": "won" }] }),
            0,
        )
        .unwrap();
        assert_eq!(sql, "((\"stage\" = $1) OR (\"stage\" = $2))");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = WhereClause::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn rejects_bad_column_names() {
        let err = WhereClause::generate(&json!({ "na\"me": 1 }), 0).unwrap_err();
        assert!(matches!(err, QueryError::InvalidColumn(_)));
    }

    #[test]
    fn null_means_is_null() {
        let (sql, params) = WhereClause::generate(&json!({ "deleted_at": null }), 0).unwrap();
        assert_eq!(sql, "\"deleted_at\" IS NULL");
        assert!(params.is_empty());
    }
}
