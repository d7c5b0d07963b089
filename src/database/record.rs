use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fields only the data layer may set. The tenant column is deliberately
/// not listed: it participates in the stamping rules in the repository.
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at", "deleted_at"];

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("system field '{0}' cannot be set via API input")]
    SystemFieldNotAllowed(String),

    #[error("invalid JSON format: {0}")]
    InvalidJson(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),
}

/// A dynamic write payload: the column/value map for one INSERT or UPDATE.
/// Ordered map so generated SQL is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from API input JSON, rejecting system fields.
    pub fn from_json(json: Value) -> Result<Self, RecordError> {
        let Value::Object(map) = json else {
            return Err(RecordError::InvalidJson("expected JSON object".to_string()));
        };

        let mut record = Self::new();
        for (key, value) in map {
            if SYSTEM_FIELDS.contains(&key.as_str()) {
                return Err(RecordError::SystemFieldNotAllowed(key));
            }
            record.fields.insert(key, value);
        }
        Ok(record)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Column names and values in stable (sorted) order.
    pub fn columns(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn values(&self) -> Vec<&Value> {
        self.fields.values().collect()
    }

    pub fn validate_required_fields(&self, fields: &[&str]) -> Result<(), RecordError> {
        for &field in fields {
            match self.get(field) {
                None | Some(Value::Null) => {
                    return Err(RecordError::MissingRequiredField(field.to_string()))
                }
                Some(_) => continue,
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self { fields: map.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_system_fields_from_api_input() {
        let err = Record::from_json(json!({ "id": "x", "name": "a" })).unwrap_err();
        assert!(matches!(err, RecordError::SystemFieldNotAllowed(f) if f == "id"));
    }

    #[test]
    fn company_id_is_not_a_system_field() {
        let record = Record::from_json(json!({ "company_id": "c-1", "name": "a" })).unwrap();
        assert_eq!(record.get("company_id"), Some(&json!("c-1")));
    }

    #[test]
    fn columns_are_sorted_for_stable_sql() {
        let record = Record::from_json(json!({ "b": 1, "a": 2, "c": 3 })).unwrap();
        assert_eq!(record.columns(), vec!["a", "b", "c"]);
    }

    #[test]
    fn required_field_validation() {
        let record = Record::from_json(json!({ "name": "a", "email": null })).unwrap();
        assert!(record.validate_required_fields(&["name"]).is_ok());
        assert!(record.validate_required_fields(&["email"]).is_err());
        assert!(record.validate_required_fields(&["missing"]).is_err());
    }
}
