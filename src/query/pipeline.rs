use serde_json::{json, Value};

use super::error::QueryError;
use super::order::OrderClause;
use super::types::{validate_identifier, SqlQuery};
use super::where_clause::WhereClause;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    fn to_sql(self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    pub func: AggFunc,
    /// None means `COUNT(*)`.
    pub column: Option<String>,
    pub alias: String,
}

impl Aggregate {
    pub fn count(alias: impl Into<String>) -> Self {
        Self { func: AggFunc::Count, column: None, alias: alias.into() }
    }

    pub fn sum(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { func: AggFunc::Sum, column: Some(column.into()), alias: alias.into() }
    }

    pub fn avg(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { func: AggFunc::Avg, column: Some(column.into()), alias: alias.into() }
    }

    pub fn min(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { func: AggFunc::Min, column: Some(column.into()), alias: alias.into() }
    }

    pub fn max(column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self { func: AggFunc::Max, column: Some(column.into()), alias: alias.into() }
    }

    fn to_sql(&self) -> Result<String, QueryError> {
        validate_identifier(&self.alias, QueryError::InvalidColumn)?;
        let expr = match &self.column {
            Some(column) => {
                validate_identifier(column, QueryError::InvalidColumn)?;
                format!("{}(\"{}\")", self.func.to_sql(), column)
            }
            None => {
                if self.func != AggFunc::Count {
                    return Err(QueryError::InvalidStage(
                        "only COUNT may omit its column".to_string(),
                    ));
                }
                "COUNT(*)".to_string()
            }
        };
        Ok(format!("{} AS \"{}\"", expr, self.alias))
    }
}

/// One stage of an aggregation. Stages execute in order; the compiled SQL
/// nests each stage around the previous one so the order is preserved
/// exactly.
#[derive(Debug, Clone)]
pub enum Stage {
    Match(Value),
    Sort(Value),
    Limit(i64),
    Skip(i64),
    Group { by: Vec<String>, aggregates: Vec<Aggregate> },
}

impl Stage {
    pub fn kind(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Sort(_) => "sort",
            Stage::Limit(_) => "limit",
            Stage::Skip(_) => "skip",
            Stage::Group { .. } => "group",
        }
    }
}

/// A multi-stage aggregation over one table, compiled to nested subqueries.
pub struct Pipeline {
    table: String,
    stages: Vec<Stage>,
    tenant_scoped: bool,
}

impl Pipeline {
    pub fn new(table: impl Into<String>) -> Result<Self, QueryError> {
        let table = table.into();
        validate_identifier(&table, QueryError::InvalidTableName)?;
        Ok(Self { table, stages: Vec::new(), tenant_scoped: false })
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Insert a tenant match as the very first stage, before any
    /// caller-supplied stage, so later stages only ever see scoped rows.
    /// Idempotent: a second call is a no-op.
    pub fn prepend_match(&mut self, column: &str, company_id: &str) -> &mut Self {
        if self.tenant_scoped {
            return self;
        }
        self.stages.insert(0, Stage::Match(json!({ column: company_id })));
        self.tenant_scoped = true;
        self
    }

    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_scoped
    }

    /// Ordered stage kinds, e.g. `["match", "sort", "limit"]`.
    pub fn stage_kinds(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn to_sql(&self) -> Result<SqlQuery, QueryError> {
        let mut sql = format!("SELECT * FROM \"{}\" WHERE \"deleted_at\" IS NULL", self.table);
        let mut params: Vec<Value> = Vec::new();

        for (i, stage) in self.stages.iter().enumerate() {
            sql = match stage {
                Stage::Match(criteria) => {
                    let (predicate, more) = WhereClause::generate(criteria, params.len())?;
                    params.extend(more);
                    format!("SELECT * FROM ({}) AS s{} WHERE {}", sql, i, predicate)
                }
                Stage::Sort(spec) => {
                    let infos = OrderClause::validate_and_parse(spec)?;
                    if infos.is_empty() {
                        return Err(QueryError::InvalidStage("sort stage is empty".to_string()));
                    }
                    format!("SELECT * FROM ({}) AS s{} {}", sql, i, OrderClause::generate(&infos))
                }
                Stage::Limit(n) => {
                    if *n < 0 {
                        return Err(QueryError::InvalidLimit(
                            "limit must be non-negative".to_string(),
                        ));
                    }
                    format!("SELECT * FROM ({}) AS s{} LIMIT {}", sql, i, n)
                }
                Stage::Skip(n) => {
                    if *n < 0 {
                        return Err(QueryError::InvalidOffset(
                            "skip must be non-negative".to_string(),
                        ));
                    }
                    format!("SELECT * FROM ({}) AS s{} OFFSET {}", sql, i, n)
                }
                Stage::Group { by, aggregates } => {
                    if by.is_empty() && aggregates.is_empty() {
                        return Err(QueryError::InvalidStage("empty group stage".to_string()));
                    }
                    let mut select_parts = Vec::new();
                    for column in by {
                        validate_identifier(column, QueryError::InvalidColumn)?;
                        select_parts.push(format!("\"{}\"", column));
                    }
                    for aggregate in aggregates {
                        select_parts.push(aggregate.to_sql()?);
                    }
                    let group_by = if by.is_empty() {
                        String::new()
                    } else {
                        let cols: Vec<String> =
                            by.iter().map(|c| format!("\"{}\"", c)).collect();
                        format!(" GROUP BY {}", cols.join(", "))
                    };
                    format!(
                        "SELECT {} FROM ({}) AS s{}{}",
                        select_parts.join(", "),
                        sql,
                        i,
                        group_by
                    )
                }
            };
        }

        Ok(SqlQuery { sql, params })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_nest_in_declaration_order() {
        let pipeline = Pipeline::new("leads")
            .unwrap()
            .stage(Stage::Match(json!({ "stage": "open" })))
            .stage(Stage::Sort(json!("value desc")))
            .stage(Stage::Limit(5));
        let sql = pipeline.to_sql().unwrap().sql;

        // The match is innermost, the limit outermost.
        let match_pos = sql.find("\"stage\" = $1").unwrap();
        let sort_pos = sql.find("ORDER BY").unwrap();
        let limit_pos = sql.find("LIMIT 5").unwrap();
        assert!(match_pos < sort_pos && sort_pos < limit_pos);
    }

    #[test]
    fn prepend_match_is_first_and_idempotent() {
        let mut pipeline =
            Pipeline::new("leads").unwrap().stage(Stage::Sort(json!("value desc")));
        pipeline.prepend_match("company_id", "c-1");
        pipeline.prepend_match("company_id", "c-1");
        assert_eq!(pipeline.stage_kinds(), vec!["match", "sort"]);
        let sql = pipeline.to_sql().unwrap();
        assert_eq!(sql.params, vec![json!("c-1")]);
    }

    #[test]
    fn group_stage_compiles_aggregates() {
        let pipeline = Pipeline::new("leads").unwrap().stage(Stage::Group {
            by: vec!["stage".to_string()],
            aggregates: vec![Aggregate::count("leads"), Aggregate::sum("value", "total_value")],
        });
        let sql = pipeline.to_sql().unwrap().sql;
        assert!(sql.contains("COUNT(*) AS \"leads\""));
        assert!(sql.contains("SUM(\"value\") AS \"total_value\""));
        assert!(sql.ends_with("GROUP BY \"stage\""));
    }

    #[test]
    fn base_query_excludes_soft_deleted_rows() {
        let sql = Pipeline::new("leads").unwrap().to_sql().unwrap().sql;
        assert_eq!(sql, "SELECT * FROM \"leads\" WHERE \"deleted_at\" IS NULL");
    }
}
