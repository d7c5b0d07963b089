#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid table name: {0}")]
    InvalidTableName(String),

    #[error("invalid column name: {0}")]
    InvalidColumn(String),

    #[error("invalid WHERE clause: {0}")]
    InvalidWhereClause(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("invalid operator data: {0}")]
    InvalidOperatorData(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid offset: {0}")]
    InvalidOffset(String),

    #[error("invalid pipeline stage: {0}")]
    InvalidStage(String),
}
