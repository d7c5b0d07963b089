pub mod context;
pub mod entity;
pub mod scope;

pub use context::CompanyId;
pub use entity::TenantOwned;
pub use scope::{OperationKind, ScopeDecision, ScopeOverride, UnscopedPolicy};

/// Failures of the tenancy layer itself. Never retried; they surface as
/// request-terminating errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TenancyError {
    #[error("no tenant scope active for operation on company-owned entity '{0}'")]
    MissingTenantScope(&'static str),

    #[error("record for company-owned entity '{0}' carries no company id and none is in scope")]
    MissingTenantValue(&'static str),
}
