use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::TenancyError;

/// Opaque identifier of the company (tenant) owning a slice of data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompanyId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CompanyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

tokio::task_local! {
    static CURRENT_COMPANY: CompanyId;
}

/// Run `fut` with `company_id` as the ambient tenant for its entire async
/// call tree. Any `current()` call made while the future runs, at any await
/// depth, observes this id. The scope ends when the future completes or is
/// dropped; there is nothing to tear down on cancellation.
pub async fn scope<F>(company_id: CompanyId, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_COMPANY.scope(company_id, fut).await
}

/// The ambient company id of the innermost enclosing `scope` call, or `None`
/// outside any scope (unauthenticated paths, system jobs).
pub fn current() -> Option<CompanyId> {
    CURRENT_COMPANY.try_with(|id| id.clone()).ok()
}

/// The ambient company id, or an error naming the entity the caller was
/// about to touch.
pub fn require(entity: &'static str) -> Result<CompanyId, TenancyError> {
    current().ok_or(TenancyError::MissingTenantScope(entity))
}
