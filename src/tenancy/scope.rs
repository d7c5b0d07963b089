use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::query::{Pipeline, Query};

use super::context::{self, CompanyId};
use super::entity::TenantOwned;
use super::TenancyError;

/// Policy for a data operation on a company-owned entity when no ambient
/// tenant is active and no override was given. `Reject` is the safe default;
/// `Allow` reproduces the permissive behavior of letting the operation run
/// unscoped, with a warning per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnscopedPolicy {
    Reject,
    Allow,
}

/// Explicit, audited escape hatch for one pending operation. Attached via
/// `Repository::with_scope`; never expressible through request filter input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeOverride {
    /// Scope to this company instead of the ambient one.
    Company(CompanyId),
    /// Deliberately cross-tenant (provisioning, system jobs).
    AllCompanies,
}

/// Operation kinds the injector is consulted for. Used for audit logs and
/// error context; the decision logic itself is shared across all kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Select,
    Count,
    Aggregate,
    Insert,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Select => "select",
            OperationKind::Count => "count",
            OperationKind::Aggregate => "aggregate",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Outcome of scope resolution for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeDecision {
    Inject {
        column: &'static str,
        company: CompanyId,
    },
    LeaveUnscoped,
}

/// Decide whether and how one pending operation gets a tenant filter.
///
/// Precedence, highest first: explicit override (audited), explicit tenant
/// column in the caller's filter criteria, ambient scope, policy fallback.
pub fn resolve(
    policy: UnscopedPolicy,
    entity: &'static str,
    tenant_column: Option<&'static str>,
    scope_override: Option<&ScopeOverride>,
    caller_filter: Option<&Value>,
    kind: OperationKind,
) -> Result<ScopeDecision, TenancyError> {
    let Some(column) = tenant_column else {
        return Ok(ScopeDecision::LeaveUnscoped);
    };

    if let Some(override_) = scope_override {
        match override_ {
            ScopeOverride::Company(company) => {
                warn!(
                    entity,
                    operation = kind.as_str(),
                    company = %company,
                    ambient = ?context::current(),
                    "tenant scope override in effect"
                );
                return Ok(ScopeDecision::Inject { column, company: company.clone() });
            }
            ScopeOverride::AllCompanies => {
                warn!(
                    entity,
                    operation = kind.as_str(),
                    "cross-tenant operation: scoping bypassed by override"
                );
                return Ok(ScopeDecision::LeaveUnscoped);
            }
        }
    }

    // An explicit tenant filter in the caller's criteria wins over injection.
    if let Some(Value::Object(map)) = caller_filter {
        if let Some(explicit) = map.get(column) {
            if let Some(ambient) = context::current() {
                let same = explicit.as_str().map(|s| s == ambient.as_str()).unwrap_or(false);
                if !same {
                    warn!(
                        entity,
                        operation = kind.as_str(),
                        explicit = %explicit,
                        ambient = %ambient,
                        "explicit tenant filter differs from ambient scope"
                    );
                }
            }
            return Ok(ScopeDecision::LeaveUnscoped);
        }
    }

    match context::current() {
        Some(company) => Ok(ScopeDecision::Inject { column, company }),
        None => match policy {
            UnscopedPolicy::Reject => Err(TenancyError::MissingTenantScope(entity)),
            UnscopedPolicy::Allow => {
                warn!(
                    entity,
                    operation = kind.as_str(),
                    "operation on company-owned entity proceeding unscoped (policy: allow)"
                );
                Ok(ScopeDecision::LeaveUnscoped)
            }
        },
    }
}

/// Apply scope resolution to a pending query (select, count, update, delete).
/// The tenant clause is AND-combined with whatever the caller specified.
/// Idempotent: applying twice yields exactly one tenant clause.
pub fn scope_query<T: TenantOwned>(
    query: &mut Query,
    scope_override: Option<&ScopeOverride>,
    kind: OperationKind,
    policy: UnscopedPolicy,
) -> Result<(), TenancyError> {
    let decision = resolve(
        policy,
        T::TABLE,
        T::TENANT_COLUMN,
        scope_override,
        query.where_data(),
        kind,
    )?;
    if let ScopeDecision::Inject { column, company } = decision {
        query.tenant_eq(column, company.as_str());
    }
    Ok(())
}

/// Apply scope resolution to a pending aggregation. The tenant match is
/// prepended as the very first stage so every later stage only sees scoped
/// rows. Idempotent: the pipeline records that it has been scoped.
pub fn scope_pipeline<T: TenantOwned>(
    pipeline: &mut Pipeline,
    scope_override: Option<&ScopeOverride>,
    policy: UnscopedPolicy,
) -> Result<(), TenancyError> {
    let decision = resolve(
        policy,
        T::TABLE,
        T::TENANT_COLUMN,
        scope_override,
        None,
        OperationKind::Aggregate,
    )?;
    if let ScopeDecision::Inject { column, company } = decision {
        pipeline.prepend_match(column, company.as_str());
    }
    Ok(())
}
