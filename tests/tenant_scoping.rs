use serde_json::json;

use crewdesk_api::database::models::{Company, Lead};
use crewdesk_api::query::{Query, QueryData};
use crewdesk_api::tenancy::context::{self, CompanyId};
use crewdesk_api::tenancy::scope::scope_query;
use crewdesk_api::tenancy::{OperationKind, ScopeOverride, TenancyError, TenantOwned, UnscopedPolicy};

fn lead_query(data: QueryData) -> Query {
    let mut query = Query::new(Lead::TABLE).unwrap();
    query.assign(data).unwrap();
    query
}

#[tokio::test]
async fn injects_tenant_filter_inside_scope() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = lead_query(QueryData {
            where_clause: Some(json!({ "stage": "open" })),
            ..Default::default()
        });
        scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
            .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    assert!(sql.sql.contains("\"company_id\" = $1"));
    assert_eq!(sql.params[0], json!("company-a"));
    // The caller's filter is preserved, AND-combined after the tenant clause.
    assert!(sql.sql.contains("\"stage\" = $2"));
    assert_eq!(sql.params[1], json!("open"));
}

#[tokio::test]
async fn leaves_filter_unchanged_outside_scope_when_allowed() {
    let mut query = lead_query(QueryData {
        where_clause: Some(json!({ "stage": "open" })),
        ..Default::default()
    });
    scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Allow).unwrap();
    let sql = query.to_sql().unwrap();

    assert!(!sql.sql.contains("company_id"));
    assert_eq!(sql.params, vec![json!("open")]);
}

#[tokio::test]
async fn rejects_outside_scope_by_default() {
    let mut query = lead_query(QueryData::default());
    let err = scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
        .unwrap_err();
    assert_eq!(err, TenancyError::MissingTenantScope("leads"));
}

#[tokio::test]
async fn double_injection_yields_one_clause() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = lead_query(QueryData::default());
        scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
            .unwrap();
        scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
            .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    assert_eq!(sql.sql.matches("company_id").count(), 1);
    assert_eq!(sql.params, vec![json!("company-a")]);
}

#[tokio::test]
async fn explicit_override_wins_over_ambient_scope() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = lead_query(QueryData::default());
        let override_ = ScopeOverride::Company(CompanyId::from("company-b"));
        scope_query::<Lead>(
            &mut query,
            Some(&override_),
            OperationKind::Select,
            UnscopedPolicy::Reject,
        )
        .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    assert_eq!(sql.params, vec![json!("company-b")]);
}

#[tokio::test]
async fn all_companies_override_skips_injection() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = lead_query(QueryData::default());
        scope_query::<Lead>(
            &mut query,
            Some(&ScopeOverride::AllCompanies),
            OperationKind::Select,
            UnscopedPolicy::Reject,
        )
        .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    assert!(!sql.sql.contains("company_id"));
}

#[tokio::test]
async fn non_owning_entity_is_never_filtered() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = Query::new(Company::TABLE).unwrap();
        scope_query::<Company>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
            .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    assert!(!sql.sql.contains("company_id"));
    assert!(sql.params.is_empty());
}

#[tokio::test]
async fn explicit_tenant_filter_in_criteria_wins() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut query = lead_query(QueryData {
            where_clause: Some(json!({ "company_id": "company-b" })),
            ..Default::default()
        });
        scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
            .unwrap();
        query.to_sql().unwrap()
    })
    .await;

    // Exactly the caller's clause, no injected duplicate.
    assert_eq!(sql.sql.matches("company_id").count(), 1);
    assert_eq!(sql.params, vec![json!("company-b")]);
}

// End-to-end shape of the isolation invariant at the SQL boundary: two
// interleaved "requests" each compile their reads with their own company id.
#[tokio::test]
async fn concurrent_requests_compile_their_own_tenant() {
    let request = |company: &'static str| {
        context::scope(CompanyId::from(company), async {
            tokio::task::yield_now().await;
            let mut query = lead_query(QueryData::default());
            scope_query::<Lead>(&mut query, None, OperationKind::Select, UnscopedPolicy::Reject)
                .unwrap();
            tokio::task::yield_now().await;
            query.to_sql().unwrap()
        })
    };

    let (a, b) = tokio::join!(request("company-a"), request("company-b"));
    assert_eq!(a.params, vec![json!("company-a")]);
    assert_eq!(b.params, vec![json!("company-b")]);
}
