use serde_json::json;

use crewdesk_api::database::models::{Company, Lead};
use crewdesk_api::query::{Aggregate, Pipeline, Stage};
use crewdesk_api::tenancy::context::{self, CompanyId};
use crewdesk_api::tenancy::scope::scope_pipeline;
use crewdesk_api::tenancy::{TenantOwned, UnscopedPolicy};

#[tokio::test]
async fn tenant_match_is_prepended_before_caller_stages() {
    let pipeline = context::scope(CompanyId::from("company-a"), async {
        let mut pipeline = Pipeline::new(Lead::TABLE)
            .unwrap()
            .stage(Stage::Sort(json!("value desc")))
            .stage(Stage::Limit(10));
        scope_pipeline::<Lead>(&mut pipeline, None, UnscopedPolicy::Reject).unwrap();
        pipeline
    })
    .await;

    // Ordering is load-bearing: sort/limit must only ever see scoped rows.
    assert_eq!(pipeline.stage_kinds(), vec!["match", "sort", "limit"]);

    let sql = pipeline.to_sql().unwrap();
    assert_eq!(sql.params, vec![json!("company-a")]);
    let match_pos = sql.sql.find("\"company_id\" = $1").unwrap();
    let sort_pos = sql.sql.find("ORDER BY").unwrap();
    let limit_pos = sql.sql.find("LIMIT 10").unwrap();
    assert!(match_pos < sort_pos && sort_pos < limit_pos);
}

#[tokio::test]
async fn scoping_a_pipeline_twice_adds_one_stage() {
    context::scope(CompanyId::from("company-a"), async {
        let mut pipeline =
            Pipeline::new(Lead::TABLE).unwrap().stage(Stage::Sort(json!("value desc")));
        scope_pipeline::<Lead>(&mut pipeline, None, UnscopedPolicy::Reject).unwrap();
        scope_pipeline::<Lead>(&mut pipeline, None, UnscopedPolicy::Reject).unwrap();
        assert_eq!(pipeline.stage_kinds(), vec!["match", "sort"]);
    })
    .await;
}

#[tokio::test]
async fn non_owning_entity_gets_no_match_stage() {
    context::scope(CompanyId::from("company-a"), async {
        let mut pipeline =
            Pipeline::new(Company::TABLE).unwrap().stage(Stage::Sort(json!("name asc")));
        scope_pipeline::<Company>(&mut pipeline, None, UnscopedPolicy::Reject).unwrap();
        assert_eq!(pipeline.stage_kinds(), vec!["sort"]);
    })
    .await;
}

#[tokio::test]
async fn unscoped_pipeline_rejected_by_default() {
    let mut pipeline = Pipeline::new(Lead::TABLE).unwrap();
    let result = scope_pipeline::<Lead>(&mut pipeline, None, UnscopedPolicy::Reject);
    assert!(result.is_err());
}

#[tokio::test]
async fn grouped_stats_compile_inside_scope() {
    let sql = context::scope(CompanyId::from("company-a"), async {
        let mut pipeline = Pipeline::new(Lead::TABLE).unwrap().stage(Stage::Group {
            by: vec!["stage".to_string()],
            aggregates: vec![Aggregate::count("leads"), Aggregate::sum("value", "total_value")],
        });
        scope_pipeline::<Lead>(&mut pipeline, None, UnscopedPolicy::Reject).unwrap();
        pipeline.to_sql().unwrap()
    })
    .await;

    // The group stage wraps the tenant match, never the other way around.
    let match_pos = sql.sql.find("\"company_id\" = $1").unwrap();
    let group_pos = sql.sql.find("GROUP BY").unwrap();
    assert!(match_pos < group_pos);
    assert!(sql.sql.contains("COUNT(*) AS \"leads\""));
    assert!(sql.sql.contains("SUM(\"value\") AS \"total_value\""));
}
