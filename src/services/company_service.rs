use serde_json::json;
use sqlx::PgPool;

use crate::auth;
use crate::database::manager::DatabaseError;
use crate::database::models::{Company, User};
use crate::database::{Record, Repository};
use crate::query::QueryData;
use crate::tenancy::{CompanyId, ScopeOverride};

/// Cross-tenant company administration. Used from the CLI and system jobs,
/// which run outside any tenant scope by construction; the one tenant-owned
/// table it touches (users) is pinned explicitly via the audited override.
pub struct CompanyService {
    pool: PgPool,
}

impl CompanyService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Provision a company together with its first admin account.
    pub async fn create_company(
        &self,
        name: &str,
        admin_email: &str,
        admin_password: &str,
    ) -> Result<(Company, User), DatabaseError> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(DatabaseError::QueryError("company name yields an empty slug".to_string()));
        }

        let companies = Repository::<Company>::new(self.pool.clone());
        let existing = companies
            .select_one(QueryData {
                where_clause: Some(json!({ "slug": slug.as_str() })),
                ..Default::default()
            })
            .await?;
        if existing.is_some() {
            return Err(DatabaseError::QueryError(format!("company slug '{}' already exists", slug)));
        }

        let mut record = Record::new();
        record.set("name", name).set("slug", slug).set("is_active", true);
        let company = companies.insert(record).await?;

        let users = Repository::<User>::new(self.pool.clone())
            .with_scope(ScopeOverride::Company(CompanyId::new(company.id.to_string())));
        let mut admin = Record::new();
        admin
            .set("email", admin_email)
            .set("name", "Administrator")
            .set("password_digest", auth::hash_password(admin_password))
            .set("role", "admin")
            .set("is_active", true);
        let user = users.insert(admin).await?;

        Ok((company, user))
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, DatabaseError> {
        Repository::<Company>::new(self.pool.clone())
            .select_any(QueryData { order: Some(json!("name asc")), ..Default::default() })
            .await
    }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_normalizes_names() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("  A&B  Ltd. "), "a-b-ltd");
        assert_eq!(slugify("---"), "");
    }
}
