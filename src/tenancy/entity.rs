/// Static tenancy capability declaration for a database entity.
///
/// Implemented once per entity type at definition time and immutable after
/// that. `TENANT_COLUMN = Some(..)` opts the entity into automatic tenant
/// scoping; `None` marks a global entity (system tables, the companies
/// registry itself) that is never scoped.
pub trait TenantOwned {
    /// Table this entity maps to.
    const TABLE: &'static str;

    /// Column holding the owning company id, or `None` for global entities.
    const TENANT_COLUMN: Option<&'static str>;
}
