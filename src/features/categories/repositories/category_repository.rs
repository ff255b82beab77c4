use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::Category;

/// Fields for a brand-new category row. `is_parent` starts false (a new
/// node has no children yet) and `is_active` starts true.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub description: Option<String>,
    pub meta_title: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
}

/// Partial update: `None` leaves a column untouched. Nullable columns
/// use a nested option so `Some(None)` can set them to NULL.
#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
    pub level: Option<i32>,
    pub is_parent: Option<bool>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
    pub meta_title: Option<String>,
    pub image_url: Option<Option<String>>,
    pub sort_order: Option<i32>,
}

/// The narrow persistence surface the hierarchy engine needs.
///
/// The tree is never cached in memory; every operation re-reads the
/// store through this trait, which also keeps the engine testable
/// without PostgreSQL.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>>;

    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// Lookup by exact (already trimmed) name across active and
    /// inactive rows, optionally excluding one id.
    async fn find_by_name(&self, name: &str, exclude: Option<Uuid>) -> Result<Option<Category>>;

    /// Whether any row (active or inactive) uses this slug, optionally
    /// excluding one id.
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool>;

    /// Active children of a parent (`None` = active roots), ordered by
    /// `(sort_order, name)`.
    async fn find_active_children(&self, parent_id: Option<Uuid>) -> Result<Vec<Category>>;

    async fn count_active_children(&self, parent_id: Uuid, exclude: Option<Uuid>) -> Result<i64>;

    async fn find_active_by_level(&self, level: i32) -> Result<Vec<Category>>;

    /// Full scan ordered by `(level, sort_order, name)`.
    async fn find_all(&self, include_inactive: bool) -> Result<Vec<Category>>;

    async fn insert(&self, new: NewCategory) -> Result<Category>;

    /// Atomic single-row partial update; always bumps `updated_at`.
    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category>;

    async fn set_parent_flag(&self, id: Uuid, is_parent: bool) -> Result<()>;
}

const CATEGORY_COLUMNS: &str = "id, name, slug, parent_id, level, is_parent, is_active, \
     description, meta_title, image_url, sort_order, created_at, updated_at";

/// PostgreSQL-backed repository
pub struct PgCategoryRepository {
    pool: PgPool,
}

impl PgCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PgCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE id = $1",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE slug = $1 AND is_active = TRUE",
            CATEGORY_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn find_by_name(&self, name: &str, exclude: Option<Uuid>) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories WHERE name = $1 AND ($2::uuid IS NULL OR id <> $2)",
            CATEGORY_COLUMNS
        ))
        .bind(name)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn find_active_children(&self, parent_id: Option<Uuid>) -> Result<Vec<Category>> {
        // IS NOT DISTINCT FROM matches NULL parents for root listings
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories \
             WHERE is_active = TRUE AND parent_id IS NOT DISTINCT FROM $1 \
             ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        ))
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn count_active_children(&self, parent_id: Uuid, exclude: Option<Uuid>) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories \
             WHERE is_active = TRUE AND parent_id = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(parent_id)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_active_by_level(&self, level: i32) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories \
             WHERE is_active = TRUE AND level = $1 \
             ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        ))
        .bind(level)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn find_all(&self, include_inactive: bool) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {} FROM categories \
             WHERE ($1 OR is_active = TRUE) \
             ORDER BY level, sort_order, name",
            CATEGORY_COLUMNS
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn insert(&self, new: NewCategory) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories \
             (name, slug, parent_id, level, is_parent, is_active, description, meta_title, image_url, sort_order) \
             VALUES ($1, $2, $3, $4, FALSE, TRUE, $5, $6, $7, $8) \
             RETURNING {}",
            CATEGORY_COLUMNS
        ))
        .bind(new.name)
        .bind(new.slug)
        .bind(new.parent_id)
        .bind(new.level)
        .bind(new.description)
        .bind(new.meta_title)
        .bind(new.image_url)
        .bind(new.sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE categories SET updated_at = NOW()");

        if let Some(name) = patch.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(slug) = patch.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(parent_id) = patch.parent_id {
            qb.push(", parent_id = ").push_bind(parent_id);
        }
        if let Some(level) = patch.level {
            qb.push(", level = ").push_bind(level);
        }
        if let Some(is_parent) = patch.is_parent {
            qb.push(", is_parent = ").push_bind(is_parent);
        }
        if let Some(is_active) = patch.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }
        if let Some(description) = patch.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(meta_title) = patch.meta_title {
            qb.push(", meta_title = ").push_bind(meta_title);
        }
        if let Some(image_url) = patch.image_url {
            qb.push(", image_url = ").push_bind(image_url);
        }
        if let Some(sort_order) = patch.sort_order {
            qb.push(", sort_order = ").push_bind(sort_order);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ");
        qb.push(CATEGORY_COLUMNS);

        let category = qb
            .build_query_as::<Category>()
            .fetch_one(&self.pool)
            .await?;

        Ok(category)
    }

    async fn set_parent_flag(&self, id: Uuid, is_parent: bool) -> Result<()> {
        sqlx::query("UPDATE categories SET is_parent = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_parent)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
