use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a category node.
///
/// Categories form a forest via `parent_id`. `level` and `is_parent`
/// are derived fields maintained incrementally by the service on every
/// mutation; they are never recomputed at read time.
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    /// 0 for roots, parent.level + 1 otherwise
    pub level: i32,
    /// true iff at least one active category points at this node
    pub is_parent: bool,
    /// soft-delete flag; inactive rows persist and keep their name/slug reserved
    pub is_active: bool,
    pub description: Option<String>,
    pub meta_title: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
