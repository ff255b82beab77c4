use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::categories::models::Category;

/// Request DTO for creating a category.
///
/// Arrives as multipart/form-data so an image can ride along; all
/// other fields are plain text parts. `parent_id` accepts `""`,
/// `"null"` and `"undefined"` as "no parent" since form clients send
/// those literally.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryDto {
    #[validate(length(max = 255, message = "Name must not exceed 255 characters"))]
    pub name: String,

    /// Explicit slug; derived from the name when absent
    pub slug: Option<String>,

    /// Parent category id, or a null-ish sentinel for a root category
    pub parent_id: Option<String>,

    pub description: Option<String>,

    #[validate(length(max = 255, message = "Meta title must not exceed 255 characters"))]
    pub meta_title: Option<String>,

    /// Ordering key among siblings (ties broken by name)
    #[serde(default)]
    pub sort_order: i32,

    /// Image file part (binary); documented here for OpenAPI only
    #[serde(skip)]
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<String>,
}

/// Request DTO for editing a category. Absent fields keep their
/// previous values; `parent_id` uses the same null-ish sentinels as
/// create to detach a node back to root.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryDto {
    #[validate(length(max = 255, message = "Name must not exceed 255 characters"))]
    pub name: Option<String>,

    pub slug: Option<String>,

    pub parent_id: Option<String>,

    pub description: Option<String>,

    #[validate(length(max = 255, message = "Meta title must not exceed 255 characters"))]
    pub meta_title: Option<String>,

    pub sort_order: Option<i32>,
}

/// An image payload extracted from a multipart request
#[derive(Debug, Clone)]
pub struct ImageUploadDto {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// Response DTO for a single category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponseDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub is_parent: bool,
    pub is_active: bool,
    pub description: Option<String>,
    pub meta_title: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Category> for CategoryResponseDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            parent_id: c.parent_id,
            level: c.level,
            is_parent: c.is_parent,
            is_active: c.is_active,
            description: c.description,
            meta_title: c.meta_title,
            image_url: c.image_url,
            sort_order: c.sort_order,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Response DTO for a category with its nested children
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(no_recursion)]
pub struct CategoryTreeDto {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub children: Vec<CategoryTreeDto>,
}

impl From<Category> for CategoryTreeDto {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            parent_id: c.parent_id,
            level: c.level,
            is_active: c.is_active,
            image_url: c.image_url,
            sort_order: c.sort_order,
            children: Vec::new(),
        }
    }
}

impl CategoryTreeDto {
    /// Total number of nodes below this one
    pub fn descendant_count(&self) -> i64 {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// Summary counters for the detail view
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryStatsDto {
    pub total_descendants: i64,
    pub direct_children: i64,
    pub has_children: bool,
    pub has_siblings: bool,
}

/// Full detail view for a category resolved by slug: the node itself,
/// its breadcrumb context and its surroundings in the tree.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDetailDto {
    pub category: CategoryResponseDto,
    /// Active ancestors, root first
    pub ancestors: Vec<CategoryResponseDto>,
    /// `ancestors` plus the node itself
    pub breadcrumb: Vec<CategoryResponseDto>,
    /// Direct active children ordered by (sort_order, name)
    pub children: Vec<CategoryResponseDto>,
    /// Recursive descendant trees
    pub descendants: Vec<CategoryTreeDto>,
    /// Other active children of the same parent
    pub siblings: Vec<CategoryResponseDto>,
    pub stats: CategoryStatsDto,
}

/// Confirmation for a soft delete
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteCategoryResponseDto {
    pub deleted: bool,
}
