#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use chrono::Utc;
#[cfg(test)]
use uuid::Uuid;

#[cfg(test)]
use crate::core::error::{AppError, Result};
#[cfg(test)]
use crate::features::categories::models::Category;
#[cfg(test)]
use crate::features::categories::repositories::{CategoryPatch, CategoryRepository, NewCategory};
#[cfg(test)]
use crate::modules::storage::ObjectStorage;

#[cfg(test)]
pub fn category_fixture(name: &str, slug: &str, parent_id: Option<Uuid>, level: i32) -> Category {
    let now = Utc::now();
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.to_string(),
        parent_id,
        level,
        is_parent: false,
        is_active: true,
        description: None,
        meta_title: None,
        image_url: None,
        sort_order: 0,
        created_at: now,
        updated_at: now,
    }
}

/// In-memory `CategoryRepository` mirroring the PostgreSQL ordering and
/// filtering semantics, so engine and tree tests run without a database.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: Mutex<HashMap<Uuid, Category>>,
}

#[cfg(test)]
impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.categories.lock().unwrap();
            for category in categories {
                map.insert(category.id, category);
            }
        }
        repo
    }

    fn sorted_by_sibling_order(mut rows: Vec<Category>) -> Vec<Category> {
        rows.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }
}

#[cfg(test)]
#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.lock().unwrap().get(&id).cloned())
    }

    async fn find_active_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .values()
            .find(|c| c.is_active && c.slug == slug)
            .cloned())
    }

    async fn find_by_name(&self, name: &str, exclude: Option<Uuid>) -> Result<Option<Category>> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .values()
            .find(|c| c.name == name && Some(c.id) != exclude)
            .cloned())
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .values()
            .any(|c| c.slug == slug && Some(c.id) != exclude))
    }

    async fn find_active_children(&self, parent_id: Option<Uuid>) -> Result<Vec<Category>> {
        let rows: Vec<Category> = self
            .categories
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.is_active && c.parent_id == parent_id)
            .cloned()
            .collect();
        Ok(Self::sorted_by_sibling_order(rows))
    }

    async fn count_active_children(&self, parent_id: Uuid, exclude: Option<Uuid>) -> Result<i64> {
        Ok(self
            .categories
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.is_active && c.parent_id == Some(parent_id) && Some(c.id) != exclude)
            .count() as i64)
    }

    async fn find_active_by_level(&self, level: i32) -> Result<Vec<Category>> {
        let rows: Vec<Category> = self
            .categories
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.is_active && c.level == level)
            .cloned()
            .collect();
        Ok(Self::sorted_by_sibling_order(rows))
    }

    async fn find_all(&self, include_inactive: bool) -> Result<Vec<Category>> {
        let mut rows: Vec<Category> = self
            .categories
            .lock()
            .unwrap()
            .values()
            .filter(|c| include_inactive || c.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.level
                .cmp(&b.level)
                .then_with(|| a.sort_order.cmp(&b.sort_order))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn insert(&self, new: NewCategory) -> Result<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: new.name,
            slug: new.slug,
            parent_id: new.parent_id,
            level: new.level,
            is_parent: false,
            is_active: true,
            description: new.description,
            meta_title: new.meta_title,
            image_url: new.image_url,
            sort_order: new.sort_order,
            created_at: now,
            updated_at: now,
        };
        self.categories
            .lock()
            .unwrap()
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: Uuid, patch: CategoryPatch) -> Result<Category> {
        let mut map = self.categories.lock().unwrap();
        let category = map
            .get_mut(&id)
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;

        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(slug) = patch.slug {
            category.slug = slug;
        }
        if let Some(parent_id) = patch.parent_id {
            category.parent_id = parent_id;
        }
        if let Some(level) = patch.level {
            category.level = level;
        }
        if let Some(is_parent) = patch.is_parent {
            category.is_parent = is_parent;
        }
        if let Some(is_active) = patch.is_active {
            category.is_active = is_active;
        }
        if let Some(description) = patch.description {
            category.description = Some(description);
        }
        if let Some(meta_title) = patch.meta_title {
            category.meta_title = Some(meta_title);
        }
        if let Some(image_url) = patch.image_url {
            category.image_url = image_url;
        }
        if let Some(sort_order) = patch.sort_order {
            category.sort_order = sort_order;
        }
        category.updated_at = Utc::now();

        Ok(category.clone())
    }

    async fn set_parent_flag(&self, id: Uuid, is_parent: bool) -> Result<()> {
        let mut map = self.categories.lock().unwrap();
        let category = map
            .get_mut(&id)
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
        category.is_parent = is_parent;
        category.updated_at = Utc::now();
        Ok(())
    }
}

/// Object storage stub that records puts/deletes and can be told to
/// fail either operation.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingStorage {
    pub uploads: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
    fail_put: bool,
    fail_delete: bool,
}

#[cfg(test)]
impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }

    pub fn failing_delete() -> Self {
        Self {
            fail_delete: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put(
        &self,
        _data: Vec<u8>,
        original_name: &str,
        folder: &str,
        _content_type: &str,
    ) -> Result<String> {
        if self.fail_put {
            return Err(AppError::Storage("upload failed".to_string()));
        }
        let url = format!("http://storage.local/{}/{}", folder, original_name);
        self.uploads.lock().unwrap().push(url.clone());
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        self.deletes.lock().unwrap().push(url.to_string());
        if self.fail_delete {
            return Err(AppError::Storage("delete failed".to_string()));
        }
        Ok(())
    }
}
