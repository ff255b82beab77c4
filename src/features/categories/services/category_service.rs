use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{
    CategoryDetailDto, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    DeleteCategoryResponseDto, ImageUploadDto, UpdateCategoryDto,
};
use crate::features::categories::models::Category;
use crate::features::categories::repositories::{CategoryPatch, CategoryRepository, NewCategory};
use crate::features::categories::services::category_tree::CategoryTreeBuilder;
use crate::features::categories::services::category_validator::{
    parse_category_id, CategoryValidator,
};
use crate::modules::storage::ObjectStorage;
use crate::shared::constants::{CATEGORY_IMAGE_FOLDER, MAX_SLUG_LENGTH};
use crate::shared::slug::slugify;

/// The hierarchy engine. Owns the `level`, `is_parent` and uniqueness
/// invariants of the category tree and performs every mutation against
/// the injected repository; the tree is never cached across calls.
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    storage: Arc<dyn ObjectStorage>,
    validator: CategoryValidator,
    tree: CategoryTreeBuilder,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            validator: CategoryValidator::new(Arc::clone(&repo)),
            tree: CategoryTreeBuilder::new(Arc::clone(&repo)),
            repo,
            storage,
        }
    }

    /// Create a category, optionally with an image.
    ///
    /// An image upload failure fails the whole create; no category row
    /// is written with a dangling image reference.
    pub async fn create(
        &self,
        dto: CreateCategoryDto,
        image: Option<ImageUploadDto>,
    ) -> Result<CategoryResponseDto> {
        self.validator.validate_create(&dto).await?;

        let name = dto.name.trim().to_string();

        // The validator already checked the name, but against an earlier
        // read of the store; this second check is the authoritative one.
        if self.repo.find_by_name(&name, None).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A category named '{}' already exists",
                name
            )));
        }

        let parent = match parse_parent_ref(dto.parent_id.as_deref())? {
            Some(parent_id) => Some(self.load_active_parent(parent_id, "Parent").await?),
            None => None,
        };
        let level = parent.as_ref().map(|p| p.level + 1).unwrap_or(0);

        let slug = match dto.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => {
                if self.repo.slug_exists(slug, None).await? {
                    return Err(AppError::Conflict(format!(
                        "Slug '{}' is already in use",
                        slug
                    )));
                }
                slug.to_string()
            }
            None => self.unique_slug(&name, None).await?,
        };

        let image_url = match image {
            Some(img) => Some(
                self.storage
                    .put(
                        img.data,
                        &img.file_name,
                        CATEGORY_IMAGE_FOLDER,
                        &img.content_type,
                    )
                    .await?,
            ),
            None => None,
        };

        if let Some(parent) = &parent {
            if !parent.is_parent {
                self.repo.set_parent_flag(parent.id, true).await?;
            }
        }

        let created = self
            .repo
            .insert(NewCategory {
                name,
                slug,
                parent_id: parent.as_ref().map(|p| p.id),
                level,
                description: dto.description,
                meta_title: dto.meta_title,
                image_url,
                sort_order: dto.sort_order,
            })
            .await?;

        tracing::info!(
            "Category created: id={}, slug={}, level={}",
            created.id,
            created.slug,
            created.level
        );

        Ok(created.into())
    }

    /// Partial edit. Only provided fields overwrite; a parent change
    /// recomputes levels and maintains both parents' `is_parent` flags.
    pub async fn edit(&self, id: &str, dto: UpdateCategoryDto) -> Result<CategoryResponseDto> {
        let id = parse_category_id(id)?;
        self.validator.validate_update(&dto, id).await?;

        let current = self.load_active(id).await?;

        let new_name = dto.name.as_deref().map(|n| n.trim().to_string());
        if let Some(name) = &new_name {
            if self.repo.find_by_name(name, Some(id)).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "A category named '{}' already exists",
                    name
                )));
            }
        }

        let mut patch = CategoryPatch::default();
        let mut parent_changed = false;
        // flag writes wait until the row update has gone through, so a
        // later rejection cannot strand a childless parent flagged true
        let mut flag_new_parent: Option<Uuid> = None;

        if let Some(raw) = dto.parent_id.as_deref() {
            let new_parent_id = parse_parent_ref(Some(raw))?;
            if new_parent_id != current.parent_id {
                match new_parent_id {
                    Some(parent_id) => {
                        if parent_id == id {
                            return Err(AppError::Conflict(
                                "A category cannot be its own parent".to_string(),
                            ));
                        }
                        let parent = self.load_active_parent(parent_id, "New parent").await?;
                        self.ensure_not_descendant(id, &parent).await?;
                        patch.level = Some(parent.level + 1);
                        if !parent.is_parent {
                            flag_new_parent = Some(parent.id);
                        }
                    }
                    None => {
                        patch.level = Some(0);
                    }
                }
                patch.parent_id = Some(new_parent_id);
                parent_changed = true;
            }
        }

        // Regenerate the slug on rename unless the caller supplied one;
        // a supplied slug must itself be free.
        let name_changed = new_name.as_deref().is_some_and(|n| n != current.name);
        match dto.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) if slug != current.slug => {
                if self.repo.slug_exists(slug, Some(id)).await? {
                    return Err(AppError::Conflict(format!(
                        "Slug '{}' is already in use",
                        slug
                    )));
                }
                patch.slug = Some(slug.to_string());
            }
            Some(_) => {}
            None => {
                if name_changed {
                    let name = new_name.as_deref().unwrap_or(&current.name);
                    patch.slug = Some(self.unique_slug(name, Some(id)).await?);
                }
            }
        }

        patch.name = new_name;
        patch.description = dto.description;
        patch.meta_title = dto.meta_title;
        patch.sort_order = dto.sort_order;

        let updated = self.repo.update(id, patch).await?;

        if parent_changed {
            if let Some(parent_id) = flag_new_parent {
                self.repo.set_parent_flag(parent_id, true).await?;
            }
            if let Some(old_parent_id) = current.parent_id {
                if self
                    .repo
                    .count_active_children(old_parent_id, Some(id))
                    .await?
                    == 0
                {
                    self.repo.set_parent_flag(old_parent_id, false).await?;
                }
            }
            // the moved node's subtree keeps level = parent.level + 1
            self.relevel_subtree(&updated).await?;
        }

        tracing::info!("Category updated: id={}, slug={}", updated.id, updated.slug);

        Ok(updated.into())
    }

    /// Soft delete. Blocked (never cascaded) while active children exist.
    pub async fn delete(&self, id: &str) -> Result<DeleteCategoryResponseDto> {
        let id = parse_category_id(id)?;
        let category = self.load_active(id).await?;

        let children = self.repo.count_active_children(id, None).await?;
        if children > 0 {
            return Err(AppError::Conflict(
                "Cannot delete a category with active children".to_string(),
            ));
        }

        self.repo
            .update(
                id,
                CategoryPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(parent_id) = category.parent_id {
            if self.repo.count_active_children(parent_id, Some(id)).await? == 0 {
                self.repo.set_parent_flag(parent_id, false).await?;
            }
        }

        tracing::info!("Category soft deleted: id={}, slug={}", id, category.slug);

        Ok(DeleteCategoryResponseDto { deleted: true })
    }

    /// Replace a category's image. Removing the previous object is
    /// best-effort cleanup: a storage failure there is logged and the
    /// operation continues.
    pub async fn change_image(
        &self,
        id: &str,
        image: ImageUploadDto,
    ) -> Result<CategoryResponseDto> {
        let id = parse_category_id(id)?;
        let category = self.load_active(id).await?;

        self.delete_stale_image(&category).await;

        let url = self
            .storage
            .put(
                image.data,
                &image.file_name,
                CATEGORY_IMAGE_FOLDER,
                &image.content_type,
            )
            .await?;

        let updated = self
            .repo
            .update(
                id,
                CategoryPatch {
                    image_url: Some(Some(url)),
                    ..Default::default()
                },
            )
            .await?;

        Ok(updated.into())
    }

    /// Clear a category's image, deleting the stored object best-effort.
    pub async fn remove_image(&self, id: &str) -> Result<CategoryResponseDto> {
        let id = parse_category_id(id)?;
        let category = self.load_active(id).await?;

        self.delete_stale_image(&category).await;

        let updated = self
            .repo
            .update(
                id,
                CategoryPatch {
                    image_url: Some(None),
                    ..Default::default()
                },
            )
            .await?;

        Ok(updated.into())
    }

    /// Active categories at exactly `level`, ordered by (sort_order, name)
    pub async fn list_by_level(&self, level: i32) -> Result<Vec<CategoryResponseDto>> {
        let categories = self.repo.find_active_by_level(level).await?;
        Ok(categories.into_iter().map(Into::into).collect())
    }

    /// Full forest projection
    pub async fn get_forest(&self, include_inactive: bool) -> Result<Vec<CategoryTreeDto>> {
        self.tree.forest(include_inactive).await
    }

    /// Detail projection for an active category resolved by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<CategoryDetailDto> {
        self.tree.detail_by_slug(slug).await
    }

    /// Derive a slug from `name` and probe until it is unique across
    /// active and inactive rows. Terminates: the counter strictly
    /// increases and the store is finite.
    async fn unique_slug(&self, name: &str, exclude: Option<Uuid>) -> Result<String> {
        let mut base = slugify(name);
        if base.is_empty() {
            // all-symbol names slugify to nothing; use a generated id
            // instead of probing an empty string forever
            base = format!("category-{}", Uuid::new_v4());
        }
        // leave room for a numeric suffix within the column limit
        if base.len() > MAX_SLUG_LENGTH - 4 {
            base.truncate(MAX_SLUG_LENGTH - 4);
            while base.ends_with('-') {
                base.pop();
            }
        }

        let mut candidate = base.clone();
        let mut counter = 1u32;
        while self.repo.slug_exists(&candidate, exclude).await? {
            candidate = format!("{}-{}", base, counter);
            counter += 1;
        }
        Ok(candidate)
    }

    async fn load_active(&self, id: Uuid) -> Result<Category> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))
    }

    async fn load_active_parent(&self, id: Uuid, role: &str) -> Result<Category> {
        self.repo
            .find_by_id(id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| AppError::NotFound(format!("{} category not found", role)))
    }

    /// Cycle guard for re-parenting: walking up from the candidate
    /// parent must never reach the node being edited.
    async fn ensure_not_descendant(&self, id: Uuid, new_parent: &Category) -> Result<()> {
        let mut visited: HashSet<Uuid> = HashSet::from([new_parent.id]);
        let mut current = new_parent.parent_id;

        while let Some(ancestor_id) = current {
            if ancestor_id == id {
                return Err(AppError::Conflict(
                    "Cannot move a category under one of its own descendants".to_string(),
                ));
            }
            if !visited.insert(ancestor_id) {
                break;
            }
            current = match self.repo.find_by_id(ancestor_id).await? {
                Some(ancestor) => ancestor.parent_id,
                None => None,
            };
        }

        Ok(())
    }

    /// After a move, push the new level down the active subtree so
    /// `child.level == parent.level + 1` holds below the moved node.
    async fn relevel_subtree(&self, root: &Category) -> Result<()> {
        let mut visited: HashSet<Uuid> = HashSet::from([root.id]);
        let mut queue: VecDeque<(Uuid, i32)> = VecDeque::from([(root.id, root.level)]);

        while let Some((parent_id, parent_level)) = queue.pop_front() {
            for child in self.repo.find_active_children(Some(parent_id)).await? {
                if !visited.insert(child.id) {
                    continue;
                }
                let child_level = parent_level + 1;
                if child.level != child_level {
                    self.repo
                        .update(
                            child.id,
                            CategoryPatch {
                                level: Some(child_level),
                                ..Default::default()
                            },
                        )
                        .await?;
                }
                queue.push_back((child.id, child_level));
            }
        }

        Ok(())
    }

    async fn delete_stale_image(&self, category: &Category) {
        if let Some(url) = &category.image_url {
            if let Err(e) = self.storage.delete_by_url(url).await {
                tracing::warn!(
                    "Failed to delete stale image for category {}: {}",
                    category.id,
                    e
                );
            }
        }
    }
}

/// Resolve a raw parent reference. Form clients send `""`, `"null"`
/// and `"undefined"` literally; all of them mean "no parent".
fn parse_parent_ref(raw: Option<&str>) -> Result<Option<Uuid>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("undefined")
    {
        return Ok(None);
    }
    Uuid::parse_str(trimmed)
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Invalid parent id: '{}'", trimmed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{InMemoryCategoryRepository, RecordingStorage};

    fn service() -> CategoryService {
        CategoryService::new(
            Arc::new(InMemoryCategoryRepository::new()),
            Arc::new(RecordingStorage::new()),
        )
    }

    fn service_with_storage(storage: RecordingStorage) -> (CategoryService, Arc<RecordingStorage>) {
        let storage = Arc::new(storage);
        let service = CategoryService::new(
            Arc::new(InMemoryCategoryRepository::new()),
            Arc::clone(&storage) as Arc<dyn ObjectStorage>,
        );
        (service, storage)
    }

    fn create_dto(name: &str, parent_id: Option<String>) -> CreateCategoryDto {
        CreateCategoryDto {
            name: name.to_string(),
            parent_id,
            ..Default::default()
        }
    }

    fn image() -> ImageUploadDto {
        ImageUploadDto {
            data: vec![1, 2, 3],
            file_name: "logo.png".to_string(),
            content_type: "image/png".to_string(),
        }
    }

    async fn reload(service: &CategoryService, id: Uuid) -> Category {
        service.repo.find_by_id(id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_create_root_derives_slug_and_level() {
        let service = service();

        let created = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        assert_eq!(created.slug, "electronics");
        assert_eq!(created.level, 0);
        assert_eq!(created.parent_id, None);
        assert!(!created.is_parent);
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn test_create_child_sets_level_and_parent_flag() {
        let service = service();
        let root = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        let child = service
            .create(create_dto("Phones", Some(root.id.to_string())), None)
            .await
            .unwrap();

        assert_eq!(child.level, 1);
        assert_eq!(child.parent_id, Some(root.id));
        assert!(reload(&service, root.id).await.is_parent);
    }

    #[tokio::test]
    async fn test_create_nullish_parent_sentinels_mean_root() {
        let service = service();
        for (i, sentinel) in ["", "null", "undefined", "  "].iter().enumerate() {
            let created = service
                .create(
                    create_dto(&format!("Cat {}", i), Some(sentinel.to_string())),
                    None,
                )
                .await
                .unwrap();
            assert_eq!(created.level, 0);
            assert_eq!(created.parent_id, None);
        }
    }

    #[tokio::test]
    async fn test_create_missing_parent_is_not_found() {
        let service = service();
        let err = service
            .create(
                create_dto("Phones", Some(Uuid::new_v4().to_string())),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_duplicate_trimmed_name_rejected() {
        let service = service();
        service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        // trailing whitespace trims down to the same name
        let err = service
            .create(create_dto("Electronics ", None), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(_) | AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_slug_probe_appends_counter() {
        let service = service();
        let first = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();
        // different name, same derived slug
        let second = service
            .create(create_dto("Electronics!", None), None)
            .await
            .unwrap();

        assert_eq!(first.slug, "electronics");
        assert_eq!(second.slug, "electronics-1");
    }

    #[tokio::test]
    async fn test_create_explicit_slug_conflict() {
        let service = service();
        service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        let mut dto = create_dto("Gadgets", None);
        dto.slug = Some("electronics".to_string());
        let err = service.create(dto, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_with_image_records_url() {
        let (service, storage) = service_with_storage(RecordingStorage::new());

        let created = service
            .create(create_dto("Electronics", None), Some(image()))
            .await
            .unwrap();

        assert!(created.image_url.is_some());
        assert_eq!(storage.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_fails_when_image_upload_fails() {
        let (service, _) = service_with_storage(RecordingStorage::failing_put());

        let err = service
            .create(create_dto("Electronics", None), Some(image()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));

        // no partial category was written
        assert!(service
            .repo
            .find_by_name("Electronics", None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_edit_rename_regenerates_slug() {
        let service = service();
        let created = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        let updated = service
            .edit(
                &created.id.to_string(),
                UpdateCategoryDto {
                    name: Some("Home Appliances".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Home Appliances");
        assert_eq!(updated.slug, "home-appliances");
    }

    #[tokio::test]
    async fn test_edit_keeps_own_slug_when_name_unchanged() {
        let service = service();
        let created = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();

        let updated = service
            .edit(
                &created.id.to_string(),
                UpdateCategoryDto {
                    description: Some("All gadgets".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.slug, "electronics");
        assert_eq!(updated.description.as_deref(), Some("All gadgets"));
    }

    #[tokio::test]
    async fn test_edit_supplied_slug_must_be_free() {
        let service = service();
        service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();
        let other = service
            .create(create_dto("Gadgets", None), None)
            .await
            .unwrap();

        let err = service
            .edit(
                &other.id.to_string(),
                UpdateCategoryDto {
                    slug: Some("electronics".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_edit_reparent_updates_levels_and_flags() {
        let service = service();
        let p1 = service.create(create_dto("P1", None), None).await.unwrap();
        let p2 = service.create(create_dto("P2", None), None).await.unwrap();
        let child = service
            .create(create_dto("Child", Some(p1.id.to_string())), None)
            .await
            .unwrap();

        let moved = service
            .edit(
                &child.id.to_string(),
                UpdateCategoryDto {
                    parent_id: Some(p2.id.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.parent_id, Some(p2.id));
        assert_eq!(moved.level, 1);
        assert!(reload(&service, p2.id).await.is_parent);
        // P1 lost its only active child
        assert!(!reload(&service, p1.id).await.is_parent);
    }

    #[tokio::test]
    async fn test_edit_detach_to_root_relevels_subtree() {
        let service = service();
        let root = service.create(create_dto("Root", None), None).await.unwrap();
        let mid = service
            .create(create_dto("Mid", Some(root.id.to_string())), None)
            .await
            .unwrap();
        let leaf = service
            .create(create_dto("Leaf", Some(mid.id.to_string())), None)
            .await
            .unwrap();

        let moved = service
            .edit(
                &mid.id.to_string(),
                UpdateCategoryDto {
                    parent_id: Some("null".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.level, 0);
        assert_eq!(moved.parent_id, None);
        // the subtree below the moved node follows
        assert_eq!(reload(&service, leaf.id).await.level, 1);
        assert!(!reload(&service, root.id).await.is_parent);
    }

    #[tokio::test]
    async fn test_rejected_reparent_writes_no_flags() {
        let service = service();
        let p1 = service.create(create_dto("P1", None), None).await.unwrap();
        let p2 = service.create(create_dto("P2", None), None).await.unwrap();
        let child = service
            .create(create_dto("Child", Some(p1.id.to_string())), None)
            .await
            .unwrap();
        // another category holds the slug the edit will ask for
        service.create(create_dto("Other", None), None).await.unwrap();

        let err = service
            .edit(
                &child.id.to_string(),
                UpdateCategoryDto {
                    parent_id: Some(p2.id.to_string()),
                    slug: Some("other".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // the rejected move left every row as it was
        assert!(!reload(&service, p2.id).await.is_parent);
        assert!(reload(&service, p1.id).await.is_parent);
        let child_row = reload(&service, child.id).await;
        assert_eq!(child_row.parent_id, Some(p1.id));
        assert_eq!(child_row.level, 1);
        assert_eq!(child_row.slug, "child");
    }

    #[tokio::test]
    async fn test_edit_reparent_under_own_descendant_rejected() {
        let service = service();
        let a = service.create(create_dto("A", None), None).await.unwrap();
        let b = service
            .create(create_dto("B", Some(a.id.to_string())), None)
            .await
            .unwrap();
        let c = service
            .create(create_dto("C", Some(b.id.to_string())), None)
            .await
            .unwrap();

        // A under C would close the loop A -> B -> C -> A
        let err = service
            .edit(
                &a.id.to_string(),
                UpdateCategoryDto {
                    parent_id: Some(c.id.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // self-parenting is rejected as well
        let err = service
            .edit(
                &a.id.to_string(),
                UpdateCategoryDto {
                    parent_id: Some(a.id.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_with_active_children_is_conflict() {
        let service = service();
        let root = service.create(create_dto("Root", None), None).await.unwrap();
        service
            .create(create_dto("Child", Some(root.id.to_string())), None)
            .await
            .unwrap();

        let err = service.delete(&root.id.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(reload(&service, root.id).await.is_active);
    }

    #[tokio::test]
    async fn test_delete_leaf_clears_parent_flag() {
        let service = service();
        let root = service.create(create_dto("Root", None), None).await.unwrap();
        let child = service
            .create(create_dto("Child", Some(root.id.to_string())), None)
            .await
            .unwrap();

        let result = service.delete(&child.id.to_string()).await.unwrap();
        assert!(result.deleted);

        let child_row = reload(&service, child.id).await;
        assert!(!child_row.is_active);
        // the row persists and still reserves its name and slug
        assert_eq!(child_row.slug, "child");
        assert!(!reload(&service, root.id).await.is_parent);
    }

    #[tokio::test]
    async fn test_delete_keeps_parent_flag_while_siblings_remain() {
        let service = service();
        let root = service.create(create_dto("Root", None), None).await.unwrap();
        let first = service
            .create(create_dto("First", Some(root.id.to_string())), None)
            .await
            .unwrap();
        service
            .create(create_dto("Second", Some(root.id.to_string())), None)
            .await
            .unwrap();

        service.delete(&first.id.to_string()).await.unwrap();
        assert!(reload(&service, root.id).await.is_parent);
    }

    #[tokio::test]
    async fn test_delete_missing_or_inactive_is_not_found() {
        let service = service();
        let err = service
            .delete(&Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let leaf = service.create(create_dto("Leaf", None), None).await.unwrap();
        service.delete(&leaf.id.to_string()).await.unwrap();
        let err = service.delete(&leaf.id.to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleted_name_still_reserved() {
        let service = service();
        let leaf = service.create(create_dto("Leaf", None), None).await.unwrap();
        service.delete(&leaf.id.to_string()).await.unwrap();

        let err = service.create(create_dto("Leaf", None), None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(_) | AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_change_image_replaces_and_cleans_up() {
        let (service, storage) = service_with_storage(RecordingStorage::new());
        let created = service
            .create(create_dto("Electronics", None), Some(image()))
            .await
            .unwrap();
        let old_url = created.image_url.clone().unwrap();

        let updated = service
            .change_image(&created.id.to_string(), image())
            .await
            .unwrap();

        assert!(updated.image_url.is_some());
        assert_eq!(storage.deletes.lock().unwrap().as_slice(), &[old_url]);
    }

    #[tokio::test]
    async fn test_remove_image_survives_storage_delete_failure() {
        let (service, storage) = service_with_storage(RecordingStorage::failing_delete());
        // create without image, then attach one via change_image so the
        // failing delete only fires on removal
        let created = service
            .create(create_dto("Electronics", None), None)
            .await
            .unwrap();
        let with_image = service
            .change_image(&created.id.to_string(), image())
            .await
            .unwrap();
        assert!(with_image.image_url.is_some());

        let updated = service
            .remove_image(&created.id.to_string())
            .await
            .unwrap();

        // cleanup failed but the mutation still succeeded
        assert_eq!(updated.image_url, None);
        assert_eq!(storage.deletes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_by_level_orders_siblings() {
        let service = service();
        let root = service.create(create_dto("Root", None), None).await.unwrap();
        let mut banana = create_dto("Banana", Some(root.id.to_string()));
        banana.sort_order = 1;
        let mut apple = create_dto("Apple", Some(root.id.to_string()));
        apple.sort_order = 1;
        let mut cherry = create_dto("Cherry", Some(root.id.to_string()));
        cherry.sort_order = 0;
        service.create(banana, None).await.unwrap();
        service.create(apple, None).await.unwrap();
        service.create(cherry, None).await.unwrap();

        let level_one = service.list_by_level(1).await.unwrap();
        let names: Vec<&str> = level_one.iter().map(|c| c.name.as_str()).collect();
        // sort_order first, name breaks the tie
        assert_eq!(names, vec!["Cherry", "Apple", "Banana"]);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let service = service();
        let err = service
            .edit("not-a-uuid", UpdateCategoryDto::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_unique_slug_falls_back_for_symbol_names() {
        let service = service();
        let created = service.create(create_dto("!!!", None), None).await.unwrap();
        assert!(created.slug.starts_with("category-"));
    }
}
