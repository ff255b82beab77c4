use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::categories::dtos::{
    CategoryDetailDto, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    DeleteCategoryResponseDto, ImageUploadDto, UpdateCategoryDto,
};
use crate::features::categories::services::CategoryService;
use crate::shared::constants::{
    is_image_mime_type_allowed, ALLOWED_IMAGE_MIME_TYPES, MAX_IMAGE_SIZE,
};
use crate::shared::types::ApiResponse;

/// Query params for listing categories
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    /// Include soft-deleted categories in the tree. Default: false
    #[serde(default)]
    pub include_inactive: bool,
}

/// List the category forest
///
/// Returns every root category with its descendants nested recursively.
#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("include_inactive" = Option<bool>, Query, description = "Include soft-deleted categories")
    ),
    responses(
        (status = 200, description = "Category forest", body = ApiResponse<Vec<CategoryTreeDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(service): State<Arc<CategoryService>>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryTreeDto>>>> {
    let forest = service.get_forest(query.include_inactive).await?;
    Ok(Json(ApiResponse::success(Some(forest), None, None)))
}

/// List active categories at a depth level
///
/// Level 0 is the roots; siblings are ordered by sort_order, then name.
#[utoipa::path(
    get,
    path = "/api/categories/level/{level}",
    params(
        ("level" = i32, Path, description = "Tree depth, 0 for roots")
    ),
    responses(
        (status = 200, description = "Categories at this level", body = ApiResponse<Vec<CategoryResponseDto>>),
    ),
    tag = "categories"
)]
pub async fn list_categories_by_level(
    State(service): State<Arc<CategoryService>>,
    Path(level): Path<i32>,
) -> Result<Json<ApiResponse<Vec<CategoryResponseDto>>>> {
    let categories = service.list_by_level(level).await?;
    Ok(Json(ApiResponse::success(Some(categories), None, None)))
}

/// Get category detail by slug
///
/// Returns the category with its ancestors, breadcrumb, children,
/// descendant trees, siblings and counters.
#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    params(
        ("slug" = String, Path, description = "Category slug")
    ),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<CategoryDetailDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(service): State<Arc<CategoryService>>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CategoryDetailDto>>> {
    let detail = service.get_by_slug(&slug).await?;
    Ok(Json(ApiResponse::success(Some(detail), None, None)))
}

/// Create a category
///
/// Accepts multipart/form-data with text parts:
/// - `name` (required)
/// - `slug`, `parent_id`, `description`, `meta_title`, `sort_order`
/// - `image`: optional image file
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body(
        content = CreateCategoryDto,
        content_type = "multipart/form-data",
        description = "Category form with an optional image file",
    ),
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Parent category not found"),
        (status = 409, description = "Duplicate name or slug")
    )
)]
pub async fn create_category(
    State(service): State<Arc<CategoryService>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponseDto>>)> {
    let (dto, image) = parse_category_form(multipart).await?;
    let created = service.create(dto, image).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(created),
            Some("Category created".to_string()),
            None,
        )),
    ))
}

/// Update a category
///
/// Partial update: absent fields keep their previous values. Changing
/// `parent_id` moves the whole subtree; `""`/`"null"` detach to root.
#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = String, Path, description = "Category id")
    ),
    request_body = UpdateCategoryDto,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Duplicate name/slug or cycle")
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateCategoryDto>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let updated = service.edit(&id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("Category updated".to_string()),
        None,
    )))
}

/// Soft delete a category
#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = String, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<DeleteCategoryResponseDto>),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Category still has active children")
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteCategoryResponseDto>>> {
    let result = service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        Some(result),
        Some("Category deleted".to_string()),
        None,
    )))
}

/// Replace a category's image
///
/// Accepts multipart/form-data with a single `image` file part.
#[utoipa::path(
    put,
    path = "/api/categories/{id}/image",
    params(
        ("id" = String, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Image replaced", body = ApiResponse<CategoryResponseDto>),
        (status = 400, description = "Missing or invalid image"),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn change_category_image(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let mut image: Option<ImageUploadDto> = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "image" | "file" => {
                image = Some(read_image_field(field).await?);
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let image = image.ok_or_else(|| AppError::BadRequest("Image file is required".to_string()))?;
    let updated = service.change_image(&id, image).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("Category image updated".to_string()),
        None,
    )))
}

/// Remove a category's image
#[utoipa::path(
    delete,
    path = "/api/categories/{id}/image",
    params(
        ("id" = String, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Image removed", body = ApiResponse<CategoryResponseDto>),
        (status = 404, description = "Category not found")
    ),
    tag = "categories"
)]
pub async fn remove_category_image(
    State(service): State<Arc<CategoryService>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CategoryResponseDto>>> {
    let updated = service.remove_image(&id).await?;
    Ok(Json(ApiResponse::success(
        Some(updated),
        Some("Category image removed".to_string()),
        None,
    )))
}

/// Pull the next multipart field, mapping read errors to 400
async fn next_field(multipart: &mut Multipart) -> Result<Option<axum::extract::multipart::Field>> {
    multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })
}

/// Read and validate an image file part
async fn read_image_field(field: axum::extract::multipart::Field<'_>) -> Result<ImageUploadDto> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let file_name = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unnamed".to_string());

    let data = field.bytes().await.map_err(|e| {
        debug!("Failed to read image bytes: {}", e);
        AppError::BadRequest(format!("Failed to read image data: {}", e))
    })?;

    if data.len() > MAX_IMAGE_SIZE {
        return Err(AppError::BadRequest(format!(
            "Image too large. Maximum size is {} bytes ({} MB)",
            MAX_IMAGE_SIZE,
            MAX_IMAGE_SIZE / 1024 / 1024
        )));
    }

    if !is_image_mime_type_allowed(&content_type) {
        return Err(AppError::BadRequest(format!(
            "Image type '{}' is not allowed. Allowed types: {}",
            content_type,
            ALLOWED_IMAGE_MIME_TYPES.join(", ")
        )));
    }

    Ok(ImageUploadDto {
        data: data.to_vec(),
        file_name,
        content_type,
    })
}

/// Parse the create form: text parts into the DTO, `image` into a file
async fn parse_category_form(
    mut multipart: Multipart,
) -> Result<(CreateCategoryDto, Option<ImageUploadDto>)> {
    let mut dto = CreateCategoryDto::default();
    let mut image: Option<ImageUploadDto> = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "image" => {
                // an empty file part means "no image"
                if field.file_name().map(str::is_empty).unwrap_or(true) {
                    continue;
                }
                image = Some(read_image_field(field).await?);
            }
            "name" => dto.name = read_text_field(field, "name").await?,
            "slug" => dto.slug = non_empty(read_text_field(field, "slug").await?),
            "parent_id" => dto.parent_id = Some(read_text_field(field, "parent_id").await?),
            "description" => {
                dto.description = non_empty(read_text_field(field, "description").await?)
            }
            "meta_title" => dto.meta_title = non_empty(read_text_field(field, "meta_title").await?),
            "sort_order" => {
                let text = read_text_field(field, "sort_order").await?;
                if !text.trim().is_empty() {
                    dto.sort_order = text.trim().parse().map_err(|_| {
                        AppError::BadRequest(format!("Invalid sort_order: '{}'", text))
                    })?;
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    Ok((dto, image))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::routes;
    use crate::modules::storage::ObjectStorage;
    use crate::shared::test_helpers::{InMemoryCategoryRepository, RecordingStorage};
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server() -> TestServer {
        let service = Arc::new(CategoryService::new(
            Arc::new(InMemoryCategoryRepository::new()),
            Arc::new(RecordingStorage::new()) as Arc<dyn ObjectStorage>,
        ));
        TestServer::new(routes::routes(service)).unwrap()
    }

    fn form(name: &str, parent_id: Option<&str>) -> MultipartForm {
        let mut form = MultipartForm::new().add_text("name", name.to_string());
        if let Some(parent_id) = parent_id {
            form = form.add_text("parent_id", parent_id.to_string());
        }
        form
    }

    async fn create(server: &TestServer, name: &str, parent_id: Option<&str>) -> Value {
        let response = server
            .post("/api/categories")
            .multipart(form(name, parent_id))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }

    #[tokio::test]
    async fn test_create_and_fetch_by_slug() {
        let server = server();
        let created = create(&server, "Electronics", None).await;
        assert_eq!(created["slug"], "electronics");

        let response = server.get("/api/categories/electronics").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["category"]["name"], "Electronics");
        assert_eq!(body["data"]["stats"]["direct_children"], 0);
    }

    #[tokio::test]
    async fn test_forest_nests_children() {
        let server = server();
        let root = create(&server, "Electronics", None).await;
        let root_id = root["id"].as_str().unwrap().to_string();
        create(&server, "Phones", Some(&root_id)).await;

        let response = server.get("/api/categories").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        let forest = body["data"].as_array().unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0]["children"][0]["name"], "Phones");
    }

    #[tokio::test]
    async fn test_list_by_level() {
        let server = server();
        let root = create(&server, "Electronics", None).await;
        let root_id = root["id"].as_str().unwrap().to_string();
        create(&server, "Phones", Some(&root_id)).await;

        let response = server.get("/api/categories/level/1").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        let level_one = body["data"].as_array().unwrap();
        assert_eq!(level_one.len(), 1);
        assert_eq!(level_one[0]["name"], "Phones");
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_rejected() {
        let server = server();
        create(&server, "Electronics", None).await;

        let response = server
            .post("/api/categories")
            .multipart(form("Electronics", None))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert!(body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e.as_str().unwrap().contains("already exists")));
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_image() {
        let server = server();
        let form = MultipartForm::new()
            .add_text("name", "Electronics")
            .add_part(
                "image",
                Part::bytes(vec![0u8; MAX_IMAGE_SIZE + 1])
                    .file_name("big.png")
                    .mime_type("image/png"),
            );

        let response = server.post("/api/categories").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_rejects_disallowed_mime_type() {
        let server = server();
        let form = MultipartForm::new()
            .add_text("name", "Electronics")
            .add_part(
                "image",
                Part::bytes(vec![1, 2, 3])
                    .file_name("script.sh")
                    .mime_type("application/x-sh"),
            );

        let response = server.post("/api/categories").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_and_delete_flow() {
        let server = server();
        let created = create(&server, "Electronics", None).await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = server
            .put(&format!("/api/categories/{}", id))
            .json(&json!({"name": "Home Electronics"}))
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["slug"], "home-electronics");

        let response = server.delete(&format!("/api/categories/{}", id)).await;
        response.assert_status_ok();

        // soft deleted categories resolve to 404 by slug
        let response = server.get("/api/categories/home-electronics").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_with_children_conflicts() {
        let server = server();
        let root = create(&server, "Electronics", None).await;
        let root_id = root["id"].as_str().unwrap().to_string();
        create(&server, "Phones", Some(&root_id)).await;

        let response = server.delete(&format!("/api/categories/{}", root_id)).await;
        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_image_endpoints() {
        let server = server();
        let created = create(&server, "Electronics", None).await;
        let id = created["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new().add_part(
            "image",
            Part::bytes(vec![1, 2, 3])
                .file_name("logo.png")
                .mime_type("image/png"),
        );
        let response = server
            .put(&format!("/api/categories/{}/image", id))
            .multipart(form)
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert!(body["data"]["image_url"].as_str().is_some());

        let response = server
            .delete(&format!("/api/categories/{}/image", id))
            .await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert!(body["data"]["image_url"].is_null());
    }

    #[tokio::test]
    async fn test_missing_image_part_is_bad_request() {
        let server = server();
        let created = create(&server, "Electronics", None).await;
        let id = created["id"].as_str().unwrap().to_string();

        let form = MultipartForm::new().add_text("note", "no file here");
        let response = server
            .put(&format!("/api/categories/{}/image", id))
            .multipart(form)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let server = server();
        let response = server
            .put("/api/categories/not-a-uuid")
            .json(&json!({"name": "X"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
