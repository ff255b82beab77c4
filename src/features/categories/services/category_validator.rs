use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::core::error::{AppError, Result};
use crate::features::categories::dtos::{CreateCategoryDto, UpdateCategoryDto};
use crate::features::categories::repositories::CategoryRepository;
use crate::shared::constants::{MAX_SLUG_LENGTH, MIN_SLUG_LENGTH};
use crate::shared::validation::SLUG_REGEX;

/// Collects every rule violation for a category payload before any
/// mutation runs. Violations are accumulated, not short-circuited, so
/// a single response reports them all.
pub struct CategoryValidator {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryValidator {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    pub async fn validate_create(&self, dto: &CreateCategoryDto) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = dto.validate() {
            errors.extend(derive_messages(&e));
        }

        let name = dto.name.trim();
        if name.is_empty() {
            errors.push("Name is required".to_string());
        } else {
            self.check_name_taken(name, None, &mut errors).await?;
        }

        if let Some(slug) = dto.slug.as_deref() {
            check_slug_format(slug, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    pub async fn validate_update(&self, dto: &UpdateCategoryDto, exclude: Uuid) -> Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = dto.validate() {
            errors.extend(derive_messages(&e));
        }

        if let Some(name) = dto.name.as_deref() {
            let name = name.trim();
            if name.is_empty() {
                errors.push("Name must not be empty".to_string());
            } else {
                self.check_name_taken(name, Some(exclude), &mut errors)
                    .await?;
            }
        }

        if let Some(slug) = dto.slug.as_deref() {
            check_slug_format(slug, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    async fn check_name_taken(
        &self,
        name: &str,
        exclude: Option<Uuid>,
        errors: &mut Vec<String>,
    ) -> Result<()> {
        if self.repo.find_by_name(name, exclude).await?.is_some() {
            errors.push(format!("A category named '{}' already exists", name));
        }
        Ok(())
    }
}

/// Parse a path id, rejecting anything that is not a UUID
pub fn parse_category_id(id: &str) -> Result<Uuid> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("Category id is required".to_string()));
    }
    Uuid::parse_str(id)
        .map_err(|_| AppError::BadRequest(format!("Invalid category id: '{}'", id)))
}

fn check_slug_format(slug: &str, errors: &mut Vec<String>) {
    if slug.len() < MIN_SLUG_LENGTH || slug.len() > MAX_SLUG_LENGTH {
        errors.push(format!(
            "Slug must be between {} and {} characters",
            MIN_SLUG_LENGTH, MAX_SLUG_LENGTH
        ));
    }
    if !SLUG_REGEX.is_match(slug) {
        errors.push("Slug may only contain lowercase letters, digits and hyphens".to_string());
    }
}

/// Flatten `validator` derive errors into plain messages
fn derive_messages(errors: &ValidationErrors) -> Vec<String> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => msg.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{category_fixture, InMemoryCategoryRepository};

    fn validator_with(categories: Vec<crate::features::categories::models::Category>) -> CategoryValidator {
        CategoryValidator::new(Arc::new(InMemoryCategoryRepository::with_categories(
            categories,
        )))
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let validator = validator_with(vec![]);
        let dto = CreateCategoryDto {
            name: "   ".to_string(),
            ..Default::default()
        };

        let err = validator.validate_create(&dto).await.unwrap_err();
        match err {
            AppError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("required")));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_collects_all_errors() {
        let existing = category_fixture("Electronics", "electronics", None, 0);
        let validator = validator_with(vec![existing]);

        let dto = CreateCategoryDto {
            name: "Electronics".to_string(),
            slug: Some("Bad Slug!".to_string()),
            ..Default::default()
        };

        let err = validator.validate_create(&dto).await.unwrap_err();
        match err {
            AppError::Validation(errors) => {
                // duplicate name, bad slug charset: both reported at once
                assert!(errors.iter().any(|e| e.contains("already exists")));
                assert!(errors.iter().any(|e| e.contains("lowercase")));
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_allows_absent_name() {
        let validator = validator_with(vec![]);
        let dto = UpdateCategoryDto {
            description: Some("new description".to_string()),
            ..Default::default()
        };

        assert!(validator.validate_update(&dto, Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_excludes_own_name() {
        let existing = category_fixture("Electronics", "electronics", None, 0);
        let own_id = existing.id;
        let validator = validator_with(vec![existing]);

        let dto = UpdateCategoryDto {
            name: Some("Electronics".to_string()),
            ..Default::default()
        };

        // keeping its own name is not a collision
        assert!(validator.validate_update(&dto, own_id).await.is_ok());
        // but another category may not take it
        assert!(validator
            .validate_update(&dto, Uuid::new_v4())
            .await
            .is_err());
    }

    #[test]
    fn test_parse_category_id() {
        assert!(parse_category_id("").is_err());
        assert!(parse_category_id("not-a-uuid").is_err());
        assert!(parse_category_id(&Uuid::new_v4().to_string()).is_ok());
    }
}
