/// Maximum length for a category name
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length for a category meta title
pub const MAX_META_TITLE_LENGTH: usize = 255;

/// Slug length bounds
pub const MIN_SLUG_LENGTH: usize = 2;
pub const MAX_SLUG_LENGTH: usize = 100;

/// Maximum category image size (5 MB)
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Storage folder for category images
pub const CATEGORY_IMAGE_FOLDER: &str = "categories";

/// MIME types accepted for category images
pub const ALLOWED_IMAGE_MIME_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/svg+xml"];

pub fn is_image_mime_type_allowed(content_type: &str) -> bool {
    ALLOWED_IMAGE_MIME_TYPES.contains(&content_type)
}
