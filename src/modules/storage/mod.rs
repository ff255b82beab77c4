//! Object storage for category images
//!
//! Provides the narrow put/delete surface the category engine needs,
//! backed by a MinIO/S3-compatible client.

mod minio_client;

use async_trait::async_trait;

use crate::core::error::Result;

pub use minio_client::MinIOClient;

/// Binary object storage collaborator. Uploads return a retrievable
/// URL; deletes take that URL back.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `folder`, keyed by a fresh id with the
    /// original file's extension, and return its public URL.
    async fn put(
        &self,
        data: Vec<u8>,
        original_name: &str,
        folder: &str,
        content_type: &str,
    ) -> Result<String>;

    /// Delete the object a previous `put` returned this URL for.
    async fn delete_by_url(&self, url: &str) -> Result<()>;
}
