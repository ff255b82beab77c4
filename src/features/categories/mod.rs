//! Hierarchical category taxonomy feature.
//!
//! Categories form a self-referencing tree of unlimited depth: each row
//! points at an optional parent and carries a cached depth `level`.
//! Deletes are soft; inactive rows keep reserving their name and slug.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Auth | Description |
//! |--------|----------|------|-------------|
//! | GET | `/api/categories` | No | Nested category forest |
//! | GET | `/api/categories/level/{level}` | No | Active categories at a depth |
//! | GET | `/api/categories/{slug}` | No | Category detail with tree context |
//! | POST | `/api/categories` | No | Create (multipart, optional image) |
//! | PUT | `/api/categories/{id}` | No | Partial update / move |
//! | DELETE | `/api/categories/{id}` | No | Soft delete |
//! | PUT | `/api/categories/{id}/image` | No | Replace image (multipart) |
//! | DELETE | `/api/categories/{id}/image` | No | Remove image |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{CategoryRepository, PgCategoryRepository};
pub use services::CategoryService;
