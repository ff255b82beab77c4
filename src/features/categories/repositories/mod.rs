mod category_repository;

pub use category_repository::{
    CategoryPatch, CategoryRepository, NewCategory, PgCategoryRepository,
};
