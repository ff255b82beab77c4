pub mod category_service;
pub mod category_tree;
pub mod category_validator;

pub use category_service::CategoryService;
pub use category_tree::CategoryTreeBuilder;
pub use category_validator::CategoryValidator;
