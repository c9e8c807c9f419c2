// src/db.rs

pub mod user_repo;
pub use user_repo::UserRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod work_item_repo;
pub use work_item_repo::WorkItemRepository;
pub mod idea_repo;
pub use idea_repo::IdeaRepository;
pub mod team_repo;
pub use team_repo::TeamRepository;
pub mod api_key_repo;
pub use api_key_repo::ApiKeyRepository;
