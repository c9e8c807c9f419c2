// src/services.rs

pub mod api_key_service;
pub mod auth;
pub mod idea_service;
pub mod rate_limiter;
pub mod sequence_service;
pub mod visibility;
pub mod work_item_service;
pub mod workflow;
