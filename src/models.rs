// src/models.rs

pub mod api_key;
pub mod auth;
pub mod idea;
pub mod product;
pub mod team;
pub mod tenancy;
pub mod work_item;
