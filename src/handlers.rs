// src/handlers.rs

pub mod api_keys;
pub mod auth;
pub mod ideas;
pub mod integrations;
pub mod products;
pub mod work_items;
