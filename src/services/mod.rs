pub mod auth_service;
pub mod item_service;
pub mod order_service;
pub mod user_service;
