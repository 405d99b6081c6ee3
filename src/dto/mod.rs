pub mod auth;
pub mod items;
pub mod orders;
pub mod users;
