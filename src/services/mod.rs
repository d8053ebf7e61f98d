pub mod auth;
pub mod categories;
pub mod images;
pub mod posts;
