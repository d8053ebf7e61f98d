pub mod activity;
pub mod categories;
pub mod images;
pub mod posts;
pub mod query;
pub mod response;
pub mod users;
pub mod views;
